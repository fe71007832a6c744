use stash_types::{Kind, ObjectHash};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"stash-estimator-v1"`) that is
/// prepended to every hash computation. This prevents cross-kind hash
/// collisions: an estimator and a data set with identical bytes will produce
/// different hashes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for estimator blobs.
    pub const ESTIMATOR: Self = Self {
        domain: "stash-estimator-v1",
    };
    /// Hasher for feature matrix blobs.
    pub const FEATURE_MATRIX: Self = Self {
        domain: "stash-feature-matrix-v1",
    };
    /// Hasher for target vector blobs.
    pub const TARGET_VECTOR: Self = Self {
        domain: "stash-target-vector-v1",
    };
    /// Hasher for predicted vector blobs.
    pub const PREDICTED_VECTOR: Self = Self {
        domain: "stash-predicted-vector-v1",
    };
    /// Hasher for generic data set blobs.
    pub const DATA_SET: Self = Self {
        domain: "stash-data-set-v1",
    };

    /// The hasher used for blobs of `kind`.
    pub const fn for_kind(kind: Kind) -> &'static Self {
        match kind {
            Kind::Estimator => &Self::ESTIMATOR,
            Kind::FeatureMatrix => &Self::FEATURE_MATRIX,
            Kind::TargetVector => &Self::TARGET_VECTOR,
            Kind::PredictedVector => &Self::PREDICTED_VECTOR,
            Kind::DataSet => &Self::DATA_SET,
        }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectHash::from_digest(*hasher.finalize().as_bytes())
    }
}
