use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The category of a storable object.
///
/// Each kind owns a separate blob namespace and a separate uniqueness scope
/// in the catalog: the same hash may appear once per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// A trained model exposing a predict capability.
    Estimator,
    /// Input rows an estimator predicts on.
    FeatureMatrix,
    /// Expected outputs for a feature matrix.
    TargetVector,
    /// Outputs computed by an estimator.
    PredictedVector,
    /// Free-form tabular data.
    DataSet,
}

impl Kind {
    /// Every kind, in declaration order.
    pub const ALL: [Kind; 5] = [
        Kind::Estimator,
        Kind::FeatureMatrix,
        Kind::TargetVector,
        Kind::PredictedVector,
        Kind::DataSet,
    ];

    /// Stable lowercase name, used in logs, CLI flags and hash domains.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Estimator => "estimator",
            Self::FeatureMatrix => "feature_matrix",
            Self::TargetVector => "target_vector",
            Self::PredictedVector => "predicted_vector",
            Self::DataSet => "data_set",
        }
    }

    /// Default storage directory for blobs of this kind.
    pub fn default_namespace(&self) -> &'static str {
        match self {
            Self::Estimator => "estimators",
            Self::FeatureMatrix => "feature_matrices",
            Self::TargetVector => "target_vectors",
            Self::PredictedVector => "predicted_vectors",
            Self::DataSet => "datasets",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized || k.default_namespace() == normalized)
            .ok_or_else(|| TypeError::UnknownKind(s.to_string()))
    }
}
