use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stash_types::{BlobKey, Kind, ObjectHash, RecordId};

/// A committed catalog row describing one persisted object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub id: RecordId,
    pub kind: Kind,
    pub created_at: DateTime<Utc>,
    pub object_hash: ObjectHash,
    pub blob_key: BlobKey,
    #[serde(default)]
    pub description: String,
}

/// The columns a caller supplies when inserting a row.
///
/// `id` and `created_at` are assigned by the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRow {
    pub kind: Kind,
    pub object_hash: ObjectHash,
    pub blob_key: BlobKey,
    pub description: String,
}

impl NewRow {
    pub fn new(kind: Kind, object_hash: ObjectHash, blob_key: BlobKey) -> Self {
        Self {
            kind,
            object_hash,
            blob_key,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A stored evaluation: one estimator applied to one input set, with the
/// expected and predicted outputs.
///
/// Every id refers to a row of the matching kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub estimator: RecordId,
    pub features: RecordId,
    pub expected: RecordId,
    pub predicted: RecordId,
}

impl EvaluationRow {
    /// Ids of the estimator, features, expected and predicted records.
    pub fn record_ids(&self) -> [RecordId; 4] {
        [self.estimator, self.features, self.expected, self.predicted]
    }
}

/// The columns a caller supplies when inserting an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewEvaluation {
    pub estimator: RecordId,
    pub features: RecordId,
    pub expected: RecordId,
    pub predicted: RecordId,
}
