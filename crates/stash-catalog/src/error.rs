//! Error types for catalog operations.

use stash_types::{Kind, ObjectHash, RecordId};
use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A row with this `(kind, object_hash)` already exists.
    #[error("duplicate {kind} row for hash {hash} (existing {existing})")]
    DuplicateKey {
        kind: Kind,
        hash: ObjectHash,
        existing: RecordId,
    },

    /// No row with this id exists.
    #[error("{kind} row {id} not found")]
    NotFound { kind: Kind, id: RecordId },

    /// An update tried to change a column that is fixed at insert.
    #[error("{kind} row {id}: column {column} is immutable")]
    ImmutableColumn {
        kind: Kind,
        id: RecordId,
        column: &'static str,
    },

    /// No evaluation row with this id exists.
    #[error("evaluation {0} not found")]
    EvaluationNotFound(RecordId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the file-backed catalog.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
