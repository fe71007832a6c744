//! Error types for persistence operations.

use stash_catalog::CatalogError;
use stash_crypto::CodecError;
use stash_store::StoreError;
use stash_types::{Kind, ObjectHash, RecordId};
use thiserror::Error;

/// Errors that can occur while persisting, loading or reconciling records.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The object's current hash differs from the hash the record carries.
    ///
    /// Raised when a cached object was mutated in place after its hash was
    /// computed, or when a blob decodes to something with a different hash.
    #[error("{kind} hash mismatch: record says {expected}, object hashes to {computed}")]
    HashMismatch {
        kind: Kind,
        expected: ObjectHash,
        computed: ObjectHash,
    },

    /// The commit would change the identity of a committed row, or a
    /// different row already holds this hash.
    ///
    /// `id` is the committing record's own id (`None` if it was never
    /// committed); `existing` is the row that holds the conflicting identity.
    #[error("immutable {kind} record: hash {hash} conflicts with row {existing}")]
    ImmutableUpdate {
        kind: Kind,
        id: Option<RecordId>,
        hash: ObjectHash,
        existing: RecordId,
    },

    /// Commit was attempted on a record that never had an object.
    #[error("{kind} record has no object to commit")]
    MissingObject { kind: Kind },

    /// A concurrent writer inserted the same `(kind, hash)` first.
    #[error("{kind} row for hash {hash} was inserted concurrently as {existing}")]
    DuplicateKey {
        kind: Kind,
        hash: ObjectHash,
        existing: RecordId,
    },

    /// A blob key from another kind's namespace was used with this kind.
    #[error("blob key kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: Kind, actual: Kind },

    /// No row with this id exists.
    #[error("{kind} record {id} not found")]
    NotFound { kind: Kind, id: RecordId },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl PersistError {
    /// Whether this error means another writer committed the same object
    /// first, so the caller should look the winner up instead of failing.
    pub fn is_lost_race(&self) -> bool {
        matches!(
            self,
            PersistError::DuplicateKey { .. } | PersistError::ImmutableUpdate { id: None, .. }
        )
    }
}

/// Convenience type alias for persistence operations.
pub type PersistResult<T> = std::result::Result<T, PersistError>;
