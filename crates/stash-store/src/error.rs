use stash_types::{BlobKey, TypeError};

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A different blob already exists under this key.
    #[error("conflicting blob already stored at {0}")]
    Conflict(BlobKey),

    /// A stored path could not be mapped to a valid blob key.
    #[error("invalid blob key: {0}")]
    InvalidKey(#[from] TypeError),

    /// The store configuration is unusable.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
