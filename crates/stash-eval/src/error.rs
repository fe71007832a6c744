use stash_catalog::CatalogError;
use stash_persist::PersistError;
use stash_types::{Kind, RecordId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// A feature matrix row has the wrong number of columns.
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Two inputs that must line up do not.
    #[error("shape mismatch: {what} expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An input record has no object, neither cached nor in storage.
    #[error("{0} input has no object")]
    MissingInput(Kind),

    #[error("evaluation {0} not found")]
    NotFound(RecordId),

    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
