//! Metadata catalog for Stash.
//!
//! The catalog holds one [`CatalogRow`] per committed record: the record's
//! kind, identity hash, blob key and description. It is the authoritative
//! answer to "which objects are known", while the blob store answers "which
//! bytes exist". The two are mutated independently and reconciled by the
//! persistence manager.
//!
//! # Backends
//!
//! - [`InMemoryCatalog`] -- lock-protected maps for tests and embedding
//! - [`JsonCatalog`] -- the same state persisted to a single JSON file,
//!   rewritten atomically after every mutation
//!
//! # Constraints
//!
//! 1. At most one row per `(kind, object_hash)`; a second insert fails with
//!    [`CatalogError::DuplicateKey`].
//! 2. `id`, `kind`, `created_at` and `object_hash` never change after insert.
//!    Only `blob_key` and `description` may be updated.
//! 3. Ids are assigned sequentially and never reused.

pub mod error;
pub mod file;
pub mod memory;
pub mod row;
pub mod state;
pub mod traits;

pub use error::{CatalogError, CatalogResult};
pub use file::JsonCatalog;
pub use memory::InMemoryCatalog;
pub use row::{CatalogRow, EvaluationRow, NewEvaluation, NewRow};
pub use traits::{Catalog, EvaluationCatalog};
