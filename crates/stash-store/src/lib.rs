//! Blob storage for Stash.
//!
//! A blob store is a write-once key-value store of encoded objects, addressed
//! by [`BlobKey`](stash_types::BlobKey) (a kind plus a name inside that
//! kind's namespace). Canonical names are object hashes, so a well-behaved
//! store never holds two different byte strings under one key.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- one file per blob under `<root>/<namespace>/<name>`
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written; rewriting identical bytes is a no-op.
//! 2. Writing different bytes under an existing key is a [`StoreError::Conflict`].
//! 3. Deleting a missing blob is not an error.
//! 4. The store never interprets blob contents.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use config::{Namespaces, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
