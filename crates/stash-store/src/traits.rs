use std::collections::BTreeSet;

use stash_types::{BlobKey, Kind};

use crate::error::StoreResult;

/// Write-once blob storage addressed by `(kind, name)`.
///
/// All implementations must satisfy these invariants:
/// - Blobs are immutable once written. Writing identical bytes again is a
///   no-op; writing different bytes under an existing key fails with
///   [`StoreError::Conflict`](crate::StoreError::Conflict).
/// - Concurrent reads are always safe.
/// - The store never interprets blob contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Check whether a blob exists.
    fn exists(&self, key: &BlobKey) -> StoreResult<bool>;

    /// Write a blob. Returns `true` if bytes were written, `false` if an
    /// identical blob was already present.
    fn write(&self, key: &BlobKey, data: &[u8]) -> StoreResult<bool>;

    /// Read a blob.
    ///
    /// Returns `Ok(None)` if the blob does not exist.
    fn read(&self, key: &BlobKey) -> StoreResult<Option<Vec<u8>>>;

    /// Delete a blob. Returns `true` if the blob existed.
    ///
    /// This is intended for garbage collection only. Deleting a blob that a
    /// catalog row still references turns that row into an empty record.
    fn delete(&self, key: &BlobKey) -> StoreResult<bool>;

    /// Every blob currently stored in `kind`'s namespace.
    fn list_all(&self, kind: Kind) -> StoreResult<BTreeSet<BlobKey>>;
}
