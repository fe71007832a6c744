use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use stash_types::{BlobKey, Kind};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// In-memory, BTreeMap-based blob store.
///
/// Intended for tests and embedding. All blobs are held in memory behind a
/// `RwLock` for safe concurrent access. Blobs are cloned on read/write.
pub struct InMemoryBlobStore {
    blobs: RwLock<BTreeMap<BlobKey, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of blobs currently stored, across all kinds.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Remove all blobs from the store.
    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn exists(&self, key: &BlobKey) -> StoreResult<bool> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    fn write(&self, key: &BlobKey, data: &[u8]) -> StoreResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        match map.get(key) {
            Some(existing) if existing.as_slice() == data => Ok(false),
            Some(_) => Err(StoreError::Conflict(key.clone())),
            None => {
                map.insert(key.clone(), data.to_vec());
                Ok(true)
            }
        }
    }

    fn read(&self, key: &BlobKey) -> StoreResult<Option<Vec<u8>>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn delete(&self, key: &BlobKey) -> StoreResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    fn list_all(&self, kind: Kind) -> StoreResult<BTreeSet<BlobKey>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.keys().filter(|k| k.kind() == kind).cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &count)
            .finish()
    }
}
