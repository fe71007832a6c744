use std::collections::BTreeSet;

use serde::Serialize;
use stash_catalog::CatalogRow;
use stash_types::{BlobKey, Kind, ObjectHash};

/// Blobs of one kind whose bytes are identical.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Content hash shared by every blob in the group.
    pub hash: ObjectHash,
    /// The copy that stays.
    pub keep: BlobKey,
    /// The redundant copies, safe to delete.
    pub duplicates: Vec<BlobKey>,
}

/// Read-only consistency summary of one kind.
#[derive(Clone, Debug, Serialize)]
pub struct AuditReport {
    pub kind: Kind,
    pub blob_count: usize,
    pub record_count: usize,
    pub unreferenced: Vec<BlobKey>,
    pub empty: Vec<CatalogRow>,
    pub duplicates: Vec<DuplicateGroup>,
}

impl AuditReport {
    /// True when every blob is referenced, every row has its blob and no
    /// blob is stored twice.
    pub fn is_clean(&self) -> bool {
        self.unreferenced.is_empty() && self.empty.is_empty() && self.duplicates.is_empty()
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates.iter().map(|g| g.duplicates.len()).sum()
    }

    /// What [`collect_garbage`](crate::PersistenceManager::collect_garbage)
    /// would remove, assuming nothing changes in between.
    ///
    /// A redundant copy that is also unreferenced is counted once, as a
    /// duplicate.
    pub fn gc_preview(&self) -> GcReport {
        let duplicates: BTreeSet<&BlobKey> = self
            .duplicates
            .iter()
            .flat_map(|g| g.duplicates.iter())
            .collect();
        GcReport {
            duplicates_removed: duplicates.len(),
            blobs_removed: self
                .unreferenced
                .iter()
                .filter(|k| !duplicates.contains(k))
                .count(),
            records_removed: self.empty.len(),
        }
    }
}

/// Result of garbage collection over one kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    pub duplicates_removed: usize,
    pub blobs_removed: usize,
    pub records_removed: usize,
}

impl GcReport {
    pub fn total(&self) -> usize {
        self.duplicates_removed + self.blobs_removed + self.records_removed
    }
}
