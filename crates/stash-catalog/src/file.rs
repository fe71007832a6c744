//! JSON-file-backed catalog.
//!
//! [`JsonCatalog`] keeps the full catalog in memory and rewrites a single
//! JSON document after every mutation. The rewrite goes through a temporary
//! file in the same directory followed by an atomic rename, so a crash leaves
//! either the old or the new document, never a truncated one.
//!
//! The file is owned by one process at a time; concurrent writers from
//! different processes are not coordinated.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use stash_types::{BlobKey, Kind, ObjectHash, RecordId};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::row::{CatalogRow, EvaluationRow, NewEvaluation, NewRow};
use crate::state::{CatalogState, Snapshot};
use crate::traits::{Catalog, EvaluationCatalog};

#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    state: RwLock<CatalogState>,
}

impl JsonCatalog {
    /// Open the catalog at `path`, creating an empty one if the file does not
    /// exist yet. The file itself is only written on the first mutation.
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read(&path) {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| CatalogError::Serialization(e.to_string()))?;
                CatalogState::from_snapshot(snapshot)?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => CatalogState::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), "opened catalog");
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `op` to a copy of the state, write it out, then publish it.
    ///
    /// If the write fails the in-memory state is left untouched, so memory
    /// and disk never diverge.
    fn mutate<R>(
        &self,
        op: impl FnOnce(&mut CatalogState) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let mut state = self.state.write().expect("lock poisoned");
        let mut next = state.clone();
        let out = op(&mut next)?;
        self.save(&next)?;
        *state = next;
        Ok(out)
    }

    fn save(&self, state: &CatalogState) -> CatalogResult<()> {
        let bytes = serde_json::to_vec_pretty(&state.snapshot())
            .map_err(|e| CatalogError::Serialization(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), len = bytes.len(), "catalog saved");
        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CatalogState> {
        self.state.read().expect("lock poisoned")
    }
}

impl Catalog for JsonCatalog {
    fn insert(&self, row: NewRow) -> CatalogResult<CatalogRow> {
        let row = self.mutate(|state| state.insert(row, Utc::now()))?;
        debug!(kind = %row.kind, id = %row.id, hash = %row.object_hash.short_hex(), "row inserted");
        Ok(row)
    }

    fn update(&self, row: &CatalogRow) -> CatalogResult<()> {
        self.mutate(|state| state.update(row))
    }

    fn get(&self, kind: Kind, id: RecordId) -> CatalogResult<Option<CatalogRow>> {
        Ok(self.read_state().get(kind, id))
    }

    fn find_by_hash(&self, kind: Kind, hash: &ObjectHash) -> CatalogResult<Option<CatalogRow>> {
        Ok(self.read_state().find_by_hash(kind, hash))
    }

    fn filter_by_blob_key_in(
        &self,
        kind: Kind,
        keys: &BTreeSet<BlobKey>,
    ) -> CatalogResult<Vec<CatalogRow>> {
        Ok(self.read_state().filter_by_blob_key(kind, keys, true))
    }

    fn filter_by_blob_key_not_in(
        &self,
        kind: Kind,
        keys: &BTreeSet<BlobKey>,
    ) -> CatalogResult<Vec<CatalogRow>> {
        Ok(self.read_state().filter_by_blob_key(kind, keys, false))
    }

    fn delete(&self, kind: Kind, ids: &[RecordId]) -> CatalogResult<usize> {
        let removed = self.mutate(|state| Ok(state.delete(kind, ids)))?;
        debug!(kind = %kind, removed, "rows deleted");
        Ok(removed)
    }

    fn rows(&self, kind: Kind) -> CatalogResult<Vec<CatalogRow>> {
        Ok(self.read_state().rows(kind))
    }

    fn count(&self, kind: Kind) -> CatalogResult<usize> {
        Ok(self.read_state().count(kind))
    }
}

impl EvaluationCatalog for JsonCatalog {
    fn insert_evaluation(&self, evaluation: NewEvaluation) -> CatalogResult<EvaluationRow> {
        self.mutate(|state| state.insert_evaluation(evaluation, Utc::now()))
    }

    fn get_evaluation(&self, id: RecordId) -> CatalogResult<Option<EvaluationRow>> {
        Ok(self.read_state().get_evaluation(id))
    }

    fn evaluations(&self) -> CatalogResult<Vec<EvaluationRow>> {
        Ok(self.read_state().evaluations())
    }
}
