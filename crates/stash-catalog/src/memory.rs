//! In-memory catalog for testing and ephemeral use.

use std::collections::BTreeSet;
use std::sync::RwLock;

use chrono::Utc;
use stash_types::{BlobKey, Kind, ObjectHash, RecordId};
use tracing::debug;

use crate::error::CatalogResult;
use crate::row::{CatalogRow, EvaluationRow, NewEvaluation, NewRow};
use crate::state::CatalogState;
use crate::traits::{Catalog, EvaluationCatalog};

/// An in-memory implementation of [`Catalog`] and [`EvaluationCatalog`].
///
/// All data lives behind a single `RwLock`. Data is lost when the catalog
/// is dropped.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Catalog for InMemoryCatalog {
    fn insert(&self, row: NewRow) -> CatalogResult<CatalogRow> {
        let row = self
            .state
            .write()
            .expect("lock poisoned")
            .insert(row, Utc::now())?;
        debug!(kind = %row.kind, id = %row.id, hash = %row.object_hash.short_hex(), "row inserted");
        Ok(row)
    }

    fn update(&self, row: &CatalogRow) -> CatalogResult<()> {
        self.state.write().expect("lock poisoned").update(row)
    }

    fn get(&self, kind: Kind, id: RecordId) -> CatalogResult<Option<CatalogRow>> {
        Ok(self.state.read().expect("lock poisoned").get(kind, id))
    }

    fn find_by_hash(&self, kind: Kind, hash: &ObjectHash) -> CatalogResult<Option<CatalogRow>> {
        Ok(self.state.read().expect("lock poisoned").find_by_hash(kind, hash))
    }

    fn filter_by_blob_key_in(
        &self,
        kind: Kind,
        keys: &BTreeSet<BlobKey>,
    ) -> CatalogResult<Vec<CatalogRow>> {
        Ok(self
            .state
            .read()
            .expect("lock poisoned")
            .filter_by_blob_key(kind, keys, true))
    }

    fn filter_by_blob_key_not_in(
        &self,
        kind: Kind,
        keys: &BTreeSet<BlobKey>,
    ) -> CatalogResult<Vec<CatalogRow>> {
        Ok(self
            .state
            .read()
            .expect("lock poisoned")
            .filter_by_blob_key(kind, keys, false))
    }

    fn delete(&self, kind: Kind, ids: &[RecordId]) -> CatalogResult<usize> {
        let removed = self.state.write().expect("lock poisoned").delete(kind, ids);
        debug!(kind = %kind, removed, "rows deleted");
        Ok(removed)
    }

    fn rows(&self, kind: Kind) -> CatalogResult<Vec<CatalogRow>> {
        Ok(self.state.read().expect("lock poisoned").rows(kind))
    }

    fn count(&self, kind: Kind) -> CatalogResult<usize> {
        Ok(self.state.read().expect("lock poisoned").count(kind))
    }
}

impl EvaluationCatalog for InMemoryCatalog {
    fn insert_evaluation(&self, evaluation: NewEvaluation) -> CatalogResult<EvaluationRow> {
        self.state
            .write()
            .expect("lock poisoned")
            .insert_evaluation(evaluation, Utc::now())
    }

    fn get_evaluation(&self, id: RecordId) -> CatalogResult<Option<EvaluationRow>> {
        Ok(self.state.read().expect("lock poisoned").get_evaluation(id))
    }

    fn evaluations(&self) -> CatalogResult<Vec<EvaluationRow>> {
        Ok(self.state.read().expect("lock poisoned").evaluations())
    }
}
