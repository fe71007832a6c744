//! Backend-independent catalog state.
//!
//! [`CatalogState`] owns the rows, the `(kind, object_hash)` unique index and
//! the id sequence. Backends wrap it in a lock and decide what happens after a
//! mutation (nothing for memory, a file rewrite for JSON).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stash_types::{BlobKey, Kind, ObjectHash, RecordId};

use crate::error::{CatalogError, CatalogResult};
use crate::row::{CatalogRow, EvaluationRow, NewEvaluation, NewRow};

#[derive(Debug, Default, Clone)]
pub struct CatalogState {
    last_id: u64,
    rows: BTreeMap<RecordId, CatalogRow>,
    by_hash: HashMap<(Kind, ObjectHash), RecordId>,
    evaluations: BTreeMap<RecordId, EvaluationRow>,
}

/// On-disk form of [`CatalogState`]. The hash index is rebuilt on load.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_id: u64,
    #[serde(default)]
    pub rows: Vec<CatalogRow>,
    #[serde(default)]
    pub evaluations: Vec<EvaluationRow>,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from a snapshot, re-checking the unique constraint.
    pub fn from_snapshot(snapshot: Snapshot) -> CatalogResult<Self> {
        let mut state = Self {
            last_id: snapshot.last_id,
            ..Self::default()
        };
        for row in snapshot.rows {
            if let Some(&existing) = state.by_hash.get(&(row.kind, row.object_hash)) {
                return Err(CatalogError::DuplicateKey {
                    kind: row.kind,
                    hash: row.object_hash,
                    existing,
                });
            }
            state.last_id = state.last_id.max(row.id.get());
            state.by_hash.insert((row.kind, row.object_hash), row.id);
            state.rows.insert(row.id, row);
        }
        for eval in snapshot.evaluations {
            state.last_id = state.last_id.max(eval.id.get());
            state.evaluations.insert(eval.id, eval);
        }
        Ok(state)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            last_id: self.last_id,
            rows: self.rows.values().cloned().collect(),
            evaluations: self.evaluations.values().cloned().collect(),
        }
    }

    fn next_id(&mut self) -> RecordId {
        self.last_id += 1;
        RecordId::new(self.last_id)
    }

    pub fn insert(&mut self, new: NewRow, now: DateTime<Utc>) -> CatalogResult<CatalogRow> {
        if let Some(&existing) = self.by_hash.get(&(new.kind, new.object_hash)) {
            return Err(CatalogError::DuplicateKey {
                kind: new.kind,
                hash: new.object_hash,
                existing,
            });
        }
        let row = CatalogRow {
            id: self.next_id(),
            kind: new.kind,
            created_at: now,
            object_hash: new.object_hash,
            blob_key: new.blob_key,
            description: new.description,
        };
        self.by_hash.insert((row.kind, row.object_hash), row.id);
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    pub fn update(&mut self, row: &CatalogRow) -> CatalogResult<()> {
        let stored = self
            .rows
            .get_mut(&row.id)
            .filter(|stored| stored.kind == row.kind)
            .ok_or(CatalogError::NotFound {
                kind: row.kind,
                id: row.id,
            })?;

        let immutable = |column| CatalogError::ImmutableColumn {
            kind: row.kind,
            id: row.id,
            column,
        };
        if stored.object_hash != row.object_hash {
            return Err(immutable("object_hash"));
        }
        if stored.created_at != row.created_at {
            return Err(immutable("created_at"));
        }

        stored.blob_key = row.blob_key.clone();
        stored.description = row.description.clone();
        Ok(())
    }

    pub fn get(&self, kind: Kind, id: RecordId) -> Option<CatalogRow> {
        self.rows.get(&id).filter(|row| row.kind == kind).cloned()
    }

    pub fn find_by_hash(&self, kind: Kind, hash: &ObjectHash) -> Option<CatalogRow> {
        self.by_hash
            .get(&(kind, *hash))
            .and_then(|id| self.rows.get(id))
            .cloned()
    }

    fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &CatalogRow> {
        self.rows.values().filter(move |row| row.kind == kind)
    }

    pub fn filter_by_blob_key(
        &self,
        kind: Kind,
        keys: &BTreeSet<BlobKey>,
        contained: bool,
    ) -> Vec<CatalogRow> {
        self.of_kind(kind)
            .filter(|row| keys.contains(&row.blob_key) == contained)
            .cloned()
            .collect()
    }

    /// Delete rows of `kind`, cascading to every evaluation that references
    /// one of them. Returns the number of rows removed.
    pub fn delete(&mut self, kind: Kind, ids: &[RecordId]) -> usize {
        let mut removed = BTreeSet::new();
        for id in ids {
            if self.rows.get(id).is_some_and(|row| row.kind == kind) {
                if let Some(row) = self.rows.remove(id) {
                    self.by_hash.remove(&(row.kind, row.object_hash));
                    removed.insert(row.id);
                }
            }
        }
        if !removed.is_empty() {
            self.evaluations
                .retain(|_, eval| !eval.record_ids().iter().any(|id| removed.contains(id)));
        }
        removed.len()
    }

    pub fn rows(&self, kind: Kind) -> Vec<CatalogRow> {
        self.of_kind(kind).cloned().collect()
    }

    pub fn count(&self, kind: Kind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn insert_evaluation(
        &mut self,
        new: NewEvaluation,
        now: DateTime<Utc>,
    ) -> CatalogResult<EvaluationRow> {
        for (kind, id) in [
            (Kind::Estimator, new.estimator),
            (Kind::FeatureMatrix, new.features),
            (Kind::TargetVector, new.expected),
            (Kind::PredictedVector, new.predicted),
        ] {
            if self.get(kind, id).is_none() {
                return Err(CatalogError::NotFound { kind, id });
            }
        }
        let row = EvaluationRow {
            id: self.next_id(),
            created_at: now,
            estimator: new.estimator,
            features: new.features,
            expected: new.expected,
            predicted: new.predicted,
        };
        self.evaluations.insert(row.id, row.clone());
        Ok(row)
    }

    pub fn get_evaluation(&self, id: RecordId) -> Option<EvaluationRow> {
        self.evaluations.get(&id).cloned()
    }

    pub fn evaluations(&self) -> Vec<EvaluationRow> {
        self.evaluations.values().cloned().collect()
    }
}
