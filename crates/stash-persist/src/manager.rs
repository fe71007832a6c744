//! The persistence manager: get-or-create and blob/catalog reconciliation.
//!
//! The catalog and the blob store are mutated independently, with no
//! transaction spanning both. Every reconciliation here reads the full blob
//! listing and the catalog's view of it, then diffs the two sets:
//!
//! - **unreferenced blobs**: present in storage, referenced by no row
//! - **empty records**: rows whose blob is missing from storage
//! - **duplicate blobs**: several keys holding byte-identical content
//!
//! Enumerate-then-delete is not atomic. A blob or row that disappears
//! between the two steps is skipped silently.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use stash_catalog::{Catalog, CatalogError, CatalogRow, NewRow};
use stash_crypto::{Codec, ObjectHasher};
use stash_store::BlobStore;
use stash_types::{BlobKey, Kind, ObjectHash, RecordId};
use tracing::{debug, info, warn};

use crate::error::{PersistError, PersistResult};
use crate::record::{Persistable, Record};
use crate::report::{AuditReport, DuplicateGroup, GcReport};

/// Entry point for creating, loading and reconciling records.
///
/// Cheap to clone: the store and catalog are shared through `Arc`s.
#[derive(Clone)]
pub struct PersistenceManager {
    store: Arc<dyn BlobStore>,
    catalog: Arc<dyn Catalog>,
    hasher: ObjectHasher,
}

impl PersistenceManager {
    pub fn new(store: Arc<dyn BlobStore>, catalog: Arc<dyn Catalog>, codec: Codec) -> Self {
        Self {
            store,
            catalog,
            hasher: ObjectHasher::new(codec),
        }
    }

    pub fn store(&self) -> &dyn BlobStore {
        self.store.as_ref()
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn codec(&self) -> Codec {
        self.hasher.codec()
    }

    pub fn hasher(&self) -> &ObjectHasher {
        &self.hasher
    }

    /// Content hash of `object` under this manager's codec.
    pub fn hash<T: Persistable>(&self, object: &T) -> PersistResult<ObjectHash> {
        Ok(self.hasher.hash(T::TAG, object)?)
    }

    /// A new uncommitted record holding `object`.
    pub fn record<T: Persistable>(&self, object: T) -> PersistResult<Record<T>> {
        Record::new(self, object)
    }

    /// Return the committed record for `object`, creating it if needed.
    ///
    /// The boolean is `true` if this call inserted the row. An existing row
    /// is returned as stored; the caller's object is cached on it so no
    /// blob read is needed. Concurrent calls with equal objects always
    /// resolve to the same row.
    pub fn get_or_create<T: Persistable>(&self, object: T) -> PersistResult<(Record<T>, bool)> {
        let hash = self.hash(&object)?;
        if let Some(row) = self.catalog.find_by_hash(T::KIND, &hash)? {
            let mut record = Record::from_row(self, row);
            record.cache_object(Some(object));
            return Ok((record, false));
        }

        let mut record = Record::new(self, object)?;
        match record.commit() {
            Ok(()) => Ok((record, true)),
            Err(e) if e.is_lost_race() => {
                debug!(kind = %T::KIND, hash = %hash.short_hex(), "lost get-or-create race");
                let Some(row) = self.catalog.find_by_hash(T::KIND, &hash)? else {
                    return Err(e);
                };
                let mut winner = Record::from_row(self, row);
                winner.cache_object(record.take_object());
                Ok((winner, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Load a committed record by id. The object is read lazily.
    pub fn load<T: Persistable>(&self, id: RecordId) -> PersistResult<Record<T>> {
        let row = self
            .catalog
            .get(T::KIND, id)?
            .ok_or(PersistError::NotFound { kind: T::KIND, id })?;
        Ok(Record::from_row(self, row))
    }

    /// The committed record holding `hash`, if any.
    pub fn find_by_hash<T: Persistable>(&self, hash: &ObjectHash) -> PersistResult<Option<Record<T>>> {
        Ok(self
            .catalog
            .find_by_hash(T::KIND, hash)?
            .map(|row| Record::from_row(self, row)))
    }

    /// Every committed record of `T`'s kind, unloaded, in id order.
    pub fn records<T: Persistable>(&self) -> PersistResult<Vec<Record<T>>> {
        Ok(self
            .catalog
            .rows(T::KIND)?
            .into_iter()
            .map(|row| Record::from_row(self, row))
            .collect())
    }

    /// Every blob physically present in `kind`'s namespace.
    pub fn all_blob_keys(&self, kind: Kind) -> PersistResult<BTreeSet<BlobKey>> {
        Ok(self.store.list_all(kind)?)
    }

    /// Blobs that no catalog row references.
    pub fn unreferenced_blobs(&self, kind: Kind) -> PersistResult<BTreeSet<BlobKey>> {
        let all = self.all_blob_keys(kind)?;
        let referenced: BTreeSet<BlobKey> = self
            .catalog
            .filter_by_blob_key_in(kind, &all)?
            .into_iter()
            .map(|row| row.blob_key)
            .collect();
        Ok(all.difference(&referenced).cloned().collect())
    }

    /// Catalog rows whose blob is missing from storage.
    pub fn empty_records(&self, kind: Kind) -> PersistResult<Vec<CatalogRow>> {
        let all = self.all_blob_keys(kind)?;
        Ok(self.catalog.filter_by_blob_key_not_in(kind, &all)?)
    }

    /// Groups of blobs with byte-identical content.
    ///
    /// Every blob is read and re-hashed; names are not trusted. Within a
    /// group the kept copy is a key referenced by a row if there is one,
    /// else the key named after the content hash, else the smallest key.
    /// Keys referenced by a row are never reported as duplicates.
    pub fn duplicate_blobs(&self, kind: Kind) -> PersistResult<Vec<DuplicateGroup>> {
        let mut by_content: BTreeMap<ObjectHash, Vec<BlobKey>> = BTreeMap::new();
        for key in self.all_blob_keys(kind)? {
            // Vanished since listing.
            let Some(bytes) = self.store.read(&key)? else {
                continue;
            };
            let hash = self.hasher.hash_bytes(kind, &bytes);
            by_content.entry(hash).or_default().push(key);
        }

        let referenced = self.catalog.referenced_keys(kind)?;
        let groups = by_content
            .into_iter()
            .filter(|(_, keys)| keys.len() > 1)
            .map(|(hash, keys)| {
                let keep = keys
                    .iter()
                    .find(|k| referenced.contains(*k))
                    .or_else(|| keys.iter().find(|k| k.is_canonical_for(&hash)))
                    .unwrap_or(&keys[0])
                    .clone();
                let duplicates = keys
                    .into_iter()
                    .filter(|k| *k != keep && !referenced.contains(k))
                    .collect();
                DuplicateGroup {
                    hash,
                    keep,
                    duplicates,
                }
            })
            .filter(|group| !group.duplicates.is_empty())
            .collect();
        Ok(groups)
    }

    /// Delete catalog rows whose blob is missing. Blobs are untouched.
    pub fn delete_empty_records(&self, kind: Kind) -> PersistResult<usize> {
        let ids: Vec<RecordId> = self.empty_records(kind)?.iter().map(|row| row.id).collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = self.catalog.delete(kind, &ids)?;
        info!(kind = %kind, removed, "deleted empty records");
        Ok(removed)
    }

    /// Delete blobs that no row references. This cannot be undone.
    ///
    /// Returns the number of blobs actually removed; blobs already gone are
    /// not counted.
    pub fn delete_unreferenced_blobs(&self, kind: Kind) -> PersistResult<usize> {
        let keys = self.unreferenced_blobs(kind)?;
        let removed = self.delete_blobs(keys.iter())?;
        if removed > 0 {
            info!(kind = %kind, removed, "deleted unreferenced blobs");
        }
        Ok(removed)
    }

    /// Delete redundant copies reported by [`duplicate_blobs`](Self::duplicate_blobs).
    pub fn delete_duplicate_blobs(&self, kind: Kind) -> PersistResult<usize> {
        let groups = self.duplicate_blobs(kind)?;
        let removed = self.delete_blobs(groups.iter().flat_map(|g| g.duplicates.iter()))?;
        if removed > 0 {
            info!(kind = %kind, removed, "deleted duplicate blobs");
        }
        Ok(removed)
    }

    fn delete_blobs<'a>(&self, keys: impl Iterator<Item = &'a BlobKey>) -> PersistResult<usize> {
        let mut removed = 0;
        for key in keys {
            if self.store.delete(key)? {
                debug!(key = %key, "blob deleted");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Commit a row for every unreferenced blob of `T`'s kind.
    ///
    /// Each blob is decoded as `T` and committed under its existing key.
    /// Failures (undecodable bytes, hash already held by another row) are
    /// logged and skipped. Returns the number of rows created.
    pub fn reconcile_orphans<T: Persistable>(&self) -> PersistResult<usize> {
        let mut reconciled = 0;
        for key in self.unreferenced_blobs(T::KIND)? {
            let outcome =
                Record::<T>::create_from_blob(self, key.clone()).and_then(|mut r| r.commit());
            match outcome {
                Ok(()) => reconciled += 1,
                Err(e) => warn!(key = %key, error = %e, "could not reconcile orphan blob"),
            }
        }
        info!(kind = %T::KIND, reconciled, "reconciled orphan blobs");
        Ok(reconciled)
    }

    /// Commit a row for every unreferenced blob of `kind` without decoding.
    ///
    /// The row's hash is computed from the stored bytes, which equals the
    /// object hash for blobs written through this manager's codec.
    /// Per-blob failures are logged and skipped.
    pub fn reconcile_orphan_blobs(&self, kind: Kind) -> PersistResult<usize> {
        let mut reconciled = 0;
        for key in self.unreferenced_blobs(kind)? {
            match self.adopt_blob(&key) {
                Ok(true) => reconciled += 1,
                Ok(false) => {}
                Err(e) => warn!(key = %key, error = %e, "could not reconcile orphan blob"),
            }
        }
        info!(kind = %kind, reconciled, "reconciled orphan blobs");
        Ok(reconciled)
    }

    fn adopt_blob(&self, key: &BlobKey) -> PersistResult<bool> {
        let Some(bytes) = self.store.read(key)? else {
            return Ok(false);
        };
        let hash = self.hasher.hash_bytes(key.kind(), &bytes);
        match self.catalog.insert(NewRow::new(key.kind(), hash, key.clone())) {
            Ok(row) => {
                debug!(key = %key, id = %row.id, "orphan blob adopted");
                Ok(true)
            }
            Err(CatalogError::DuplicateKey { existing, .. }) => Err(PersistError::ImmutableUpdate {
                kind: key.kind(),
                id: None,
                hash,
                existing,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Read-only summary of `kind`'s consistency.
    pub fn audit(&self, kind: Kind) -> PersistResult<AuditReport> {
        Ok(AuditReport {
            kind,
            blob_count: self.all_blob_keys(kind)?.len(),
            record_count: self.catalog.count(kind)?,
            unreferenced: self.unreferenced_blobs(kind)?.into_iter().collect(),
            empty: self.empty_records(kind)?,
            duplicates: self.duplicate_blobs(kind)?,
        })
    }

    /// Remove duplicate blobs, then unreferenced blobs, then empty records.
    ///
    /// Duplicates go first so that a redundant copy is not also counted as
    /// unreferenced.
    pub fn collect_garbage(&self, kind: Kind) -> PersistResult<GcReport> {
        let report = GcReport {
            duplicates_removed: self.delete_duplicate_blobs(kind)?,
            blobs_removed: self.delete_unreferenced_blobs(kind)?,
            records_removed: self.delete_empty_records(kind)?,
        };
        info!(
            kind = %kind,
            duplicates = report.duplicates_removed,
            blobs = report.blobs_removed,
            records = report.records_removed,
            "garbage collection finished"
        );
        Ok(report)
    }
}

impl fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceManager")
            .field("codec", &self.codec())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture, fixture_with, Model, Text};
    use stash_catalog::JsonCatalog;
    use stash_crypto::CodecError;
    use stash_store::FsBlobStore;
    use std::thread;

    #[test]
    fn get_or_create_is_idempotent() {
        let fx = fixture();
        let model = Model::new("ridge", &[0.1, 0.2]);

        let (first, created) = fx.manager.get_or_create(model.clone()).unwrap();
        assert!(created);
        let (second, created) = fx.manager.get_or_create(model.clone()).unwrap();
        assert!(!created);

        assert_eq!(first.id(), second.id());
        assert_eq!(first.object_hash(), second.object_hash());
        assert!(second.is_loaded());
        assert_eq!(fx.store.len(), 1);
        assert_eq!(fx.catalog.count(Kind::Estimator).unwrap(), 1);
    }

    #[test]
    fn distinct_and_repeated_objects() {
        let fx = fixture();
        let (a, created_a) = fx.manager.get_or_create(Text("a".into())).unwrap();
        let (b, created_b) = fx.manager.get_or_create(Text("b".into())).unwrap();
        let (a2, created_a2) = fx.manager.get_or_create(Text("a".into())).unwrap();

        assert!(created_a && created_b && !created_a2);
        assert_ne!(a.id(), b.id());
        assert_eq!(a2.id(), a.id());
        assert_eq!(fx.catalog.count(Kind::DataSet).unwrap(), 2);
        assert_eq!(fx.manager.all_blob_keys(Kind::DataSet).unwrap().len(), 2);
    }

    #[test]
    fn same_content_in_different_kinds_is_independent() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Labels(String);
        impl Persistable for Labels {
            const KIND: Kind = Kind::TargetVector;
            const TYPE_NAME: &'static str = "labels";
        }

        let fx = fixture();
        let (text, _) = fx.manager.get_or_create(Text("x".into())).unwrap();
        let (labels, created) = fx.manager.get_or_create(Labels("x".into())).unwrap();
        assert!(created);
        assert_ne!(text.object_hash(), labels.object_hash());
    }

    #[test]
    fn same_layout_types_of_one_kind_are_distinct() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Ridge {
            alpha: f64,
        }
        impl Persistable for Ridge {
            const KIND: Kind = Kind::Estimator;
            const TYPE_NAME: &'static str = "ridge";
        }

        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Mean {
            mean: f64,
        }
        impl Persistable for Mean {
            const KIND: Kind = Kind::Estimator;
            const TYPE_NAME: &'static str = "mean";
        }

        let fx = fixture();
        let (ridge, created_ridge) = fx.manager.get_or_create(Ridge { alpha: 1.0 }).unwrap();
        let (mean, created_mean) = fx.manager.get_or_create(Mean { mean: 1.0 }).unwrap();
        assert!(created_ridge && created_mean);
        assert_ne!(ridge.id(), mean.id());
        assert_ne!(ridge.object_hash(), mean.object_hash());

        let mut wrong: Record<Mean> = fx.manager.load(ridge.id().unwrap()).unwrap();
        assert!(matches!(
            wrong.get_object(),
            Err(PersistError::Codec(CodecError::TypeMismatch { .. }))
        ));
        let mut right: Record<Ridge> = fx.manager.load(ridge.id().unwrap()).unwrap();
        assert_eq!(right.get_object().unwrap(), Some(&Ridge { alpha: 1.0 }));
    }

    #[test]
    fn concurrent_get_or_create_yields_one_row() {
        let fx = fixture();
        let model = Model::new("raced", &[1.0, 2.0, 3.0]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = fx.manager.clone();
                let model = model.clone();
                thread::spawn(move || {
                    let (record, created) = manager.get_or_create(model).unwrap();
                    (record.id().unwrap(), created)
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();

        let first_id = results[0].0;
        assert!(results.iter().all(|(id, _)| *id == first_id));
        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);
        assert_eq!(fx.catalog.count(Kind::Estimator).unwrap(), 1);
        assert_eq!(fx.store.len(), 1);
    }

    /// Three records: A intact, B with its row deleted, C with its blob deleted.
    fn three_way_split(fx: &crate::testutil::Fixture) -> (Record<Text>, Record<Text>, Record<Text>) {
        let (a, _) = fx.manager.get_or_create(Text("A".into())).unwrap();
        let (b, _) = fx.manager.get_or_create(Text("B".into())).unwrap();
        let (c, _) = fx.manager.get_or_create(Text("C".into())).unwrap();
        fx.catalog.delete(Kind::DataSet, &[b.id().unwrap()]).unwrap();
        fx.store.delete(c.blob_key().unwrap()).unwrap();
        (a, b, c)
    }

    #[test]
    fn detects_unreferenced_blobs_and_empty_records() {
        let fx = fixture();
        let (a, b, c) = three_way_split(&fx);

        let unreferenced = fx.manager.unreferenced_blobs(Kind::DataSet).unwrap();
        assert_eq!(unreferenced, [b.blob_key().unwrap().clone()].into_iter().collect());

        let empty = fx.manager.empty_records(Kind::DataSet).unwrap();
        assert_eq!(empty.len(), 1);
        assert_eq!(Some(empty[0].id), c.id());

        let all = fx.manager.all_blob_keys(Kind::DataSet).unwrap();
        assert!(all.contains(a.blob_key().unwrap()));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn deleting_garbage_leaves_consistent_state() {
        let fx = fixture();
        let (a, _, _) = three_way_split(&fx);

        assert_eq!(fx.manager.delete_unreferenced_blobs(Kind::DataSet).unwrap(), 1);
        assert_eq!(fx.manager.delete_empty_records(Kind::DataSet).unwrap(), 1);
        assert!(fx.manager.unreferenced_blobs(Kind::DataSet).unwrap().is_empty());
        assert!(fx.manager.empty_records(Kind::DataSet).unwrap().is_empty());

        let rows = fx.catalog.rows(Kind::DataSet).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(Some(rows[0].id), a.id());

        // Second pass finds nothing.
        assert_eq!(fx.manager.delete_unreferenced_blobs(Kind::DataSet).unwrap(), 0);
        assert_eq!(fx.manager.delete_empty_records(Kind::DataSet).unwrap(), 0);
    }

    #[test]
    fn reconciliation_is_scoped_to_kind() {
        let fx = fixture();
        three_way_split(&fx);
        assert!(fx.manager.unreferenced_blobs(Kind::Estimator).unwrap().is_empty());
        assert_eq!(fx.manager.delete_empty_records(Kind::Estimator).unwrap(), 0);
        assert_eq!(fx.catalog.count(Kind::DataSet).unwrap(), 2);
    }

    #[test]
    fn reconcile_orphans_recreates_rows() {
        let fx = fixture();
        let (_, b, _) = three_way_split(&fx);

        // An undecodable blob is skipped, not fatal.
        let junk = BlobKey::new(Kind::DataSet, "junk").unwrap();
        fx.store.write(&junk, b"\xff\xff\xff").unwrap();

        assert_eq!(fx.manager.reconcile_orphans::<Text>().unwrap(), 1);
        let restored = fx
            .manager
            .find_by_hash::<Text>(&b.object_hash().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(restored.blob_key(), b.blob_key());
        assert_eq!(
            fx.manager.unreferenced_blobs(Kind::DataSet).unwrap(),
            [junk].into_iter().collect()
        );
    }

    #[test]
    fn reconcile_orphan_blobs_without_decoding() {
        let fx = fixture();
        let (_, b, _) = three_way_split(&fx);

        assert_eq!(fx.manager.reconcile_orphan_blobs(Kind::DataSet).unwrap(), 1);
        let row = fx
            .catalog
            .find_by_hash(Kind::DataSet, &b.object_hash().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(&row.blob_key, b.blob_key().unwrap());

        let mut loaded: Record<Text> = fx.manager.load(row.id).unwrap();
        assert_eq!(loaded.get_object().unwrap(), Some(&Text("B".into())));
    }

    fn copy_blob(fx: &crate::testutil::Fixture, from: &BlobKey, name: &str) -> BlobKey {
        let bytes = fx.store.read(from).unwrap().unwrap();
        let key = BlobKey::new(from.kind(), name).unwrap();
        fx.store.write(&key, &bytes).unwrap();
        key
    }

    #[test]
    fn duplicate_blobs_keep_referenced_copy() {
        let fx = fixture();
        let (a, _) = fx.manager.get_or_create(Text("A".into())).unwrap();
        let original = a.blob_key().unwrap().clone();
        let copy1 = copy_blob(&fx, &original, "backup/a1");
        let copy2 = copy_blob(&fx, &original, "backup/a2");

        let groups = fx.manager.duplicate_blobs(Kind::DataSet).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keep, original);
        assert_eq!(groups[0].duplicates, vec![copy1, copy2]);
        assert_eq!(Some(groups[0].hash), a.object_hash());

        assert_eq!(fx.manager.delete_duplicate_blobs(Kind::DataSet).unwrap(), 2);
        assert!(fx.manager.duplicate_blobs(Kind::DataSet).unwrap().is_empty());
        assert!(fx.manager.empty_records(Kind::DataSet).unwrap().is_empty());
    }

    #[test]
    fn unreferenced_duplicates_keep_canonical_name() {
        let fx = fixture();
        let mut record = Record::new(&fx.manager, Text("loose".into())).unwrap();
        record.persist().unwrap();
        let canonical = record.blob_key().unwrap().clone();
        let copy = copy_blob(&fx, &canonical, "0-sorts-first");

        let groups = fx.manager.duplicate_blobs(Kind::DataSet).unwrap();
        assert_eq!(groups[0].keep, canonical);
        assert_eq!(groups[0].duplicates, vec![copy]);
    }

    #[test]
    fn duplicates_without_canonical_keep_smallest_key() {
        let fx = fixture();
        let bytes = fx
            .manager
            .hasher()
            .encode(Text::TAG, &Text("imported".into()))
            .unwrap();
        let first = BlobKey::new(Kind::DataSet, "a").unwrap();
        let second = BlobKey::new(Kind::DataSet, "b").unwrap();
        fx.store.write(&second, &bytes).unwrap();
        fx.store.write(&first, &bytes).unwrap();

        let groups = fx.manager.duplicate_blobs(Kind::DataSet).unwrap();
        assert_eq!(groups[0].keep, first);
        assert_eq!(groups[0].duplicates, vec![second]);
    }

    #[test]
    fn audit_and_collect_garbage() {
        let fx = fixture();
        let (a, _, _) = three_way_split(&fx);
        copy_blob(&fx, a.blob_key().unwrap(), "dup");

        let audit = fx.manager.audit(Kind::DataSet).unwrap();
        assert!(!audit.is_clean());
        assert_eq!(audit.blob_count, 3);
        assert_eq!(audit.record_count, 2);
        // The copy is both unreferenced and a duplicate.
        assert_eq!(audit.unreferenced.len(), 2);
        assert_eq!(audit.empty.len(), 1);
        assert_eq!(audit.duplicate_count(), 1);

        let preview = audit.gc_preview();
        let report = fx.manager.collect_garbage(Kind::DataSet).unwrap();
        assert_eq!(preview, report);
        assert_eq!(
            report,
            GcReport {
                duplicates_removed: 1,
                blobs_removed: 1,
                records_removed: 1,
            }
        );
        assert_eq!(report.total(), 3);
        assert!(fx.manager.audit(Kind::DataSet).unwrap().is_clean());
    }

    #[test]
    fn records_lists_unloaded_rows() {
        let fx = fixture();
        fx.manager.get_or_create(Text("1".into())).unwrap();
        fx.manager.get_or_create(Text("2".into())).unwrap();
        let records = fx.manager.records::<Text>().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.is_loaded() && r.is_committed()));
    }

    #[test]
    fn load_missing_id_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.manager.load::<Text>(RecordId::new(42)),
            Err(PersistError::NotFound { .. })
        ));
    }

    #[test]
    fn json_codec_round_trips() {
        let fx = fixture_with(Codec::Json);
        let model = Model::new("json", &[0.25]);
        let (created, _) = fx.manager.get_or_create(model.clone()).unwrap();
        let mut loaded: Record<Model> = fx.manager.load(created.id().unwrap()).unwrap();
        assert_eq!(loaded.get_object().unwrap(), Some(&model));
    }

    #[test]
    fn filesystem_backends_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let open = || {
            let store = Arc::new(FsBlobStore::at(dir.path().join("files")).unwrap());
            let catalog = Arc::new(JsonCatalog::open(dir.path().join("catalog.json")).unwrap());
            PersistenceManager::new(store, catalog, Codec::Bincode)
        };
        let model = Model::new("durable", &[7.0, 8.0]);

        let id = {
            let manager = open();
            let (record, created) = manager.get_or_create(model.clone()).unwrap();
            assert!(created);
            record.id().unwrap()
        };

        let manager = open();
        let (again, created) = manager.get_or_create(model.clone()).unwrap();
        assert!(!created);
        assert_eq!(again.id(), Some(id));

        let mut loaded: Record<Model> = manager.load(id).unwrap();
        assert_eq!(loaded.get_object().unwrap(), Some(&model));
        assert!(dir
            .path()
            .join("files")
            .join("estimators")
            .join(loaded.object_hash().unwrap().to_hex())
            .is_file());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hash_is_deterministic(name in ".{0,16}", weights in proptest::collection::vec(-1e6f64..1e6, 0..8)) {
                let fx = fixture();
                let a = Model::new(&name, &weights);
                let b = a.clone();
                prop_assert_eq!(fx.manager.hash(&a).unwrap(), fx.manager.hash(&b).unwrap());
            }

            #[test]
            fn decoded_object_hashes_identically(text in ".{0,32}") {
                let fx = fixture();
                let (record, _) = fx.manager.get_or_create(Text(text)).unwrap();
                let mut loaded: Record<Text> = fx.manager.load(record.id().unwrap()).unwrap();
                let object = loaded.get_object().unwrap().unwrap().clone();
                prop_assert_eq!(Some(fx.manager.hash(&object).unwrap()), record.object_hash());
            }
        }
    }
}
