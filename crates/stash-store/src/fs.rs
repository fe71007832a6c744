use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use stash_types::{BlobKey, Kind};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// Filesystem blob store: one file per blob.
///
/// On-disk layout:
/// ```text
/// <root>/<namespace(kind)>/<name>
/// ```
///
/// Writes go to a temporary file in the destination directory and are then
/// linked into place without clobbering, so a crash never leaves a partial
/// blob under a real name and two writers racing on the same key cannot
/// overwrite each other. Temporary files are dot-prefixed and ignored by
/// [`BlobStore::list_all`].
#[derive(Debug)]
pub struct FsBlobStore {
    config: StoreConfig,
}

impl FsBlobStore {
    /// Open (or create) a store rooted at `config.root`.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.namespaces.validate()?;
        fs::create_dir_all(&config.root)?;
        debug!(root = %config.root.display(), "opened filesystem blob store");
        Ok(Self { config })
    }

    /// Open a store with default namespaces rooted at `root`.
    pub fn at(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(StoreConfig::at(root))
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Directory holding every blob of `kind`.
    pub fn namespace_dir(&self, kind: Kind) -> PathBuf {
        self.config.root.join(self.config.namespaces.get(kind))
    }

    /// Absolute path of the file backing `key`.
    pub fn path_for(&self, key: &BlobKey) -> PathBuf {
        let mut path = self.namespace_dir(key.kind());
        for segment in key.name().split('/') {
            path.push(segment);
        }
        path
    }

    /// Whether a regular file is present at `path`. Only `NotFound` reads as
    /// absent; any other metadata error is returned.
    fn is_blob(path: &Path) -> StoreResult<bool> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn same_content(path: &Path, data: &[u8]) -> StoreResult<bool> {
        // Cheap length check before reading the whole blob back.
        if fs::metadata(path)?.len() != data.len() as u64 {
            return Ok(false);
        }
        Ok(fs::read(path)? == data)
    }
}

impl BlobStore for FsBlobStore {
    fn exists(&self, key: &BlobKey) -> StoreResult<bool> {
        Self::is_blob(&self.path_for(key))
    }

    fn write(&self, key: &BlobKey, data: &[u8]) -> StoreResult<bool> {
        let path = self.path_for(key);
        if Self::is_blob(&path)? {
            return if Self::same_content(&path, data)? {
                Ok(false)
            } else {
                Err(StoreError::Conflict(key.clone()))
            };
        }

        let dir = path
            .parent()
            .ok_or_else(|| StoreError::InvalidConfig(format!("no parent for {}", path.display())))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.flush()?;
        if self.config.sync_writes {
            tmp.as_file().sync_all()?;
        }

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!(key = %key, len = data.len(), "blob written");
                Ok(true)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                // Lost a race with another writer; identical bytes are fine.
                if Self::same_content(&path, data)? {
                    debug!(key = %key, "blob written concurrently by another writer");
                    Ok(false)
                } else {
                    Err(StoreError::Conflict(key.clone()))
                }
            }
            Err(e) => Err(e.error.into()),
        }
    }

    fn read(&self, key: &BlobKey) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &BlobKey) -> StoreResult<bool> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                debug!(key = %key, "blob deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_all(&self, kind: Kind) -> StoreResult<BTreeSet<BlobKey>> {
        let dir = self.namespace_dir(kind);
        let mut keys = BTreeSet::new();
        if !dir.is_dir() {
            return Ok(keys);
        }

        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&dir) else {
                continue;
            };
            let segments: Option<Vec<&str>> =
                relative.components().map(|c| c.as_os_str().to_str()).collect();
            let Some(segments) = segments else {
                warn!(path = %entry.path().display(), "skipping blob with non-UTF-8 name");
                continue;
            };
            match BlobKey::new(kind, segments.join("/")) {
                Ok(key) => {
                    keys.insert(key);
                }
                Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping unaddressable blob"),
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Namespaces;
    use stash_types::ObjectHash;

    fn temp_store() -> (tempfile::TempDir, FsBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::at(dir.path()).unwrap();
        (dir, store)
    }

    fn key(kind: Kind, content: &[u8]) -> BlobKey {
        BlobKey::canonical(kind, &ObjectHash::of_bytes(content))
    }

    #[test]
    fn blobs_land_under_namespace() {
        let (dir, store) = temp_store();
        let k = key(Kind::Estimator, b"model");
        store.write(&k, b"model").unwrap();

        let expected = dir.path().join("estimators").join(k.name());
        assert_eq!(store.path_for(&k), expected);
        assert_eq!(fs::read(expected).unwrap(), b"model");
    }

    #[test]
    fn write_read_delete_cycle() {
        let (_dir, store) = temp_store();
        let k = key(Kind::DataSet, b"rows");
        assert!(!store.exists(&k).unwrap());
        assert!(store.write(&k, b"rows").unwrap());
        assert!(store.exists(&k).unwrap());
        assert_eq!(store.read(&k).unwrap().unwrap(), b"rows");
        assert!(store.delete(&k).unwrap());
        assert!(!store.delete(&k).unwrap());
        assert!(store.read(&k).unwrap().is_none());
    }

    #[test]
    fn identical_rewrite_is_noop_and_conflict_fails() {
        let (_dir, store) = temp_store();
        let k = key(Kind::Estimator, b"model");
        assert!(store.write(&k, b"model").unwrap());
        assert!(!store.write(&k, b"model").unwrap());
        assert!(matches!(store.write(&k, b"other!"), Err(StoreError::Conflict(_))));
        assert!(matches!(store.write(&k, b"mode1"), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn list_all_walks_nested_dirs_and_skips_hidden() {
        let (dir, store) = temp_store();
        let top = key(Kind::DataSet, b"top");
        store.write(&top, b"top").unwrap();

        let nested_dir = dir.path().join("datasets").join("2024");
        fs::create_dir_all(&nested_dir).unwrap();
        fs::write(nested_dir.join("copy"), b"copy").unwrap();
        fs::write(dir.path().join("datasets").join(".tmpAbC"), b"partial").unwrap();

        let keys = store.list_all(Kind::DataSet).unwrap();
        let nested = BlobKey::new(Kind::DataSet, "2024/copy").unwrap();
        assert_eq!(keys, [top, nested.clone()].into_iter().collect());
        assert_eq!(store.read(&nested).unwrap().unwrap(), b"copy");
    }

    #[test]
    fn list_all_on_missing_namespace_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.list_all(Kind::PredictedVector).unwrap().is_empty());
    }

    #[test]
    fn custom_namespaces_are_respected() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            root: dir.path().to_path_buf(),
            namespaces: Namespaces::default().with(Kind::Estimator, "models"),
            sync_writes: true,
        };
        let store = FsBlobStore::open(config).unwrap();
        let k = key(Kind::Estimator, b"m");
        store.write(&k, b"m").unwrap();
        assert!(dir.path().join("models").join(k.name()).is_file());
        assert_eq!(store.list_all(Kind::Estimator).unwrap().len(), 1);
    }

    #[test]
    fn overlapping_namespaces_refuse_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            root: dir.path().to_path_buf(),
            namespaces: Namespaces::default().with(Kind::Estimator, "datasets"),
            sync_writes: false,
        };
        assert!(matches!(
            FsBlobStore::open(config),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn externally_deleted_blob_reads_as_missing() {
        let (_dir, store) = temp_store();
        let k = key(Kind::TargetVector, b"y");
        store.write(&k, b"y").unwrap();
        fs::remove_file(store.path_for(&k)).unwrap();
        assert!(!store.exists(&k).unwrap());
        assert!(store.read(&k).unwrap().is_none());
        assert!(!store.delete(&k).unwrap());
    }

    #[test]
    fn metadata_errors_other_than_not_found_propagate() {
        let (_dir, store) = temp_store();
        let file = BlobKey::new(Kind::DataSet, "flat").unwrap();
        store.write(&file, b"flat").unwrap();

        // "flat" is a regular file, so a path below it fails with ENOTDIR.
        let below = BlobKey::new(Kind::DataSet, "flat/inner").unwrap();
        assert!(matches!(store.exists(&below), Err(StoreError::Io(_))));
        assert!(matches!(store.write(&below, b"x"), Err(StoreError::Io(_))));
    }

    #[test]
    fn concurrent_identical_writes_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let k = key(Kind::Estimator, b"raced");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let k = k.clone();
                thread::spawn(move || store.write(&k, b"raced").unwrap())
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        assert_eq!(store.read(&k).unwrap().unwrap(), b"raced");
        assert_eq!(store.list_all(Kind::Estimator).unwrap().len(), 1);
    }
}
