//! Persistent object records.
//!
//! A [`Record<T>`] pairs an in-memory object with its catalog identity: the
//! content hash, the blob key the encoded bytes live under, and (once
//! committed) the catalog id. The object itself is cached on the record and
//! loaded from the blob store on first access.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stash_catalog::{CatalogError, CatalogRow, NewRow};
use stash_crypto::TypeTag;
use stash_types::{BlobKey, Kind, ObjectHash, RecordId};
use tracing::{debug, info, warn};

use crate::error::{PersistError, PersistResult};
use crate::manager::PersistenceManager;

/// A type that can be stored as a content-addressed record.
///
/// The encoding must be deterministic: equal values must serialize to equal
/// bytes. Use ordered containers (`Vec`, `BTreeMap`) rather than `HashMap`
/// in implementing types.
pub trait Persistable: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Blob namespace and catalog partition of this type.
    const KIND: Kind;

    /// Stable name written into every stored value and covered by its hash.
    ///
    /// Must be unique among the types of one kind and must not change once
    /// values have been stored, since renaming it changes every hash.
    const TYPE_NAME: &'static str;

    /// Kind and type name together.
    const TAG: TypeTag = TypeTag::new(Self::KIND, Self::TYPE_NAME);
}

/// An object together with its persistence state.
///
/// Records are owned by one caller at a time. Loading and mutation go
/// through `&mut self`, so a cached object is never populated twice
/// concurrently.
pub struct Record<T: Persistable> {
    manager: PersistenceManager,
    id: Option<RecordId>,
    created_at: Option<DateTime<Utc>>,
    object_hash: Option<ObjectHash>,
    blob_key: Option<BlobKey>,
    description: String,
    object: Option<T>,
}

impl<T: Persistable> Record<T> {
    /// An uncommitted record with no object.
    pub fn empty(manager: &PersistenceManager) -> Self {
        Self {
            manager: manager.clone(),
            id: None,
            created_at: None,
            object_hash: None,
            blob_key: None,
            description: String::new(),
            object: None,
        }
    }

    /// An uncommitted record holding `object`.
    pub fn new(manager: &PersistenceManager, object: T) -> PersistResult<Self> {
        let mut record = Self::empty(manager);
        record.set_object(object)?;
        Ok(record)
    }

    /// A record for a blob that already exists in storage.
    ///
    /// The object is not read until [`get_object`](Self::get_object); the
    /// hash is taken from the decoded object at that point. No catalog row
    /// is assumed to exist.
    pub fn create_from_blob(manager: &PersistenceManager, key: BlobKey) -> PersistResult<Self> {
        if key.kind() != T::KIND {
            return Err(PersistError::KindMismatch {
                expected: T::KIND,
                actual: key.kind(),
            });
        }
        let mut record = Self::empty(manager);
        record.blob_key = Some(key);
        Ok(record)
    }

    /// An unloaded record for an existing catalog row.
    pub(crate) fn from_row(manager: &PersistenceManager, row: CatalogRow) -> Self {
        Self {
            manager: manager.clone(),
            id: Some(row.id),
            created_at: Some(row.created_at),
            object_hash: Some(row.object_hash),
            blob_key: Some(row.blob_key),
            description: row.description,
            object: None,
        }
    }

    pub(crate) fn cache_object(&mut self, object: Option<T>) {
        self.object = object;
    }

    pub(crate) fn take_object(&mut self) -> Option<T> {
        self.object.take()
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn object_hash(&self) -> Option<ObjectHash> {
        self.object_hash
    }

    pub fn blob_key(&self) -> Option<&BlobKey> {
        self.blob_key.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Set the free-text description. Takes effect in the catalog at the
    /// next [`commit`](Self::commit).
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn is_committed(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the object is cached in memory.
    pub fn is_loaded(&self) -> bool {
        self.object.is_some()
    }

    /// The cached object, without touching storage.
    pub fn into_object(self) -> Option<T> {
        self.object
    }

    /// Replace the object, recomputing its hash and canonical blob key.
    ///
    /// Purely local: nothing is written until [`persist`](Self::persist) or
    /// [`commit`](Self::commit).
    pub fn set_object(&mut self, object: T) -> PersistResult<()> {
        let hash = self.manager.hasher().hash(T::TAG, &object)?;
        self.object_hash = Some(hash);
        self.blob_key = Some(BlobKey::canonical(T::KIND, &hash));
        self.object = Some(object);
        Ok(())
    }

    /// The object, loading and caching it from the blob store on first call.
    ///
    /// Returns `Ok(None)` if no object was ever set and no blob exists at
    /// the record's key.
    pub fn get_object(&mut self) -> PersistResult<Option<&T>> {
        self.load()?;
        Ok(self.object.as_ref())
    }

    /// Mutable access to the object, loading it first if needed.
    ///
    /// Mutating a committed object changes its hash; the next
    /// [`commit`](Self::commit) reports that as
    /// [`PersistError::HashMismatch`].
    pub fn object_mut(&mut self) -> PersistResult<Option<&mut T>> {
        self.load()?;
        Ok(self.object.as_mut())
    }

    fn load(&mut self) -> PersistResult<()> {
        if self.object.is_some() {
            return Ok(());
        }
        let Some(key) = self.blob_key.clone() else {
            return Ok(());
        };
        let Some(bytes) = self.manager.store().read(&key)? else {
            return Ok(());
        };

        let hasher = *self.manager.hasher();
        let byte_hash = hasher.hash_bytes(T::KIND, &bytes);
        let decoded = hasher.decode::<T>(T::TAG, &bytes);
        if let Some(expected) = self.object_hash.filter(|hash| *hash != byte_hash) {
            // A non-canonical encoding of the same object is accepted; a
            // different object (or undecodable bytes) is not.
            let computed = match &decoded {
                Ok(object) => hasher.hash(T::TAG, object)?,
                Err(_) => byte_hash,
            };
            if computed != expected {
                warn!(
                    key = %key,
                    expected = %expected.short_hex(),
                    computed = %computed.short_hex(),
                    "stored blob does not match record hash"
                );
                return Err(PersistError::HashMismatch {
                    kind: T::KIND,
                    expected,
                    computed,
                });
            }
        }

        let object = decoded?;
        if self.object_hash.is_none() {
            self.object_hash = Some(hasher.hash(T::TAG, &object)?);
        }
        debug!(key = %key, len = bytes.len(), "object loaded");
        self.object = Some(object);
        Ok(())
    }

    /// Whether the record's blob exists in storage.
    pub fn is_persisted(&self) -> PersistResult<bool> {
        match &self.blob_key {
            Some(key) => Ok(self.manager.store().exists(key)?),
            None => Ok(false),
        }
    }

    /// Write the cached object to the blob store if its blob is missing.
    ///
    /// Returns `true` if bytes were written. Returns `false` when there is
    /// nothing to write (no object or hash) or the blob already exists.
    pub fn persist(&mut self) -> PersistResult<bool> {
        let (Some(hash), Some(key)) = (self.object_hash, self.blob_key.as_ref()) else {
            return Ok(false);
        };
        let Some(object) = self.object.as_ref() else {
            return Ok(false);
        };
        let store = self.manager.store();
        if store.exists(key)? {
            return Ok(false);
        }

        let (bytes, computed) = self.manager.hasher().encode_and_hash(T::TAG, object)?;
        if computed != hash {
            return Err(PersistError::HashMismatch {
                kind: T::KIND,
                expected: hash,
                computed,
            });
        }
        let written = store.write(key, &bytes)?;
        if written {
            debug!(key = %key, len = bytes.len(), "object persisted");
        }
        Ok(written)
    }

    /// Validate the record and write it to the catalog.
    ///
    /// Writes the blob first if it is missing, then checks that the object
    /// still hashes to the record's hash, then inserts a new row or updates
    /// the existing one.
    ///
    /// # Errors
    ///
    /// - [`PersistError::MissingObject`] if the record never had an object.
    /// - [`PersistError::ImmutableUpdate`] if the record is committed under a
    ///   different hash, or another row already holds this hash.
    /// - [`PersistError::HashMismatch`] if the object changed since its hash
    ///   was computed.
    /// - [`PersistError::DuplicateKey`] if a concurrent commit of the same
    ///   object won the insert.
    pub fn commit(&mut self) -> PersistResult<()> {
        let kind = T::KIND;
        if self.object_hash.is_none() {
            self.load()?;
        }
        let (Some(hash), Some(key)) = (self.object_hash, self.blob_key.clone()) else {
            return Err(PersistError::MissingObject { kind });
        };

        // Identity checks come before any write so a rejected commit leaves
        // no blob behind.
        let existing_row = match self.id {
            Some(id) => {
                let row = self
                    .manager
                    .catalog()
                    .get(kind, id)?
                    .ok_or(PersistError::NotFound { kind, id })?;
                if row.object_hash != hash {
                    return Err(PersistError::ImmutableUpdate {
                        kind,
                        id: Some(id),
                        hash,
                        existing: id,
                    });
                }
                Some(row)
            }
            None => {
                if let Some(other) = self.manager.catalog().find_by_hash(kind, &hash)? {
                    return Err(PersistError::ImmutableUpdate {
                        kind,
                        id: None,
                        hash,
                        existing: other.id,
                    });
                }
                None
            }
        };

        if !self.manager.store().exists(&key)? {
            self.persist()?;
        }

        let hasher = *self.manager.hasher();
        let computed = match self.get_object()? {
            Some(object) => hasher.hash(T::TAG, object)?,
            None => return Err(PersistError::MissingObject { kind }),
        };
        if computed != hash {
            return Err(PersistError::HashMismatch {
                kind,
                expected: hash,
                computed,
            });
        }

        let catalog = self.manager.catalog();
        match existing_row {
            Some(mut row) => {
                row.blob_key = key;
                row.description = self.description.clone();
                catalog.update(&row)?;
                debug!(kind = %kind, id = %row.id, "record updated");
            }
            None => {
                let new = NewRow::new(kind, hash, key).with_description(self.description.clone());
                let row = catalog.insert(new).map_err(|e| match e {
                    CatalogError::DuplicateKey {
                        kind,
                        hash,
                        existing,
                    } => PersistError::DuplicateKey {
                        kind,
                        hash,
                        existing,
                    },
                    other => PersistError::Catalog(other),
                })?;
                info!(kind = %kind, id = %row.id, hash = %hash.short_hex(), "record committed");
                self.id = Some(row.id);
                self.created_at = Some(row.created_at);
            }
        }
        Ok(())
    }
}

impl<T: Persistable> fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("kind", &T::KIND)
            .field("id", &self.id)
            .field("object_hash", &self.object_hash)
            .field("blob_key", &self.blob_key)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
