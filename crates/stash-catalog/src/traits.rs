//! The [`Catalog`] and [`EvaluationCatalog`] traits.

use std::collections::BTreeSet;

use stash_types::{BlobKey, Kind, ObjectHash, RecordId};

use crate::error::CatalogResult;
use crate::row::{CatalogRow, EvaluationRow, NewEvaluation, NewRow};

/// Storage backend for record metadata.
///
/// Every query is scoped to one [`Kind`]: rows of different kinds live in
/// separate partitions even though they share one id sequence.
///
/// Implementations must be thread-safe (`Send + Sync`) and must enforce the
/// `(kind, object_hash)` unique constraint atomically with the insert, since
/// that constraint is what resolves concurrent get-or-create races.
pub trait Catalog: Send + Sync {
    /// Insert a new row, assigning its id and creation time.
    ///
    /// Fails with [`CatalogError::DuplicateKey`](crate::CatalogError::DuplicateKey)
    /// if a row with the same kind and hash already exists.
    fn insert(&self, row: NewRow) -> CatalogResult<CatalogRow>;

    /// Update the mutable columns (`blob_key`, `description`) of an existing row.
    fn update(&self, row: &CatalogRow) -> CatalogResult<()>;

    /// Fetch a row by id. Returns `Ok(None)` if it does not exist.
    fn get(&self, kind: Kind, id: RecordId) -> CatalogResult<Option<CatalogRow>>;

    /// Fetch the row holding `hash`, if any.
    fn find_by_hash(&self, kind: Kind, hash: &ObjectHash) -> CatalogResult<Option<CatalogRow>>;

    /// Rows whose blob key is in `keys`.
    fn filter_by_blob_key_in(
        &self,
        kind: Kind,
        keys: &BTreeSet<BlobKey>,
    ) -> CatalogResult<Vec<CatalogRow>>;

    /// Rows whose blob key is not in `keys`.
    fn filter_by_blob_key_not_in(
        &self,
        kind: Kind,
        keys: &BTreeSet<BlobKey>,
    ) -> CatalogResult<Vec<CatalogRow>>;

    /// Delete rows by id. Ids that do not exist are skipped. Returns the
    /// number of rows removed.
    ///
    /// Backends that also implement [`EvaluationCatalog`] delete every
    /// evaluation referencing a removed row in the same step.
    fn delete(&self, kind: Kind, ids: &[RecordId]) -> CatalogResult<usize>;

    /// All rows of `kind`, in id order.
    fn rows(&self, kind: Kind) -> CatalogResult<Vec<CatalogRow>>;

    /// Number of rows of `kind`.
    fn count(&self, kind: Kind) -> CatalogResult<usize> {
        Ok(self.rows(kind)?.len())
    }

    /// The set of blob keys referenced by rows of `kind`.
    fn referenced_keys(&self, kind: Kind) -> CatalogResult<BTreeSet<BlobKey>> {
        Ok(self
            .rows(kind)?
            .into_iter()
            .map(|row| row.blob_key)
            .collect())
    }
}

/// Storage for evaluation rows linking an estimator to its inputs and outputs.
pub trait EvaluationCatalog: Send + Sync {
    /// Insert an evaluation. Every referenced record must exist.
    fn insert_evaluation(&self, evaluation: NewEvaluation) -> CatalogResult<EvaluationRow>;

    /// Fetch an evaluation by id.
    fn get_evaluation(&self, id: RecordId) -> CatalogResult<Option<EvaluationRow>>;

    /// All evaluations, in id order.
    fn evaluations(&self) -> CatalogResult<Vec<EvaluationRow>>;
}
