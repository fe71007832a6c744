//! Content-addressed persistence for Stash.
//!
//! This crate ties a [`BlobStore`](stash_store::BlobStore) and a
//! [`Catalog`](stash_catalog::Catalog) together into records of typed
//! objects:
//!
//! - [`Persistable`] marks a serde type as storable and names its [`Kind`](stash_types::Kind).
//! - [`Record<T>`] holds one object with its hash, blob key and catalog id,
//!   loading the object lazily from storage.
//! - [`PersistenceManager`] deduplicates through [`get_or_create`](PersistenceManager::get_or_create)
//!   and reconciles the two stores after crashes or manual deletions.
//!
//! # Identity
//!
//! A record's identity is the domain-separated BLAKE3 hash of its object's
//! encoding. The catalog holds at most one row per `(kind, hash)`, and a
//! committed row's hash never changes. Mutating a committed object is
//! detected at the next commit.
//!
//! ```text
//! get_or_create(obj)
//!   hash(obj) ──> catalog.find_by_hash ──> found: reuse row
//!                                     └──> missing: write blob, insert row
//! ```

pub mod error;
pub mod manager;
pub mod record;
pub mod report;

#[cfg(test)]
mod testutil;

pub use error::{PersistError, PersistResult};
pub use manager::PersistenceManager;
pub use record::{Persistable, Record};
pub use report::{AuditReport, DuplicateGroup, GcReport};
