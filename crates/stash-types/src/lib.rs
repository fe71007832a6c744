//! Foundation types for Stash.
//!
//! Stash persists in-memory objects (trained estimators, feature matrices,
//! target and prediction vectors) as content-addressed blobs and tracks them
//! in a catalog. This crate holds the identifiers shared by every other
//! Stash crate.
//!
//! # Key Types
//!
//! - [`ObjectHash`] -- Content hash of an object's canonical encoding (BLAKE3)
//! - [`Kind`] -- Category of storable object; each kind has its own blob
//!   namespace and uniqueness scope
//! - [`BlobKey`] -- Storage-relative address of a blob: kind plus name
//! - [`RecordId`] -- Catalog-assigned identifier of a committed record

pub mod error;
pub mod hash;
pub mod key;
pub mod kind;
pub mod record;

pub use error::TypeError;
pub use hash::ObjectHash;
pub use key::BlobKey;
pub use kind::Kind;
pub use record::RecordId;
