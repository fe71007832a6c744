//! Hashing and canonical encoding for Stash.
//!
//! An object's identity is the domain-separated BLAKE3 digest of its
//! canonical encoding. The encoding carries the object's type name (see
//! [`TypeTag`]) and the domain tag is derived from the object's
//! [`Kind`](stash_types::Kind), so neither two same-layout types nor
//! identical bytes stored under two kinds share a hash.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod codec;
pub mod hasher;
pub mod object;

pub use codec::{Codec, CodecError, CodecResult};
pub use hasher::ContentHasher;
pub use object::{ObjectHasher, TypeTag};
