use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::ObjectHash;
use crate::kind::Kind;

/// Storage-relative address of a blob.
///
/// A key is a kind plus a name inside that kind's namespace. The canonical
/// name of an object's blob is the hex of its [`ObjectHash`]; blobs found on
/// storage under other names (manual copies, foreign imports) are still
/// addressable, which is what lets reconciliation see them.
///
/// Names are `/`-separated relative paths. Empty segments, `.`/`..`
/// segments, segments starting with `.` (reserved for in-flight temporary
/// files) and backslashes are rejected.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawBlobKey")]
pub struct BlobKey {
    kind: Kind,
    name: String,
}

/// Unvalidated wire form of [`BlobKey`].
#[derive(Deserialize)]
struct RawBlobKey {
    kind: Kind,
    name: String,
}

impl TryFrom<RawBlobKey> for BlobKey {
    type Error = TypeError;

    fn try_from(raw: RawBlobKey) -> Result<Self, Self::Error> {
        Self::new(raw.kind, raw.name)
    }
}

impl BlobKey {
    /// Create a key after validating the name.
    pub fn new(kind: Kind, name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { kind, name })
    }

    /// The canonical key for an object hash: the hash's hex in the kind's namespace.
    pub fn canonical(kind: Kind, hash: &ObjectHash) -> Self {
        Self {
            kind,
            name: hash.to_hex(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this key is the canonical key for `hash`.
    pub fn is_canonical_for(&self, hash: &ObjectHash) -> bool {
        self.name == hash.to_hex()
    }

    /// Hash encoded in the name, if the name is a canonical hash name.
    pub fn named_hash(&self) -> Option<ObjectHash> {
        if self.name.len() != ObjectHash::HEX_LEN {
            return None;
        }
        ObjectHash::from_hex(&self.name).ok()
    }
}

fn validate_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidBlobName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if name.contains('\\') {
        return Err(invalid("backslash in name"));
    }
    for segment in name.split('/') {
        if segment.is_empty() {
            return Err(invalid("empty path segment"));
        }
        if segment == "." || segment == ".." {
            return Err(invalid("relative path segment"));
        }
        if segment.starts_with('.') {
            return Err(invalid("hidden path segment"));
        }
    }
    Ok(())
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobKey({}/{})", self.kind, self.name)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}
