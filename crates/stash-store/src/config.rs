use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use stash_types::Kind;

use crate::error::{StoreError, StoreResult};

/// Mapping from kind to the directory prefix its blobs live under.
///
/// Kinds without an explicit entry use [`Kind::default_namespace`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespaces {
    overrides: BTreeMap<Kind, String>,
}

impl Namespaces {
    /// Override the prefix used for `kind`.
    pub fn with(mut self, kind: Kind, prefix: impl Into<String>) -> Self {
        self.overrides.insert(kind, prefix.into());
        self
    }

    /// The prefix for `kind`.
    pub fn get(&self, kind: Kind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_namespace())
    }

    /// Check that every prefix is a plain relative path and that no two
    /// kinds share or nest inside each other's directory.
    pub fn validate(&self) -> StoreResult<()> {
        let prefixes: Vec<(Kind, PathBuf)> = Kind::ALL
            .iter()
            .map(|k| (*k, PathBuf::from(self.get(*k))))
            .collect();

        for (kind, prefix) in &prefixes {
            let plain = prefix.components().count() > 0
                && prefix
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !plain {
                return Err(StoreError::InvalidConfig(format!(
                    "namespace for {kind} must be a relative path, got {prefix:?}"
                )));
            }
        }

        for (i, (kind_a, a)) in prefixes.iter().enumerate() {
            for (kind_b, b) in &prefixes[i + 1..] {
                if a.starts_with(b) || b.starts_with(a) {
                    return Err(StoreError::InvalidConfig(format!(
                        "namespaces for {kind_a} ({}) and {kind_b} ({}) overlap",
                        a.display(),
                        b.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Configuration for [`FsBlobStore`](crate::FsBlobStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory all namespaces live under.
    pub root: PathBuf,
    /// Kind → directory prefix mapping.
    pub namespaces: Namespaces,
    /// `fsync` each blob before linking it into place.
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("files"),
            namespaces: Namespaces::default(),
            sync_writes: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}
