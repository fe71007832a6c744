use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stash_crypto::Codec;
use stash_store::{Namespaces, StoreConfig};

pub const DEFAULT_CONFIG_FILE: &str = "stash.toml";

/// Repository configuration read from `stash.toml`.
///
/// ```toml
/// root = "files"
/// catalog = "files/catalog.json"
/// codec = "bincode"
/// sync_writes = false
///
/// [namespaces]
/// estimator = "models"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Blob store root.
    pub root: PathBuf,
    /// JSON catalog file.
    pub catalog: PathBuf,
    /// Encoding of stored objects.
    pub codec: Codec,
    /// Per-kind namespace overrides.
    pub namespaces: Namespaces,
    pub sync_writes: bool,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("files"),
            catalog: PathBuf::from("files").join("catalog.json"),
            codec: Codec::default(),
            namespaces: Namespaces::default(),
            sync_writes: false,
        }
    }
}

impl StashConfig {
    /// Load from `path`, or from `./stash.toml` if it exists, or fall back to
    /// defaults. An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse a config file. Relative paths inside it are resolved against
    /// the file's directory.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Self = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.root = base.join(&config.root);
            config.catalog = base.join(&config.catalog);
        }
        Ok(config)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            root: self.root.clone(),
            namespaces: self.namespaces.clone(),
            sync_writes: self.sync_writes,
        }
    }
}
