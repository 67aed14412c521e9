use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use launchgrid_store::{FileStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR_NAME: &str = "Launchgrid";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Where to look for items and where organisation metadata lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub locations: Vec<PathBuf>,
    pub bundle_extension: String,
    /// How deep below each location bundles are searched for. 1 lists only
    /// the location's direct children.
    pub max_depth: usize,
    /// Directory of the metadata store. Defaults to
    /// `<config_dir>/Launchgrid/catalog`.
    pub store_dir: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let mut locations = vec![
            PathBuf::from("/Applications"),
            PathBuf::from("/System/Applications"),
        ];
        if let Some(home) = dirs::home_dir() {
            locations.push(home.join("Applications"));
        }
        Self {
            locations,
            bundle_extension: "app".to_string(),
            max_depth: 1,
            store_dir: None,
        }
    }
}

impl CatalogConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(err) => {
                tracing::warn!(%err, "using default catalog config");
                Self::default()
            }
        }
    }

    pub fn resolve_store_dir(&self) -> Result<PathBuf, StoreError> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => FileStore::default_dir(),
        }
    }
}
