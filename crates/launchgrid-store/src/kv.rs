use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;

const APP_DIR_NAME: &str = "Launchgrid";
const CATALOG_DIR_NAME: &str = "catalog";
const RECORD_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read record `{key}`: {source}")]
    Read { key: String, source: io::Error },
    #[error("failed to write record `{key}`: {source}")]
    Write { key: String, source: io::Error },
    #[error("failed to encode record `{key}`: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("invalid record key `{0}`")]
    InvalidKey(String),
    #[error("failed to prepare store directory {}: {source}", .path.display())]
    Directory { path: PathBuf, source: io::Error },
    #[error("no config directory available")]
    NoConfigDir,
}

/// Byte-level storage of independently keyed records.
///
/// `set` must be all-or-nothing: after a failed write the previous value is
/// still the one returned by `get`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_owned(), value.to_vec());
        Ok(())
    }
}

/// Stores each record as `<dir>/<key>.json`.
///
/// Writes go through a temporary file in the same directory that is then
/// renamed over the destination, so readers never see a torn record.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Directory {
            path: dir.clone(),
            source,
        })?;
        log::debug!("opened catalog store at {}", dir.display());
        Ok(Self { dir })
    }

    /// `<config_dir>/Launchgrid/catalog`, created on demand.
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        let mut dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        dir.push(APP_DIR_NAME);
        dir.push(CATALOG_DIR_NAME);
        Ok(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.{RECORD_EXTENSION}")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.record_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.record_path(key)?;
        let write_err = |source| StoreError::Write {
            key: key.to_owned(),
            source,
        };
        let mut file = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        file.write_all(value).map_err(write_err)?;
        file.as_file().sync_all().map_err(write_err)?;
        file.persist(&path).map_err(|err| write_err(err.error))?;
        log::trace!("wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn file_store_reads_back_what_it_wrote() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("catalog")).unwrap();
        assert_eq!(store.get("folders").unwrap(), None);
        store.set("folders", b"[]").unwrap();
        store.set("folders", b"[1]").unwrap();
        assert_eq!(store.get("folders").unwrap(), Some(b"[1]".to_vec()));
        assert!(store.dir().join("folders.json").is_file());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("../escape", b"{}"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
        assert!(store.set("folders.corrupt", b"x").is_ok());
    }

    #[test]
    fn memory_store_lists_keys_in_order() {
        let store = MemoryStore::new();
        store.set("sort_weights", b"{}").unwrap();
        store.set("categories", b"{}").unwrap();
        assert_eq!(store.keys(), vec!["categories", "sort_weights"]);
    }
}
