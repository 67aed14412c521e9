use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{self, DecodeError};
use crate::kv::{KeyValueStore, MemoryStore, StoreError};
use crate::records::{Categories, Folder, HiddenIds, SortWeights};

/// Suffix of the key that keeps the raw bytes of an undecodable record
/// before it is overwritten.
pub const CORRUPT_SUFFIX: &str = "corrupt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    HiddenIds,
    Folders,
    Categories,
    SortWeights,
}

impl RecordKey {
    pub const ALL: [RecordKey; 4] = [
        RecordKey::HiddenIds,
        RecordKey::Folders,
        RecordKey::Categories,
        RecordKey::SortWeights,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKey::HiddenIds => "hidden_ids",
            RecordKey::Folders => "folders",
            RecordKey::Categories => "categories",
            RecordKey::SortWeights => "sort_weights",
        }
    }

    pub fn corrupt_key(self) -> String {
        format!("{}.{CORRUPT_SUFFIX}", self.as_str())
    }
}

/// All four record sets as read at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataSnapshot {
    pub hidden_ids: HiddenIds,
    pub folders: Vec<Folder>,
    pub categories: Categories,
    pub sort_weights: SortWeights,
    pub decode_errors: Vec<DecodeError>,
}

enum Loaded<T> {
    Absent,
    Decoded(T),
    Corrupt { raw: Vec<u8>, error: DecodeError },
}

/// Typed access to the catalog's organisation metadata.
///
/// Every record set has its own lock. `snapshot` holds all of them (always in
/// `RecordKey::ALL` order) so a reader never mixes record sets from before and
/// after a write; each `update_*` holds only its own for the whole
/// read-modify-write.
pub struct MetadataStore {
    backend: Arc<dyn KeyValueStore>,
    hidden_ids: Mutex<()>,
    folders: Mutex<()>,
    categories: Mutex<()>,
    sort_weights: Mutex<()>,
}

impl MetadataStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            hidden_ids: Mutex::new(()),
            folders: Mutex::new(()),
            categories: Mutex::new(()),
            sort_weights: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn snapshot(&self) -> MetadataSnapshot {
        let _hidden = self.hidden_ids.lock();
        let _folders = self.folders.lock();
        let _categories = self.categories.lock();
        let _weights = self.sort_weights.lock();

        let mut decode_errors = Vec::new();
        let hidden_ids = self.read_soft(RecordKey::HiddenIds, &mut decode_errors);
        let folders = self.read_soft(RecordKey::Folders, &mut decode_errors);
        let categories = self.read_soft(RecordKey::Categories, &mut decode_errors);
        let sort_weights = self.read_soft(RecordKey::SortWeights, &mut decode_errors);
        MetadataSnapshot {
            hidden_ids,
            folders,
            categories,
            sort_weights,
            decode_errors,
        }
    }

    pub fn hidden_ids(&self) -> HiddenIds {
        let _guard = self.hidden_ids.lock();
        self.read_soft(RecordKey::HiddenIds, &mut Vec::new())
    }

    pub fn folders(&self) -> Vec<Folder> {
        let _guard = self.folders.lock();
        self.read_soft(RecordKey::Folders, &mut Vec::new())
    }

    /// Applies `mutate` to the hidden-id set. The closure returns whether it
    /// changed anything; unchanged sets are not written.
    pub fn update_hidden_ids<F>(&self, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut HiddenIds) -> bool,
    {
        let _guard = self.hidden_ids.lock();
        self.update_locked(RecordKey::HiddenIds, mutate)
    }

    pub fn update_folders<F>(&self, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Vec<Folder>) -> bool,
    {
        let _guard = self.folders.lock();
        self.update_locked(RecordKey::Folders, mutate)
    }

    pub fn update_categories<F>(&self, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Categories) -> bool,
    {
        let _guard = self.categories.lock();
        self.update_locked(RecordKey::Categories, mutate)
    }

    pub fn update_sort_weights<F>(&self, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut SortWeights) -> bool,
    {
        let _guard = self.sort_weights.lock();
        self.update_locked(RecordKey::SortWeights, mutate)
    }

    fn load<T: DeserializeOwned>(&self, key: RecordKey) -> Result<Loaded<T>, StoreError> {
        let Some(raw) = self.backend.get(key.as_str())? else {
            return Ok(Loaded::Absent);
        };
        Ok(match codec::decode(key.as_str(), &raw) {
            Ok(value) => Loaded::Decoded(value),
            Err(error) => Loaded::Corrupt { raw, error },
        })
    }

    fn read_soft<T>(&self, key: RecordKey, errors: &mut Vec<DecodeError>) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load(key) {
            Ok(Loaded::Absent) => T::default(),
            Ok(Loaded::Decoded(value)) => value,
            Ok(Loaded::Corrupt { error, .. }) => {
                log::warn!("{error}; using an empty {} record", key.as_str());
                errors.push(error);
                T::default()
            }
            Err(err) => {
                log::warn!("{err}; using an empty {} record", key.as_str());
                errors.push(DecodeError::Unreadable {
                    key: key.as_str().to_owned(),
                    reason: err.to_string(),
                });
                T::default()
            }
        }
    }

    fn update_locked<T, F>(&self, key: RecordKey, mutate: F) -> Result<bool, StoreError>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> bool,
    {
        let (mut value, corrupt) = match self.load::<T>(key)? {
            Loaded::Absent => (T::default(), None),
            Loaded::Decoded(value) => (value, None),
            Loaded::Corrupt { raw, error } => {
                log::warn!("{error}; rebuilding {} from empty", key.as_str());
                (T::default(), Some(raw))
            }
        };
        if !mutate(&mut value) {
            return Ok(false);
        }
        if let Some(raw) = corrupt {
            let backup = key.corrupt_key();
            self.backend.set(&backup, &raw)?;
            log::warn!("preserved undecodable {} record under `{backup}`", key.as_str());
        }
        let bytes = codec::encode(key.as_str(), &value)?;
        self.backend.set(key.as_str(), &bytes)?;
        Ok(true)
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::records::FolderId;

    fn store_with_backend() -> (MetadataStore, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (MetadataStore::new(backend.clone()), backend)
    }

    #[test]
    fn empty_store_reads_defaults() {
        let (store, _) = store_with_backend();
        let snapshot = store.snapshot();
        assert_eq!(snapshot, MetadataSnapshot::default());
    }

    #[test]
    fn unchanged_update_does_not_write() {
        let (store, backend) = store_with_backend();
        let changed = store.update_hidden_ids(|hidden| hidden.remove("com.a")).unwrap();
        assert!(!changed);
        assert!(backend.keys().is_empty());
    }

    #[test]
    fn record_sets_are_independent() {
        let (store, _) = store_with_backend();
        store
            .update_hidden_ids(|hidden| hidden.insert("com.a".into()))
            .unwrap();
        store
            .update_sort_weights(|weights| weights.insert("com.b".into(), -2).is_none())
            .unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.hidden_ids.len(), 1);
        assert_eq!(snapshot.sort_weights.get("com.b"), Some(&-2));
        assert!(snapshot.folders.is_empty());
        assert!(snapshot.categories.is_empty());
    }

    #[test]
    fn corrupt_record_reads_empty_and_reports() {
        let (store, backend) = store_with_backend();
        store
            .update_categories(|categories| {
                categories.insert("com.a".into(), "Dev".into()).is_none()
            })
            .unwrap();
        backend.set("folders", b"{{{").unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot.folders.is_empty());
        assert_eq!(snapshot.categories.get("com.a").map(String::as_str), Some("Dev"));
        assert_eq!(snapshot.decode_errors.len(), 1);
        assert_eq!(snapshot.decode_errors[0].key(), "folders");
    }

    #[test]
    fn overwriting_corrupt_record_keeps_a_backup() {
        let (store, backend) = store_with_backend();
        backend.set("folders", b"{{{").unwrap();
        let id = FolderId::new();
        store
            .update_folders(|folders| {
                folders.push(Folder::new(id, "Games", vec!["com.g".into()]));
                true
            })
            .unwrap();

        assert_eq!(
            backend.get("folders.corrupt").unwrap(),
            Some(b"{{{".to_vec())
        );
        let folders = store.folders();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].id, id);
        assert!(store.snapshot().decode_errors.is_empty());
    }
}
