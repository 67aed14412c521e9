use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use launchgrid_store::{FolderId, MetadataSnapshot, MetadataStore};

use crate::enumerate::{derive_item_id, Candidate, ItemEnumerator};
use crate::model::{CatalogSnapshot, FolderView, Item, PresentationEntry};

/// Runs one reconciliation pass: reads the metadata, enumerates the search
/// locations and joins the two into a [`CatalogSnapshot`].
pub struct Reconciler {
    store: Arc<MetadataStore>,
    enumerator: Arc<dyn ItemEnumerator>,
    locations: Vec<PathBuf>,
}

impl Reconciler {
    pub fn new(
        store: Arc<MetadataStore>,
        enumerator: Arc<dyn ItemEnumerator>,
        locations: Vec<PathBuf>,
    ) -> Self {
        Self {
            store,
            enumerator,
            locations,
        }
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    pub fn run_pass(&self, generation: u64) -> CatalogSnapshot {
        let metadata = self.store.snapshot();
        let enumeration = self.enumerator.enumerate(&self.locations);
        for failure in &enumeration.failures {
            tracing::warn!(%failure, "search location skipped");
        }

        let enumerator = &self.enumerator;
        let candidates = enumeration
            .candidates
            .into_iter()
            .filter(|candidate| {
                let present = enumerator.location_exists(&candidate.location);
                if !present {
                    tracing::debug!(location = %candidate.location, "candidate vanished from disk");
                }
                present
            })
            .collect();

        let mut snapshot = assemble(&metadata, candidates);
        snapshot.generation = generation;
        snapshot.failures = enumeration.failures;
        snapshot.decode_errors = metadata.decode_errors;
        tracing::info!(
            generation,
            items = snapshot.items.len(),
            folders = snapshot.folders.len(),
            entries = snapshot.entries.len(),
            "catalog reconciled"
        );
        snapshot
    }
}

/// Joins enumerated candidates with the metadata into an ordered snapshot.
///
/// Candidates without a usable id or name are dropped, as are later
/// duplicates of an id and anything hidden. The returned snapshot has
/// generation 0 and no diagnostics.
pub fn assemble(metadata: &MetadataSnapshot, candidates: Vec<Candidate>) -> CatalogSnapshot {
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(id) = derive_item_id(&candidate) else {
            tracing::debug!(name = %candidate.name, "candidate has no usable id");
            continue;
        };
        if candidate.name.is_empty() {
            tracing::debug!(%id, "candidate has no name");
            continue;
        }
        if !seen.insert(id.clone()) {
            tracing::debug!(%id, location = %candidate.location, "duplicate item ignored");
            continue;
        }
        if metadata.hidden_ids.contains(&id) {
            continue;
        }
        items.push(Item {
            category: metadata.categories.get(&id).cloned(),
            sort_weight: metadata.sort_weights.get(&id).copied().unwrap_or(0),
            folder_id: None,
            name: candidate.name,
            location: candidate.location,
            id,
        });
    }
    sort_items(&mut items);

    let membership = membership_index(metadata);
    for item in &mut items {
        item.folder_id = membership.get(item.id.as_str()).copied();
    }

    let folders: Vec<FolderView> = metadata
        .folders
        .iter()
        .map(|folder| FolderView {
            id: folder.id,
            name: folder.name.clone(),
            member_ids: folder.member_ids.clone(),
            members: items
                .iter()
                .filter(|item| item.folder_id == Some(folder.id))
                .cloned()
                .collect(),
        })
        .collect();

    let mut entries: Vec<PresentationEntry> = folders
        .iter()
        .cloned()
        .map(PresentationEntry::Folder)
        .chain(
            items
                .iter()
                .filter(|item| item.folder_id.is_none())
                .cloned()
                .map(PresentationEntry::Item),
        )
        .collect();
    sort_entries(&mut entries);

    CatalogSnapshot {
        generation: 0,
        items,
        folders,
        entries,
        failures: Vec::new(),
        decode_errors: Vec::new(),
    }
}

/// Catalog order: sort weight, then case-insensitive name. Stable.
pub fn sort_items(items: &mut [Item]) {
    items.sort_by_cached_key(|item| (item.sort_weight, item.name.to_lowercase()));
}

/// Top-level order: folders before items, each by case-insensitive name.
/// Stable.
pub fn sort_entries(entries: &mut [PresentationEntry]) {
    entries.sort_by_cached_key(|entry| (!entry.is_folder(), entry.name().to_lowercase()));
}

// The first folder in stored order claims an id listed in several.
fn membership_index(metadata: &MetadataSnapshot) -> HashMap<&str, FolderId> {
    let mut index = HashMap::new();
    for folder in &metadata.folders {
        for member in &folder.member_ids {
            if index.contains_key(member.as_str()) {
                tracing::warn!(
                    item = %member,
                    folder = %folder.id,
                    "item listed in more than one folder"
                );
                continue;
            }
            index.insert(member.as_str(), folder.id);
        }
    }
    index
}
