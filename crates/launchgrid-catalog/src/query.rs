use std::collections::BTreeSet;

use launchgrid_store::FolderId;

use crate::model::{CatalogSnapshot, FolderView, Item, PresentationEntry};

fn matches(name: &str, needle: &str) -> bool {
    needle.is_empty() || name.to_lowercase().contains(needle)
}

fn needle(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Read-only lookups over a published snapshot. Text matching is a
/// case-insensitive substring test on the name; blank text matches
/// everything.
impl CatalogSnapshot {
    /// Top-level entries whose name contains `text`, in presentation order.
    pub fn search(&self, text: &str) -> Vec<&PresentationEntry> {
        let needle = needle(text);
        self.entries
            .iter()
            .filter(|entry| matches(entry.name(), &needle))
            .collect()
    }

    /// Flat items filtered by name and, when given, exact category.
    pub fn filter_items(&self, text: &str, category: Option<&str>) -> Vec<&Item> {
        let needle = needle(text);
        self.items
            .iter()
            .filter(|item| matches(&item.name, &needle))
            .filter(|item| category.map_or(true, |wanted| item.category.as_deref() == Some(wanted)))
            .collect()
    }

    /// Distinct categories of visible items, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| item.category.as_deref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn folder(&self, folder_id: FolderId) -> Option<&FolderView> {
        self.folders.iter().find(|folder| folder.id == folder_id)
    }

    /// Effective members of a folder, or an empty slice for an unknown id.
    pub fn folder_members(&self, folder_id: FolderId) -> &[Item] {
        self.folder(folder_id)
            .map(|folder| folder.members.as_slice())
            .unwrap_or_default()
    }

    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }
}
