use launchgrid_store::{DecodeError, FolderId};

use crate::enumerate::EnumerationError;

/// One discovered, visible item joined with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub location: String,
    /// Folder the item is shown under, derived from folder membership on
    /// every pass.
    pub folder_id: Option<FolderId>,
    pub category: Option<String>,
    pub sort_weight: i64,
}

/// A stored folder together with the members that are present this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderView {
    pub id: FolderId,
    pub name: String,
    /// Membership exactly as persisted, including ids that are not
    /// currently installed.
    pub member_ids: Vec<String>,
    /// Visible members in catalog order.
    pub members: Vec<Item>,
}

impl FolderView {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A top-level entry of the presentation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEntry {
    Item(Item),
    Folder(FolderView),
}

impl PresentationEntry {
    pub fn id(&self) -> String {
        match self {
            PresentationEntry::Item(item) => item.id.clone(),
            PresentationEntry::Folder(folder) => folder.id.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PresentationEntry::Item(item) => &item.name,
            PresentationEntry::Folder(folder) => &folder.name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, PresentationEntry::Folder(_))
    }
}

/// Result of one reconciliation pass. Published as a whole, so the item,
/// folder and presentation lists always agree with each other.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Increases by one with every published pass; 0 means nothing has been
    /// published yet.
    pub generation: u64,
    pub items: Vec<Item>,
    pub folders: Vec<FolderView>,
    pub entries: Vec<PresentationEntry>,
    pub failures: Vec<EnumerationError>,
    pub decode_errors: Vec<DecodeError>,
}

impl CatalogSnapshot {
    pub fn is_published(&self) -> bool {
        self.generation > 0
    }
}
