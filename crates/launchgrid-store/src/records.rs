use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ids of items the user chose not to see.
pub type HiddenIds = BTreeSet<String>;

/// Item id to user category.
pub type Categories = BTreeMap<String, String>;

/// Item id to manual sort weight. Missing entries weigh 0.
pub type SortWeights = BTreeMap<String, i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(Uuid);

impl FolderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for FolderId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// A user-created group of items. Membership is ordered and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub member_ids: Vec<String>,
}

impl Folder {
    pub fn new(id: FolderId, name: impl Into<String>, member_ids: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            member_ids,
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.member_ids.iter().any(|member| member == item_id)
    }
}
