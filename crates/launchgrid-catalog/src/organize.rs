//! Mutations of the organisation metadata.
//!
//! Each function validates its input, then changes exactly one record set
//! through a single `MetadataStore::update_*` call. They return whether the
//! stored record changed; references that no longer resolve (an unknown
//! folder id, an id that is not hidden) leave the store untouched.
//!
//! An item's folder membership is only ever changed through [`place`], which
//! keeps an item in at most one folder and deletes folders it empties.
//! [`delete_folder`] is the one exception: it drops a whole folder, and its
//! members return to the top level.

use std::collections::HashSet;

use launchgrid_store::{Folder, FolderId, MetadataStore};

use crate::error::CatalogError;

pub const DEFAULT_FOLDER_NAME: &str = "New Folder";

/// Moves `item_id` into `target`, or out of every folder when `target` is
/// `None`. Returns whether anything changed.
///
/// An unknown `target` is a no-op: the item stays where it was.
pub fn place(folders: &mut Vec<Folder>, item_id: &str, target: Option<FolderId>) -> bool {
    if let Some(target) = target {
        if !folders.iter().any(|folder| folder.id == target) {
            return false;
        }
    }

    let mut changed = false;
    let mut emptied = Vec::new();
    for folder in folders.iter_mut() {
        if Some(folder.id) == target {
            continue;
        }
        let before = folder.member_ids.len();
        folder.member_ids.retain(|member| member != item_id);
        if folder.member_ids.len() != before {
            changed = true;
            if folder.member_ids.is_empty() {
                emptied.push(folder.id);
            }
        }
    }
    folders.retain(|folder| !emptied.contains(&folder.id));

    if let Some(target) = target {
        if let Some(folder) = folders.iter_mut().find(|folder| folder.id == target) {
            if !folder.contains(item_id) {
                folder.member_ids.push(item_id.to_owned());
                changed = true;
            }
        }
    }
    changed
}

fn require_id(item_id: &str) -> Result<(), CatalogError> {
    if item_id.is_empty() {
        return Err(CatalogError::InvalidCommand("item id is empty".into()));
    }
    Ok(())
}

fn require_ids(item_ids: &[String]) -> Result<(), CatalogError> {
    if item_ids.is_empty() {
        return Err(CatalogError::InvalidCommand("no items given".into()));
    }
    item_ids.iter().try_for_each(|id| require_id(id))
}

fn folder_name(name: &str) -> String {
    match name.trim() {
        "" => DEFAULT_FOLDER_NAME.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn category_value(category: Option<&str>) -> Option<String> {
    category
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .map(str::to_owned)
}

pub fn hide(store: &MetadataStore, item_id: &str) -> Result<bool, CatalogError> {
    require_id(item_id)?;
    Ok(store.update_hidden_ids(|hidden| hidden.insert(item_id.to_owned()))?)
}

pub fn hide_many(store: &MetadataStore, item_ids: &[String]) -> Result<bool, CatalogError> {
    require_ids(item_ids)?;
    Ok(store.update_hidden_ids(|hidden| {
        item_ids
            .iter()
            .fold(false, |changed, id| hidden.insert(id.clone()) | changed)
    })?)
}

pub fn unhide(store: &MetadataStore, item_id: &str) -> Result<bool, CatalogError> {
    Ok(store.update_hidden_ids(|hidden| hidden.remove(item_id))?)
}

/// Creates a folder holding `first` and `second`, taking both out of any
/// folder they were in.
pub fn create_folder(
    store: &MetadataStore,
    first: &str,
    second: &str,
    name: &str,
) -> Result<FolderId, CatalogError> {
    if first == second {
        return Err(CatalogError::InvalidCommand(format!(
            "a folder needs two different items, got `{first}` twice"
        )));
    }
    create_folder_from(store, &[first.to_owned(), second.to_owned()], name)
}

/// Creates a folder from a selection. Duplicate ids are dropped, the first
/// occurrence keeps its position.
pub fn create_folder_from(
    store: &MetadataStore,
    item_ids: &[String],
    name: &str,
) -> Result<FolderId, CatalogError> {
    require_ids(item_ids)?;
    let mut seen = HashSet::new();
    let members: Vec<String> = item_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect();

    let folder = Folder::new(FolderId::new(), folder_name(name), members);
    let folder_id = folder.id;
    store.update_folders(|folders| {
        for member in &folder.member_ids {
            place(folders, member, None);
        }
        folders.push(folder);
        true
    })?;
    Ok(folder_id)
}

pub fn add_to_folder(
    store: &MetadataStore,
    item_id: &str,
    folder_id: FolderId,
) -> Result<bool, CatalogError> {
    require_id(item_id)?;
    Ok(store.update_folders(|folders| place(folders, item_id, Some(folder_id)))?)
}

pub fn move_many(
    store: &MetadataStore,
    item_ids: &[String],
    folder_id: FolderId,
) -> Result<bool, CatalogError> {
    require_ids(item_ids)?;
    Ok(store.update_folders(|folders| {
        item_ids.iter().fold(false, |changed, id| {
            place(folders, id, Some(folder_id)) | changed
        })
    })?)
}

/// Takes `item_id` out of `folder_id`; the folder is deleted once empty.
/// Nothing changes unless `folder_id` lists the item.
pub fn remove_from_folder(
    store: &MetadataStore,
    item_id: &str,
    folder_id: FolderId,
) -> Result<bool, CatalogError> {
    Ok(store.update_folders(|folders| {
        let listed = folders
            .iter()
            .any(|folder| folder.id == folder_id && folder.contains(item_id));
        listed && place(folders, item_id, None)
    })?)
}

pub fn rename_folder(
    store: &MetadataStore,
    folder_id: FolderId,
    name: &str,
) -> Result<bool, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::InvalidCommand("folder name is empty".into()));
    }
    Ok(store.update_folders(|folders| {
        match folders.iter_mut().find(|folder| folder.id == folder_id) {
            Some(folder) if folder.name != name => {
                folder.name = name.to_owned();
                true
            }
            _ => false,
        }
    })?)
}

pub fn delete_folder(store: &MetadataStore, folder_id: FolderId) -> Result<bool, CatalogError> {
    Ok(store.update_folders(|folders| {
        let before = folders.len();
        folders.retain(|folder| folder.id != folder_id);
        folders.len() != before
    })?)
}

/// Sets or clears a category. Blank categories clear.
pub fn set_category(
    store: &MetadataStore,
    item_id: &str,
    category: Option<&str>,
) -> Result<bool, CatalogError> {
    require_id(item_id)?;
    let category = category_value(category);
    Ok(store.update_categories(|categories| assign_category(categories, item_id, &category))?)
}

pub fn set_category_many(
    store: &MetadataStore,
    item_ids: &[String],
    category: Option<&str>,
) -> Result<bool, CatalogError> {
    require_ids(item_ids)?;
    let category = category_value(category);
    Ok(store.update_categories(|categories| {
        item_ids.iter().fold(false, |changed, id| {
            assign_category(categories, id, &category) | changed
        })
    })?)
}

fn assign_category(
    categories: &mut launchgrid_store::Categories,
    item_id: &str,
    category: &Option<String>,
) -> bool {
    match category {
        Some(category) => {
            categories.insert(item_id.to_owned(), category.clone()).as_ref() != Some(category)
        }
        None => categories.remove(item_id).is_some(),
    }
}

pub fn set_sort_weight(
    store: &MetadataStore,
    item_id: &str,
    weight: i64,
) -> Result<bool, CatalogError> {
    require_id(item_id)?;
    Ok(store.update_sort_weights(|weights| {
        weights.insert(item_id.to_owned(), weight) != Some(weight)
    })?)
}
