use std::fmt::Write;

use launchgrid_catalog::{Item, PresentationEntry};

pub fn entries<'a>(entries: impl IntoIterator<Item = &'a PresentationEntry>) -> String {
    let mut out = String::new();
    for entry in entries {
        match entry {
            PresentationEntry::Folder(folder) => {
                let _ = writeln!(out, "[{}] {}", folder.name, folder.id);
                for member in &folder.members {
                    let _ = writeln!(out, "    {}", item_line(member));
                }
            }
            PresentationEntry::Item(item) => {
                let _ = writeln!(out, "{}", item_line(item));
            }
        }
    }
    out
}

pub fn items<'a>(items: impl IntoIterator<Item = &'a Item>) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "{}", item_line(item));
    }
    out
}

fn item_line(item: &Item) -> String {
    let mut line = format!("{}  {}", item.name, item.id);
    if let Some(category) = &item.category {
        let _ = write!(line, "  #{category}");
    }
    if item.sort_weight != 0 {
        let _ = write!(line, "  ^{}", item.sort_weight);
    }
    line
}

#[cfg(test)]
mod tests {
    use launchgrid_catalog::{FolderId, FolderView};
    use pretty_assertions::assert_eq;

    use super::*;

    fn item(id: &str, name: &str) -> Item {
        Item {
            id: id.into(),
            name: name.into(),
            location: format!("/Applications/{name}.app"),
            folder_id: None,
            category: None,
            sort_weight: 0,
        }
    }

    #[test]
    fn folders_list_their_members_indented() {
        let folder_id = FolderId::new();
        let mut games = item("com.chess", "Chess");
        games.category = Some("Games".into());
        games.sort_weight = -1;
        let listing = entries(&[
            PresentationEntry::Folder(FolderView {
                id: folder_id,
                name: "Fun".into(),
                member_ids: vec!["com.chess".into()],
                members: vec![games],
            }),
            PresentationEntry::Item(item("com.calc", "Calculator")),
        ]);
        assert_eq!(
            listing,
            format!("[Fun] {folder_id}\n    Chess  com.chess  #Games  ^-1\nCalculator  com.calc\n")
        );
    }
}
