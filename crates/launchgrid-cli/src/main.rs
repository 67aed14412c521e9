use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use launchgrid_catalog::{Catalog, CatalogConfig, FolderId, SystemLauncher, Ticket};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser)]
#[command(author, version, about = "Organise and launch installed applications")]
struct Cli {
    /// Directory holding the organisation metadata.
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,
    /// Search location; repeat to scan several. Replaces the configured list.
    #[arg(long = "location", global = true, value_name = "DIR")]
    locations: Vec<PathBuf>,
    /// Catalog config file (JSON).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the top-level list with folder contents.
    List,
    /// Print every visible item in catalog order.
    Items(ItemsArgs),
    /// Search top-level entries by name.
    Search { text: String },
    /// Print the categories in use.
    Categories,
    /// Print hidden item ids.
    Hidden,
    /// Hide items from the catalog.
    Hide {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show a hidden item again.
    Unhide { id: String },
    /// Manage folders.
    #[command(subcommand)]
    Folder(FolderCommand),
    /// Set or clear the category of items.
    Category(CategoryArgs),
    /// Set the manual sort weight of an item. Lower weights come first.
    Weight {
        id: String,
        #[arg(allow_negative_numbers = true)]
        weight: i64,
    },
    /// Open an item with the system opener.
    Launch { id: String },
}

#[derive(Args)]
struct ItemsArgs {
    /// Only items whose name contains this text.
    #[arg(long)]
    filter: Option<String>,
    /// Only items in this category.
    #[arg(long)]
    category: Option<String>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("value").required(true).args(["set", "clear"])))]
struct CategoryArgs {
    #[arg(long, value_name = "CATEGORY")]
    set: Option<String>,
    #[arg(long)]
    clear: bool,
    #[arg(required = true)]
    ids: Vec<String>,
}

/// Folders are addressed by id or by exact name.
#[derive(Subcommand)]
enum FolderCommand {
    /// Create a folder from two or more items.
    Create {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(required = true, num_args = 2..)]
        ids: Vec<String>,
    },
    /// Add an item to a folder, taking it out of any other.
    Add { folder: String, id: String },
    /// Move several items into a folder.
    Move {
        folder: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Take an item out of a folder.
    Remove { folder: String, id: String },
    Rename { folder: String, name: String },
    /// Delete a folder; its members return to the top level.
    Delete { folder: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let catalog = Catalog::from_config(&config).context("failed to open the catalog")?;
    execute(&catalog, cli.command)
}

fn load_config(cli: &Cli) -> Result<CatalogConfig> {
    let mut config = match &cli.config {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::default_path()
            .map(|path| CatalogConfig::load_or_default(&path))
            .unwrap_or_default(),
    };
    if let Some(store) = &cli.store {
        config.store_dir = Some(store.clone());
    }
    if !cli.locations.is_empty() {
        config.locations = cli.locations.clone();
    }
    Ok(config)
}

fn execute(catalog: &Catalog, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            print!("{}", render::entries(&catalog.refresh_blocking(false).entries));
        }
        Commands::Items(args) => {
            let snapshot = catalog.refresh_blocking(false);
            let items = snapshot.filter_items(
                args.filter.as_deref().unwrap_or_default(),
                args.category.as_deref(),
            );
            print!("{}", render::items(items));
        }
        Commands::Search { text } => {
            let snapshot = catalog.refresh_blocking(false);
            print!("{}", render::entries(snapshot.search(&text)));
        }
        Commands::Categories => {
            for category in catalog.refresh_blocking(false).categories() {
                println!("{category}");
            }
        }
        Commands::Hidden => {
            for id in catalog.hidden_ids() {
                println!("{id}");
            }
        }
        Commands::Hide { ids } => {
            let ticket = match ids.as_slice() {
                [id] => catalog.hide(id)?,
                _ => catalog.hide_many(&ids)?,
            };
            settle(catalog, ticket);
            println!("hidden {}", ids.join(", "));
        }
        Commands::Unhide { id } => {
            settle(catalog, catalog.unhide(&id)?);
            println!("unhidden {id}");
        }
        Commands::Folder(command) => execute_folder(catalog, command)?,
        Commands::Category(args) => {
            let category = if args.clear { None } else { args.set.as_deref() };
            let ticket = match args.ids.as_slice() {
                [id] => catalog.set_category(id, category)?,
                _ => catalog.set_category_many(&args.ids, category)?,
            };
            settle(catalog, ticket);
            match category {
                Some(category) => println!("categorised {} as {category}", args.ids.join(", ")),
                None => println!("cleared category of {}", args.ids.join(", ")),
            }
        }
        Commands::Weight { id, weight } => {
            settle(catalog, catalog.set_sort_weight(&id, weight)?);
            println!("{id} now has weight {weight}");
        }
        Commands::Launch { id } => {
            catalog.refresh_blocking(false);
            catalog.launch(&SystemLauncher, &id)?;
        }
    }
    Ok(())
}

fn execute_folder(catalog: &Catalog, command: FolderCommand) -> Result<()> {
    match command {
        FolderCommand::Create { name, ids } => {
            let (folder_id, ticket) = match ids.as_slice() {
                [first, second] => catalog.create_folder(first, second, &name)?,
                _ => catalog.create_folder_from(&ids, &name)?,
            };
            let snapshot = catalog.wait_for(ticket);
            let name = snapshot
                .folder(folder_id)
                .map(|folder| folder.name.as_str())
                .unwrap_or(name.as_str());
            println!("created folder {name} ({folder_id})");
        }
        FolderCommand::Add { folder, id } => {
            let folder_id = resolve_folder(catalog, &folder)?;
            settle(catalog, catalog.add_to_folder(&id, folder_id)?);
            println!("added {id} to {folder}");
        }
        FolderCommand::Move { folder, ids } => {
            let folder_id = resolve_folder(catalog, &folder)?;
            settle(catalog, catalog.move_many(&ids, folder_id)?);
            println!("moved {} to {folder}", ids.join(", "));
        }
        FolderCommand::Remove { folder, id } => {
            let folder_id = resolve_folder(catalog, &folder)?;
            settle(catalog, catalog.remove_from_folder(&id, folder_id)?);
            println!("removed {id} from {folder}");
        }
        FolderCommand::Rename { folder, name } => {
            let folder_id = resolve_folder(catalog, &folder)?;
            settle(catalog, catalog.rename_folder(folder_id, &name)?);
            println!("renamed {folder} to {}", name.trim());
        }
        FolderCommand::Delete { folder } => {
            let folder_id = resolve_folder(catalog, &folder)?;
            settle(catalog, catalog.delete_folder(folder_id)?);
            println!("deleted {folder}");
        }
    }
    Ok(())
}

fn resolve_folder(catalog: &Catalog, reference: &str) -> Result<FolderId> {
    if let Ok(id) = reference.parse::<FolderId>() {
        return Ok(id);
    }
    let folders = catalog.store().folders();
    let mut matching = folders.iter().filter(|folder| folder.name == reference);
    match (matching.next(), matching.next()) {
        (Some(folder), None) => Ok(folder.id),
        (Some(_), Some(_)) => bail!("several folders are named `{reference}`; use the folder id"),
        (None, _) => Err(anyhow!("no folder named `{reference}`")),
    }
}

// The process exits right after a command, so wait for the pass it
// requested to keep the log output complete.
fn settle(catalog: &Catalog, ticket: Ticket) {
    let snapshot = catalog.wait_for(ticket);
    tracing::debug!(generation = snapshot.generation, "catalog updated");
}
