//! Application catalog reconciliation for Launchgrid.
//!
//! Installed items are discovered through an [`ItemEnumerator`], merged with
//! the organisation metadata kept in a [`MetadataStore`], and published as an
//! immutable [`CatalogSnapshot`]: the flat item list, the folders, and the
//! top-level presentation list a launcher front-end renders.
//!
//! Passes run on a single background worker. Mutations go through the
//! command methods on [`Catalog`], which write the store and then ask for a
//! fresh pass.

mod catalog;
mod config;
mod enumerate;
mod error;
mod launch;
mod model;
pub mod organize;
mod query;
mod reconcile;
mod worker;

pub use catalog::*;
pub use config::*;
pub use enumerate::*;
pub use error::*;
pub use launch::*;
pub use model::*;
pub use reconcile::*;
pub use worker::*;

pub use launchgrid_store::{
    DecodeError, FileStore, Folder, FolderId, KeyValueStore, MemoryStore, MetadataSnapshot,
    MetadataStore, StoreError,
};
