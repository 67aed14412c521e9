use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use launchgrid_store::{FileStore, FolderId, MetadataStore};

use crate::config::CatalogConfig;
use crate::enumerate::{BundleEnumerator, ItemEnumerator};
use crate::error::CatalogError;
use crate::launch::{LaunchError, Launcher};
use crate::model::CatalogSnapshot;
use crate::organize;
use crate::reconcile::Reconciler;
use crate::worker::{ReconcileWorker, Ticket};

/// Entry point for a launcher front-end.
///
/// Owns the reconcile worker and shares the [`MetadataStore`] with it.
/// Commands write the store on the calling thread and then request a forced
/// pass; their effect becomes visible with the next published snapshot.
pub struct Catalog {
    store: Arc<MetadataStore>,
    locations: Vec<PathBuf>,
    worker: ReconcileWorker,
}

impl Catalog {
    pub fn new(
        store: Arc<MetadataStore>,
        enumerator: Arc<dyn ItemEnumerator>,
        locations: Vec<PathBuf>,
    ) -> Result<Self, CatalogError> {
        let reconciler = Reconciler::new(Arc::clone(&store), enumerator, locations.clone());
        let worker = ReconcileWorker::spawn(reconciler)?;
        Ok(Self {
            store,
            locations,
            worker,
        })
    }

    /// File-backed store and bundle enumerator as described by `config`.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let store_dir = config.resolve_store_dir()?;
        let backend = FileStore::open(store_dir)?;
        tracing::debug!(store = %backend.dir().display(), "opened metadata store");
        Self::new(
            Arc::new(MetadataStore::new(Arc::new(backend))),
            Arc::new(BundleEnumerator::from_config(config)),
            config.locations.clone(),
        )
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    /// Last published snapshot. Generation 0 until the first pass finishes.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.worker.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    /// Asks for a reconciliation without waiting for it.
    ///
    /// A forced call always queues a pass, coalescing with one that is
    /// already waiting. A non-forced call only schedules the very first
    /// pass; once a snapshot exists, or while a pass is running, it just
    /// returns the current snapshot.
    pub fn reconcile(&self, force: bool) -> Arc<CatalogSnapshot> {
        if force || (!self.worker.is_busy() && !self.worker.has_published()) {
            self.worker.request();
        }
        self.worker.snapshot()
    }

    /// Like [`reconcile`](Self::reconcile) but blocks until the requested
    /// pass has been published.
    pub fn refresh_blocking(&self, force: bool) -> Arc<CatalogSnapshot> {
        if force || !self.worker.has_published() {
            let ticket = self.worker.request();
            return self.worker.wait_for(ticket);
        }
        self.worker.snapshot()
    }

    pub fn wait_for(&self, ticket: Ticket) -> Arc<CatalogSnapshot> {
        self.worker.wait_for(ticket)
    }

    pub fn wait_timeout(&self, ticket: Ticket, timeout: Duration) -> Option<Arc<CatalogSnapshot>> {
        self.worker.wait_timeout(ticket, timeout)
    }

    /// Blocks until every pass requested so far has been published.
    pub fn settle(&self) -> Arc<CatalogSnapshot> {
        self.worker.settle()
    }

    /// Number of passes the worker has completed.
    pub fn passes(&self) -> u64 {
        self.worker.passes()
    }

    /// Ids currently hidden, including items no longer installed.
    pub fn hidden_ids(&self) -> Vec<String> {
        self.store.hidden_ids().into_iter().collect()
    }

    pub fn hide(&self, item_id: &str) -> Result<Ticket, CatalogError> {
        self.commit("hide", organize::hide(&self.store, item_id))
    }

    pub fn hide_many(&self, item_ids: &[String]) -> Result<Ticket, CatalogError> {
        self.commit("hide_many", organize::hide_many(&self.store, item_ids))
    }

    pub fn unhide(&self, item_id: &str) -> Result<Ticket, CatalogError> {
        self.commit("unhide", organize::unhide(&self.store, item_id))
    }

    pub fn create_folder(
        &self,
        first: &str,
        second: &str,
        name: &str,
    ) -> Result<(FolderId, Ticket), CatalogError> {
        let created = organize::create_folder(&self.store, first, second, name);
        self.schedule("create_folder", created)
    }

    pub fn create_folder_from(
        &self,
        item_ids: &[String],
        name: &str,
    ) -> Result<(FolderId, Ticket), CatalogError> {
        let created = organize::create_folder_from(&self.store, item_ids, name);
        self.schedule("create_folder_from", created)
    }

    pub fn add_to_folder(
        &self,
        item_id: &str,
        folder_id: FolderId,
    ) -> Result<Ticket, CatalogError> {
        self.commit(
            "add_to_folder",
            organize::add_to_folder(&self.store, item_id, folder_id),
        )
    }

    pub fn move_many(
        &self,
        item_ids: &[String],
        folder_id: FolderId,
    ) -> Result<Ticket, CatalogError> {
        self.commit(
            "move_many",
            organize::move_many(&self.store, item_ids, folder_id),
        )
    }

    pub fn remove_from_folder(
        &self,
        item_id: &str,
        folder_id: FolderId,
    ) -> Result<Ticket, CatalogError> {
        self.commit(
            "remove_from_folder",
            organize::remove_from_folder(&self.store, item_id, folder_id),
        )
    }

    pub fn rename_folder(&self, folder_id: FolderId, name: &str) -> Result<Ticket, CatalogError> {
        self.commit(
            "rename_folder",
            organize::rename_folder(&self.store, folder_id, name),
        )
    }

    pub fn delete_folder(&self, folder_id: FolderId) -> Result<Ticket, CatalogError> {
        self.commit(
            "delete_folder",
            organize::delete_folder(&self.store, folder_id),
        )
    }

    pub fn set_category(
        &self,
        item_id: &str,
        category: Option<&str>,
    ) -> Result<Ticket, CatalogError> {
        self.commit(
            "set_category",
            organize::set_category(&self.store, item_id, category),
        )
    }

    pub fn set_category_many(
        &self,
        item_ids: &[String],
        category: Option<&str>,
    ) -> Result<Ticket, CatalogError> {
        self.commit(
            "set_category_many",
            organize::set_category_many(&self.store, item_ids, category),
        )
    }

    pub fn set_sort_weight(&self, item_id: &str, weight: i64) -> Result<Ticket, CatalogError> {
        self.commit(
            "set_sort_weight",
            organize::set_sort_weight(&self.store, item_id, weight),
        )
    }

    /// Opens a visible item of the current snapshot.
    pub fn launch(&self, launcher: &dyn Launcher, item_id: &str) -> Result<(), CatalogError> {
        let snapshot = self.worker.snapshot();
        let item = snapshot
            .find_item(item_id)
            .ok_or_else(|| LaunchError::UnknownItem(item_id.to_string()))?;
        launcher.launch(&item.location)?;
        Ok(())
    }

    fn commit(
        &self,
        command: &'static str,
        outcome: Result<bool, CatalogError>,
    ) -> Result<Ticket, CatalogError> {
        let (changed, ticket) = self.schedule(command, outcome)?;
        tracing::debug!(command, changed, "command applied");
        Ok(ticket)
    }

    // Rejected commands never reached the store, so they do not schedule a
    // pass. Everything else does, including failed writes.
    fn schedule<T>(
        &self,
        command: &'static str,
        outcome: Result<T, CatalogError>,
    ) -> Result<(T, Ticket), CatalogError> {
        match outcome {
            Ok(value) => Ok((value, self.worker.request())),
            Err(err @ CatalogError::InvalidCommand(_)) => {
                tracing::debug!(command, %err, "command rejected");
                Err(err)
            }
            Err(err) => {
                tracing::warn!(command, %err, "command failed to persist");
                self.worker.request();
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("locations", &self.locations)
            .field("generation", &self.worker.snapshot().generation)
            .finish_non_exhaustive()
    }
}
