use launchgrid_store::StoreError;
use thiserror::Error;

use crate::launch::LaunchError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("failed to start reconcile worker: {0}")]
    Worker(#[source] std::io::Error),
}
