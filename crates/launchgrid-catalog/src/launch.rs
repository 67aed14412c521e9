use std::io;
use std::process::{Command, ExitStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no item with id {0} in the catalog")]
    UnknownItem(String),
    #[error("failed to start opener for {location}: {source}")]
    Spawn { location: String, source: io::Error },
    #[error("opener for {location} exited with {status}")]
    Exit { location: String, status: ExitStatus },
}

/// Host capability that opens an item by its location.
pub trait Launcher: Send + Sync {
    fn launch(&self, location: &str) -> Result<(), LaunchError>;
}

/// Hands the location to the platform opener (`open`, `xdg-open` or
/// `cmd /C start`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    fn command(location: &str) -> Command {
        #[cfg(target_os = "macos")]
        {
            let mut command = Command::new("open");
            command.arg(location);
            command
        }
        #[cfg(target_os = "windows")]
        {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(location);
            command
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let mut command = Command::new("xdg-open");
            command.arg(location);
            command
        }
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, location: &str) -> Result<(), LaunchError> {
        tracing::info!(%location, "launching item");
        let status = Self::command(location)
            .status()
            .map_err(|source| LaunchError::Spawn {
                location: location.to_string(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(LaunchError::Exit {
                location: location.to_string(),
                status,
            })
        }
    }
}
