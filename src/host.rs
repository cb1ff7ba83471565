//! Hooks into the application whose configuration is being managed.

use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Asks the host application to pick up configuration that changed on disk.
///
/// Requests are fire-and-forget: the engine never waits on or inspects the
/// outcome.
pub trait ReloadSignal {
    fn request_reload(&self);
}

/// Does nothing; for hosts that re-read their configuration on their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReload;

impl ReloadSignal for NoReload {
    fn request_reload(&self) {}
}

/// Spawns a shell command to reload the host, without waiting for it.
#[derive(Debug, Clone)]
pub struct CommandReload {
    command: String,
}

impl CommandReload {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ReloadSignal for CommandReload {
    fn request_reload(&self) {
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => info!("Requested reload via '{}' (pid {})", self.command, child.id()),
            Err(e) => warn!("Failed to run reload command '{}': {}", self.command, e),
        }
    }
}
