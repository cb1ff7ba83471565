//! Error types for the profile engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::sync::FileFault;

/// Result type alias using vaultprof's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while managing profiles.
#[derive(Error, Debug)]
pub enum Error {
    /// A path contains an empty segment (or is empty altogether).
    #[error("invalid path: {0:?}")]
    InvalidPath(PathBuf),

    /// A profile name failed validation.
    #[error("invalid profile name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// No profile with this name is registered.
    #[error("profile '{0}' does not exist")]
    NotFound(String),

    /// A profile with this name is already registered.
    #[error("profile '{0}' already exists")]
    AlreadyExists(String),

    /// The root a batch reads from does not exist.
    #[error("source root does not exist: {0:?}")]
    SourceMissing(PathBuf),

    /// One or more files in a batch could not be copied.
    #[error("{} file(s) failed to copy, first: {}", .0.len(), first_fault(.0))]
    PerFileFailure(Vec<FileFault>),

    /// The settings document could not be written.
    #[error("failed to persist settings to {path:?}: {source}")]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn first_fault(faults: &[FileFault]) -> String {
    faults
        .first()
        .map(|f| format!("{} ({})", f.path.display(), f.reason))
        .unwrap_or_default()
}

impl Error {
    pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
