//! Profile records and their on-disk metadata documents.
//!
//! Each profile is kept twice: as an entry in the central settings document,
//! and as `profiles_path/<name>/profile.json` so the registry can be rebuilt
//! by scanning storage if the central document is lost.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fs_utils::{check_path, ensure_dir};
use crate::toggles::Toggles;

/// Name of the built-in profile assumed when none is active.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// File name of the per-profile metadata document.
pub const PROFILE_DOCUMENT: &str = "profile.json";

const MAX_NAME_LEN: usize = 64;

/// A named snapshot of part of the configuration root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    /// Derived from the registry's active name; never serialized.
    #[serde(skip)]
    pub active: bool,
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default)]
    pub toggles: Toggles,
}

impl Profile {
    pub fn new(name: impl Into<String>, toggles: Toggles) -> Self {
        Self {
            name: name.into(),
            active: false,
            auto_sync: false,
            toggles,
        }
    }

    /// The profile assumed when the registry has no active entry.
    pub fn builtin_default() -> Self {
        Self::new(DEFAULT_PROFILE_NAME, Toggles::default())
    }

    pub fn is_builtin_default(&self) -> bool {
        self.name == DEFAULT_PROFILE_NAME
    }
}

/// Validate profile name
///
/// Only allows alphanumeric characters, underscores, and hyphens. The built-in
/// default name is reserved.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "name cannot be empty"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::invalid_name(
            name,
            format!("name cannot be longer than {} characters", MAX_NAME_LEN),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::invalid_name(
            name,
            "only alphanumeric characters, hyphens (-), and underscores (_) are allowed",
        ));
    }

    if name == DEFAULT_PROFILE_NAME {
        return Err(Error::invalid_name(name, "name is reserved"));
    }

    Ok(())
}

/// Storage directory of a profile.
pub fn profile_dir(profiles_path: &Path, name: &str) -> PathBuf {
    profiles_path.join(name)
}

/// Write `profiles_path/<name>/profile.json`.
pub fn write_document(profiles_path: &Path, profile: &Profile) -> Result<()> {
    let dir = profile_dir(profiles_path, &profile.name);
    ensure_dir(&dir)?;
    let content = serde_json::to_string_pretty(profile)?;
    fs::write(dir.join(PROFILE_DOCUMENT), content)?;
    Ok(())
}

/// Read a profile's metadata document from its storage directory.
pub fn read_document(dir: &Path) -> Result<Profile> {
    let path = dir.join(PROFILE_DOCUMENT);
    let content = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read every `profiles_path/*/profile.json`, sorted by name.
///
/// Directories without a document are ignored. Unreadable documents, and
/// documents whose name is invalid or differs from their directory name, are
/// logged and skipped, so every returned profile lives at
/// `profile_dir(profiles_path, name)` and names are unique.
pub fn scan_documents(profiles_path: &Path) -> Result<Vec<Profile>> {
    check_path(profiles_path)?;
    let mut profiles = Vec::new();
    if !profiles_path.is_dir() {
        return Ok(profiles);
    }

    for entry in fs::read_dir(profiles_path)? {
        let entry = entry?;
        let dir = entry.path();
        if !entry.file_type()?.is_dir() || !dir.join(PROFILE_DOCUMENT).is_file() {
            continue;
        }
        let profile = match read_document(&dir) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Skipping unreadable profile document in {}: {}", dir.display(), e);
                continue;
            }
        };
        if let Err(e) = validate_profile_name(&profile.name) {
            warn!("Skipping profile document in {}: {}", dir.display(), e);
            continue;
        }
        if entry.file_name().to_str() != Some(profile.name.as_str()) {
            warn!(
                "Skipping profile document in {}: it names '{}'",
                dir.display(),
                profile.name
            );
            continue;
        }
        debug!("Found profile '{}' in {}", profile.name, dir.display());
        profiles.push(profile);
    }

    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}
