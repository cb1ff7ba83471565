//! The profile registry and the settings document it persists.
//!
//! [`ProfileRegistry`] owns the in-memory [`Settings`] and is the only way
//! changes become durable: nothing is written until [`ProfileRegistry::persist`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::profiles::{self, Profile};

/// The settings document, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Directory holding one storage directory per profile
    #[serde(default)]
    pub profiles_path: PathBuf,

    /// Name of the active profile, empty when none is active
    #[serde(default)]
    pub active_profile_name: String,

    #[serde(default)]
    pub profiles: Vec<Profile>,

    /// When the document was last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Somewhere the settings document can be loaded from and saved to.
pub trait SettingsStore {
    /// Load the document, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Settings>>;

    fn save(&self, settings: &Settings) -> Result<()>;

    /// Where the document lives, for diagnostics.
    fn location(&self) -> PathBuf;
}

/// Settings document kept as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<Settings>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the document atomically: write to a temp file, then rename.
    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(settings)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

/// In-memory list of profiles plus which one is active.
pub struct ProfileRegistry {
    settings: Settings,
    store: Box<dyn SettingsStore>,
}

impl std::fmt::Debug for ProfileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileRegistry")
            .field("settings", &self.settings)
            .field("store", &self.store.location())
            .finish()
    }
}

impl ProfileRegistry {
    /// Load the registry from `store`.
    ///
    /// A missing document yields an empty registry. An empty `profilesPath`
    /// falls back to `default_profiles_path`. Entries with an invalid or
    /// repeated name are dropped. An active name that matches no profile is
    /// cleared.
    pub fn open(store: Box<dyn SettingsStore>, default_profiles_path: &Path) -> Result<Self> {
        let mut settings = store.load()?.unwrap_or_default();
        if settings.profiles_path.as_os_str().is_empty() {
            settings.profiles_path = default_profiles_path.to_path_buf();
        }
        settings.profiles = keep_valid(std::mem::take(&mut settings.profiles));

        let mut registry = Self { settings, store };
        registry.sync_active_flags();
        debug!(
            "Opened registry with {} profile(s), active: {:?}",
            registry.settings.profiles.len(),
            registry.active_name()
        );
        Ok(registry)
    }

    fn sync_active_flags(&mut self) {
        let active = self.settings.active_profile_name.clone();
        if !active.is_empty() && self.find(&active).is_none() {
            warn!("Active profile '{}' is not registered, clearing", active);
            self.settings.active_profile_name.clear();
        }
        for profile in &mut self.settings.profiles {
            profile.active = profile.name == self.settings.active_profile_name;
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.settings.profiles
    }

    pub fn profiles_path(&self) -> &Path {
        &self.settings.profiles_path
    }

    pub fn set_profiles_path(&mut self, path: PathBuf) {
        self.settings.profiles_path = path;
    }

    /// Storage directory of the named profile.
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        profiles::profile_dir(&self.settings.profiles_path, name)
    }

    pub fn names(&self) -> Vec<String> {
        self.settings.profiles.iter().map(|p| p.name.clone()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.settings.profiles.iter().find(|p| p.name == name)
    }

    pub(crate) fn find_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.settings.profiles.iter_mut().find(|p| p.name == name)
    }

    /// Name of the active profile, if one is flagged.
    pub fn active_name(&self) -> Option<&str> {
        Some(self.settings.active_profile_name.as_str()).filter(|n| !n.is_empty())
    }

    /// The active profile, or the built-in default when none is flagged.
    pub fn get_active(&self) -> Cow<'_, Profile> {
        match self.settings.profiles.iter().find(|p| p.active) {
            Some(profile) => Cow::Borrowed(profile),
            None => Cow::Owned(Profile::builtin_default()),
        }
    }

    /// Register a new profile. It is added inactive.
    pub fn add(&mut self, mut profile: Profile) -> Result<()> {
        if self.find(&profile.name).is_some() {
            return Err(Error::AlreadyExists(profile.name));
        }
        profile.active = false;
        debug!("Registering profile '{}'", profile.name);
        self.settings.profiles.push(profile);
        Ok(())
    }

    /// Unregister a profile and return it.
    ///
    /// Removing the active profile leaves no profile active; electing a
    /// replacement is up to the caller.
    pub fn remove(&mut self, name: &str) -> Result<Profile> {
        let index = self
            .settings
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let profile = self.settings.profiles.remove(index);
        if profile.active {
            self.settings.active_profile_name.clear();
        }
        debug!("Unregistered profile '{}'", name);
        Ok(profile)
    }

    /// Make `name` the only active profile.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if self.find(name).is_none() {
            return Err(Error::NotFound(name.to_string()));
        }
        self.settings.active_profile_name = name.to_string();
        self.sync_active_flags();
        Ok(())
    }

    /// Leave no profile active.
    pub fn clear_active(&mut self) {
        self.settings.active_profile_name.clear();
        self.sync_active_flags();
    }

    /// Write every profile's `profile.json`, then the settings document.
    ///
    /// The settings document is written last, so on any failure the document
    /// on disk still describes the previous state.
    pub fn persist(&mut self) -> Result<()> {
        let location = self.store.location();
        let persist_failure = |e: Error| Error::PersistFailure {
            path: location.clone(),
            source: Box::new(e),
        };

        for profile in &self.settings.profiles {
            profiles::write_document(&self.settings.profiles_path, profile).map_err(persist_failure)?;
        }

        let previous = self.settings.updated_at.replace(Utc::now());
        if let Err(e) = self.store.save(&self.settings) {
            self.settings.updated_at = previous;
            return Err(persist_failure(e));
        }

        debug!("Persisted settings to {}", location.display());
        Ok(())
    }

    /// Replace the profile list with what `profiles_path/*/profile.json` holds.
    ///
    /// The active name is kept when the scanned list still contains it.
    /// Returns the number of profiles found. Not persisted.
    pub fn rescan(&mut self) -> Result<usize> {
        let scanned = profiles::scan_documents(&self.settings.profiles_path)?;
        info!(
            "Rescanned {}: {} profile(s)",
            self.settings.profiles_path.display(),
            scanned.len()
        );
        self.settings.profiles = scanned;
        self.sync_active_flags();
        Ok(self.settings.profiles.len())
    }
}

/// Drop profiles whose name fails validation or repeats an earlier entry.
fn keep_valid(loaded: Vec<Profile>) -> Vec<Profile> {
    let mut kept: Vec<Profile> = Vec::with_capacity(loaded.len());
    for profile in loaded {
        if let Err(e) = profiles::validate_profile_name(&profile.name) {
            warn!("Dropping registered profile: {}", e);
        } else if kept.iter().any(|p| p.name == profile.name) {
            warn!("Dropping duplicate profile '{}'", profile.name);
        } else {
            kept.push(profile);
        }
    }
    kept
}
