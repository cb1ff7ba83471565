//! Profile switching logic.
//!
//! [`ProfileSwitcher`] orchestrates every user-facing profile operation on
//! top of the registry and the sync engine. The registry is only told a
//! profile is active after its files were applied without faults; the file
//! copies themselves are not undone when a batch fails.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fileset::resolve;
use crate::fs_utils::{check_path, ensure_dir};
use crate::host::ReloadSignal;
use crate::profiles::{Profile, validate_profile_name};
use crate::registry::ProfileRegistry;
use crate::sync::{SyncReport, copy_overwrite, mirror_tree, reconcile_newest, remove_tree};
use crate::toggles::{ToggleKey, Toggles};

/// Where the switcher is in its current or most recent operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchState {
    #[default]
    Idle,
    InProgress,
    Committed,
    RolledBack,
}

/// How a replacement is picked when the active profile is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackElection {
    FirstRemaining,
    LastRemaining,
}

/// Fallback policy used by [`ProfileSwitcher::remove_profile`].
pub const FALLBACK: FallbackElection = FallbackElection::FirstRemaining;

/// Result of [`ProfileSwitcher::switch_profile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Files were applied and the registry now points at the target.
    Switched(SyncReport),
    /// The target was already active; nothing was touched.
    AlreadyActive,
}

/// Result of [`ProfileSwitcher::remove_profile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Profile switched to because the removed one was active
    pub fallback: Option<String>,
    /// Files deleted from the profile's storage
    pub files_removed: usize,
}

/// A partial update to a profile. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub toggles: Vec<(ToggleKey, bool)>,
    pub auto_sync: Option<bool>,
}

impl ProfileEdit {
    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty() && self.auto_sync.is_none()
    }
}

/// Owns the registry and applies profile operations to the filesystem.
pub struct ProfileSwitcher {
    registry: ProfileRegistry,
    live_root: PathBuf,
    reload: Box<dyn ReloadSignal>,
    state: SwitchState,
}

impl ProfileSwitcher {
    pub fn new(registry: ProfileRegistry, live_root: PathBuf, reload: Box<dyn ReloadSignal>) -> Self {
        Self {
            registry,
            live_root,
            reload,
            state: SwitchState::Idle,
        }
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn live_root(&self) -> &Path {
        &self.live_root
    }

    pub fn state(&self) -> SwitchState {
        self.state
    }

    /// Storage directory of the named profile.
    pub fn profile_storage(&self, name: &str) -> PathBuf {
        self.registry.profile_dir(name)
    }

    fn transition(&mut self, next: SwitchState) {
        debug!("Switcher state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn lookup(&self, name: &str) -> Result<Profile> {
        self.registry
            .find(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Apply a profile's stored files to the live root and make it active.
    ///
    /// On a copy failure or a fault in any file the registry keeps its
    /// previous active profile. If persisting fails the in-memory active flag
    /// is restored as well, so memory matches what is on disk.
    pub fn switch_profile(&mut self, target: &str) -> Result<SwitchOutcome> {
        let profile = self.lookup(target)?;
        if profile.active {
            info!("Profile '{}' is already active", target);
            self.transition(SwitchState::Idle);
            return Ok(SwitchOutcome::AlreadyActive);
        }

        self.transition(SwitchState::InProgress);
        let previous = self.registry.active_name().map(str::to_string);
        let storage = self.profile_storage(target);

        let applied = copy_overwrite(&storage, &self.live_root, &resolve(&profile.toggles))
            .and_then(SyncReport::into_result);
        let report = match applied {
            Ok(report) => report,
            Err(e) => {
                warn!("Switch to '{}' failed, keeping {:?}: {}", target, previous, e);
                self.transition(SwitchState::RolledBack);
                return Err(e);
            }
        };

        self.registry.set_active(target)?;
        if let Err(e) = self.registry.persist() {
            match &previous {
                Some(name) => self.registry.set_active(name)?,
                None => self.registry.clear_active(),
            }
            self.transition(SwitchState::RolledBack);
            return Err(e);
        }

        self.reload.request_reload();
        self.transition(SwitchState::Committed);
        info!("Switched to profile '{}' ({} file(s))", target, report.copied);
        Ok(SwitchOutcome::Switched(report))
    }

    /// Create a profile that inherits the toggles of `base` (the active
    /// profile when `None`) and seed its storage from the live root.
    pub fn create_profile(&mut self, new_name: &str, base: Option<&str>) -> Result<SyncReport> {
        let base = match base {
            Some(name) => self.lookup(name)?,
            None => self.registry.get_active().into_owned(),
        };
        self.create_profile_with_toggles(new_name, base.toggles)
    }

    /// Create a profile with explicit toggles and seed its storage from the
    /// live root.
    ///
    /// When no profile is active yet the new one becomes active, since its
    /// storage now matches the live files.
    pub fn create_profile_with_toggles(&mut self, new_name: &str, toggles: Toggles) -> Result<SyncReport> {
        validate_profile_name(new_name)?;
        if self.registry.find(new_name).is_some() {
            return Err(Error::AlreadyExists(new_name.to_string()));
        }
        check_path(&self.live_root)?;
        if !self.live_root.is_dir() {
            return Err(Error::SourceMissing(self.live_root.clone()));
        }

        let file_set = resolve(&toggles);
        self.registry.add(Profile::new(new_name, toggles))?;
        if self.registry.active_name().is_none() {
            self.registry.set_active(new_name)?;
        }
        self.registry.persist()?;

        let report = copy_overwrite(&self.live_root, &self.profile_storage(new_name), &file_set)?;
        info!("Created profile '{}' ({} file(s) seeded)", new_name, report.copied);
        Ok(report)
    }

    /// Change a profile's toggles and auto-sync flag. Names cannot change.
    pub fn edit_profile(&mut self, name: &str, edit: &ProfileEdit) -> Result<()> {
        let profile = self
            .registry
            .find_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        for (key, value) in &edit.toggles {
            profile.toggles.set(*key, *value);
        }
        if let Some(auto_sync) = edit.auto_sync {
            profile.auto_sync = auto_sync;
        }

        self.registry.persist()?;
        info!("Updated profile '{}'", name);
        Ok(())
    }

    /// Remove a profile and its storage.
    ///
    /// Removing the active profile first switches to a fallback picked by
    /// [`FALLBACK`]; if that switch fails nothing is removed. With no other
    /// profile left the active flag is simply cleared.
    pub fn remove_profile(&mut self, name: &str) -> Result<Removal> {
        let profile = self.lookup(name)?;

        let mut fallback = None;
        if profile.active {
            match self.elect_fallback(name) {
                Some(next) => {
                    info!("Removing active profile '{}', switching to '{}'", name, next);
                    self.switch_profile(&next)?;
                    fallback = Some(next);
                }
                None => self.registry.clear_active(),
            }
        }

        let files_removed = remove_tree(&self.profile_storage(name))?;
        self.registry.remove(name)?;
        self.registry.persist()?;
        info!("Removed profile '{}'", name);
        Ok(Removal {
            fallback,
            files_removed,
        })
    }

    fn elect_fallback(&self, removing: &str) -> Option<String> {
        let mut remaining = self
            .registry
            .profiles()
            .iter()
            .filter(|p| p.name != removing)
            .map(|p| p.name.clone());
        match FALLBACK {
            FallbackElection::FirstRemaining => remaining.next(),
            FallbackElection::LastRemaining => remaining.last(),
        }
    }

    /// Copy the live files a profile governs into its storage.
    pub fn save_profile(&mut self, name: &str) -> Result<SyncReport> {
        let profile = self.lookup(name)?;
        copy_overwrite(
            &self.live_root,
            &self.profile_storage(name),
            &resolve(&profile.toggles),
        )
    }

    /// Copy a profile's stored files over the live root, then request a reload.
    ///
    /// The active flag is not changed.
    pub fn load_profile(&mut self, name: &str) -> Result<SyncReport> {
        let profile = self.lookup(name)?;
        let report = copy_overwrite(
            &self.profile_storage(name),
            &self.live_root,
            &resolve(&profile.toggles),
        )?;
        self.reload.request_reload();
        Ok(report)
    }

    /// Newest-wins reconciliation between the live root and the active
    /// profile's storage, when that profile has auto-sync enabled.
    ///
    /// Returns `None` when auto-sync is off.
    pub fn sync_settings(&mut self) -> Result<Option<SyncReport>> {
        let active = self.registry.get_active().into_owned();
        if !active.auto_sync {
            debug!("Auto-sync disabled for '{}'", active.name);
            return Ok(None);
        }

        let storage = self.profile_storage(&active.name);
        ensure_dir(&storage)?;
        let report = reconcile_newest(&self.live_root, &storage, &resolve(&active.toggles))?;
        Ok(Some(report))
    }

    /// Move all profile storage to `new_path`.
    ///
    /// The old tree is mirrored, the new location persisted, and only then is
    /// the old tree deleted. Returns the number of files moved.
    pub fn relocate_profiles(&mut self, new_path: &Path) -> Result<usize> {
        check_path(new_path)?;
        let old_path = self.registry.profiles_path().to_path_buf();
        if old_path == new_path {
            return Ok(0);
        }

        let moved = if old_path.is_dir() {
            mirror_tree(&old_path, new_path)?
        } else {
            ensure_dir(new_path)?;
            0
        };

        self.registry.set_profiles_path(new_path.to_path_buf());
        if let Err(e) = self.registry.persist() {
            self.registry.set_profiles_path(old_path);
            return Err(e);
        }

        remove_tree(&old_path)?;
        info!(
            "Relocated profiles {} -> {}",
            old_path.display(),
            new_path.display()
        );
        Ok(moved)
    }

    /// Rebuild the registry from the profile documents in storage and persist.
    pub fn rescan(&mut self) -> Result<usize> {
        let found = self.registry.rescan()?;
        self.registry.persist()?;
        Ok(found)
    }
}
