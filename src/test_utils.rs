//! Test utilities shared across test modules
//!
//! [`Harness`] builds a complete environment inside a temporary directory: a
//! live configuration root, profile storage, a JSON settings document and a
//! reload signal that counts requests.

use std::cell::Cell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::host::ReloadSignal;
use crate::registry::{JsonFileStore, ProfileRegistry, Settings, SettingsStore};
use crate::switch::ProfileSwitcher;

/// Reload signal that only counts how often it was asked.
#[derive(Debug, Clone, Default)]
pub struct CountingReload(Rc<Cell<usize>>);

impl ReloadSignal for CountingReload {
    fn request_reload(&self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Settings store whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore;

impl SettingsStore for FailingStore {
    fn load(&self) -> Result<Option<Settings>> {
        Ok(None)
    }

    fn save(&self, _settings: &Settings) -> Result<()> {
        Err(Error::Io(std::io::Error::other("read-only store")))
    }

    fn location(&self) -> PathBuf {
        PathBuf::from("/nonexistent/settings.json")
    }
}

pub struct Harness {
    temp: TempDir,
    reload: CountingReload,
    pub switcher: ProfileSwitcher,
}

impl Harness {
    /// Empty registry, existing but empty live root.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let live = temp.path().join("vault/.obsidian");
        fs::create_dir_all(&live).unwrap();

        let reload = CountingReload::default();
        let registry = open_registry(temp.path());
        let switcher = ProfileSwitcher::new(registry, live, Box::new(reload.clone()));
        Self {
            temp,
            reload,
            switcher,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn live(&self) -> &Path {
        self.switcher.live_root()
    }

    pub fn storage(&self, name: &str) -> PathBuf {
        self.switcher.profile_storage(name)
    }

    pub fn reloads(&self) -> usize {
        self.reload.0.get()
    }

    /// A fresh registry read back from the settings document on disk.
    pub fn reopen(&self) -> ProfileRegistry {
        open_registry(self.temp.path())
    }
}

fn open_registry(root: &Path) -> ProfileRegistry {
    let store = JsonFileStore::new(root.join("settings.json"));
    ProfileRegistry::open(Box::new(store), &root.join("profiles")).unwrap()
}

/// Write `content` to `path` (creating parents) with mtime `secs` after the epoch.
pub fn write_at(path: &Path, content: &str, secs: u64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(stamp)
        .unwrap();
}
