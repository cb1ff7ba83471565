use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Overrides the base directory (default `~/.vaultprof`)
pub const HOME_ENV: &str = "VAULTPROF_HOME";

/// All computed paths used by vaultprof
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~/.vaultprof
    pub base_dir: PathBuf,
    /// ~/.vaultprof/settings.json
    pub settings_file: PathBuf,
    /// ~/.vaultprof/profiles, used until the settings name another location
    pub default_profiles_dir: PathBuf,
    /// The vault configuration directory profiles are applied to
    pub live_root: PathBuf,
}

impl Paths {
    pub fn new(live_root: &Path) -> Result<Self> {
        let base_dir = match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
                base_dirs.home_dir().join(".vaultprof")
            }
        };

        let live_root = std::path::absolute(live_root)
            .with_context(|| format!("Failed to resolve live root: {:?}", live_root))?;

        Ok(Self::with_base(base_dir, live_root))
    }

    /// Lay out every path under an explicit base directory.
    pub fn with_base(base_dir: PathBuf, live_root: PathBuf) -> Self {
        Self {
            settings_file: base_dir.join("settings.json"),
            default_profiles_dir: base_dir.join("profiles"),
            base_dir,
            live_root,
        }
    }

    /// Ensure the base directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create base directory: {:?}", self.base_dir)
        })
    }
}
