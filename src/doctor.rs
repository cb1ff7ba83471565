//! Diagnostic tool for vaultprof.
//!
//! Implements `vaultprof doctor`. Each step prints its findings and flags
//! issues, but nothing is repaired:
//! - required directories and the live root
//! - the settings document and the active profile
//! - per-profile storage and `profile.json` documents
//! - environment overrides

use anstyle::AnsiColor;
use std::env;

use crate::commands::RELOAD_CMD_ENV;
use crate::paths::{HOME_ENV, Paths};
use crate::profiles::{PROFILE_DOCUMENT, read_document};
use crate::registry::{JsonFileStore, Settings, SettingsStore};
use crate::ui::Ui;

/// Run the doctor diagnostics
pub fn run_doctor(paths: &Paths, ui: &Ui) {
    ui.section("vaultprof Doctor");
    ui.newline();

    let store = JsonFileStore::new(&paths.settings_file);
    let settings = match store.load() {
        Ok(settings) => Some(settings.map(|mut s| {
            if s.profiles_path.as_os_str().is_empty() {
                s.profiles_path = paths.default_profiles_dir.clone();
            }
            s
        })),
        Err(e) => {
            tracing::debug!("settings unreadable: {e}");
            None
        }
    };

    // 1. Directories
    check_step(ui, "Directories", || {
        let mut ok = true;
        if paths.base_dir.is_dir() {
            ui.println(format!("  {} Base directory exists: {}", ui.icon_ok(), paths.base_dir.display()));
        } else {
            ui.println(format!(
                "  {} Base directory missing: {} (created on first use)",
                ui.icon_warn(),
                paths.base_dir.display()
            ));
        }

        if paths.live_root.is_dir() {
            ui.println(format!("  {} Live root exists: {}", ui.icon_ok(), paths.live_root.display()));
        } else {
            ui.println(format!(
                "  {} Live root missing: {}",
                ui.icon_err(),
                paths.live_root.display()
            ));
            ok = false;
        }

        let profiles_path = settings
            .as_ref()
            .and_then(|s| s.as_ref())
            .map(|s| s.profiles_path.clone())
            .unwrap_or_else(|| paths.default_profiles_dir.clone());
        if profiles_path.is_dir() {
            ui.println(format!("  {} Profiles directory: {}", ui.icon_ok(), profiles_path.display()));
        } else {
            ui.println(format!(
                "  {} Profiles directory missing: {}",
                ui.icon_warn(),
                profiles_path.display()
            ));
        }
        ok
    });

    // 2. Settings document
    check_step(ui, "Settings", || match &settings {
        None => {
            ui.println(format!(
                "  {} Settings file corrupt: {}",
                ui.icon_err(),
                paths.settings_file.display()
            ));
            false
        }
        Some(None) => {
            ui.println(format!("  {} Settings file missing (fresh install?)", ui.icon_warn()));
            true
        }
        Some(Some(settings)) => {
            ui.println(format!("  {} Settings file readable", ui.icon_ok()));
            check_active(ui, settings)
        }
    });

    // 3. Profiles
    check_step(ui, "Profiles", || {
        let Some(Some(settings)) = &settings else {
            ui.println(format!("  {} No profiles registered", ui.icon_info()));
            return true;
        };
        if settings.profiles.is_empty() {
            ui.println(format!("  {} No profiles registered", ui.icon_warn()));
            return true;
        }

        ui.println(format!("  Found {} profiles:", settings.profiles.len()));
        let mut all_valid = true;
        for profile in &settings.profiles {
            let dir = crate::profiles::profile_dir(&settings.profiles_path, &profile.name);
            if !dir.is_dir() {
                ui.println(format!("    {} {} (storage missing)", ui.icon_err(), profile.name));
                all_valid = false;
                continue;
            }
            match read_document(&dir) {
                Ok(doc) if doc.name == profile.name => {
                    ui.println(format!("    {} {}", ui.icon_ok(), profile.name));
                }
                Ok(doc) => {
                    ui.println(format!(
                        "    {} {} ({} names '{}')",
                        ui.icon_warn(),
                        profile.name,
                        PROFILE_DOCUMENT,
                        doc.name
                    ));
                }
                Err(e) => {
                    ui.println(format!(
                        "    {} {} (unreadable {}: {})",
                        ui.icon_warn(),
                        profile.name,
                        PROFILE_DOCUMENT,
                        e
                    ));
                }
            }
        }
        all_valid
    });

    // 4. Environment
    check_step(ui, "Environment", || {
        match env::var(HOME_ENV) {
            Ok(v) => ui.println(format!("  {} {} set to: {}", ui.icon_info(), HOME_ENV, v)),
            Err(_) => ui.println(format!("  {} {} not set (using ~/.vaultprof)", ui.icon_info(), HOME_ENV)),
        }
        match env::var(RELOAD_CMD_ENV) {
            Ok(cmd) => ui.println(format!("  {} Reload command: {}", ui.icon_ok(), cmd)),
            Err(_) => ui.println(format!(
                "  {} {} not set (reload the application manually after switching)",
                ui.icon_info(),
                RELOAD_CMD_ENV
            )),
        }
        true
    });
}

fn check_active(ui: &Ui, settings: &Settings) -> bool {
    if settings.active_profile_name.is_empty() {
        ui.println(format!("  {} No active profile set", ui.icon_info()));
        return true;
    }
    ui.println(format!(
        "  {} Active profile: {}",
        ui.icon_info(),
        settings.active_profile_name
    ));
    if settings.profiles.iter().any(|p| p.name == settings.active_profile_name) {
        true
    } else {
        ui.println(format!("  {} Active profile is not registered", ui.icon_err()));
        false
    }
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F)
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    if !check_fn() {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
}
