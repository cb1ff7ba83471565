//! High-level command orchestration for the CLI.
//!
//! Each handler corresponds to a subcommand in `main.rs`. Handlers translate
//! user input into calls on [`ProfileSwitcher`] and render the outcome via
//! [`Ui`]; all filesystem work happens in the engine.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail};
use inquire::{Confirm, MultiSelect};
use std::path::Path;

use crate::doctor::run_doctor;
use crate::fileset::resolve;
use crate::host::{CommandReload, NoReload, ReloadSignal};
use crate::paths::Paths;
use crate::registry::{JsonFileStore, ProfileRegistry};
use crate::switch::{ProfileEdit, ProfileSwitcher, SwitchOutcome};
use crate::toggles::{ToggleKey, Toggles};
use crate::ui::Ui;

/// Shell command run after a switch or load so the host picks up new files
pub const RELOAD_CMD_ENV: &str = "VAULTPROF_RELOAD_CMD";

/// Open the registry and build a switcher for the configured paths.
pub fn open_switcher(paths: &Paths) -> Result<ProfileSwitcher> {
    paths.ensure_dirs()?;
    let store = JsonFileStore::new(&paths.settings_file);
    let registry = ProfileRegistry::open(Box::new(store), &paths.default_profiles_dir)
        .with_context(|| format!("Failed to load settings: {:?}", paths.settings_file))?;

    let reload: Box<dyn ReloadSignal> = match std::env::var(RELOAD_CMD_ENV) {
        Ok(cmd) if !cmd.trim().is_empty() => Box::new(CommandReload::new(cmd)),
        _ => Box::new(NoReload),
    };
    Ok(ProfileSwitcher::new(registry, paths.live_root.clone(), reload))
}

fn require_profile(switcher: &ProfileSwitcher, name: &str) -> Result<()> {
    if switcher.registry().find(name).is_none() {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'vaultprof list' to see available profiles.",
            name
        );
    }
    Ok(())
}

/// Resolve an optional profile argument, defaulting to the active profile.
fn name_or_active(switcher: &ProfileSwitcher, name: Option<String>) -> Result<String> {
    match name {
        Some(name) => Ok(name),
        None => switcher.registry().active_name().map(str::to_string).context(
            "No profile is active.\nHint: Pass a profile name or activate one with 'vaultprof use <name>'.",
        ),
    }
}

fn parse_toggles(names: &[String]) -> Result<Vec<ToggleKey>> {
    names
        .iter()
        .map(|n| {
            n.parse::<ToggleKey>().map_err(|_| {
                let valid: Vec<_> = ToggleKey::ALL.iter().map(|k| k.as_str()).collect();
                anyhow::anyhow!(
                    "Invalid toggle name: '{}'\nHint: Valid toggles are {}",
                    n,
                    valid.join(", ")
                )
            })
        })
        .collect()
}

fn enabled_list(toggles: &Toggles) -> String {
    let keys: Vec<_> = toggles.enabled().map(|k| k.as_str()).collect();
    if keys.is_empty() {
        String::from("-")
    } else {
        keys.join(",")
    }
}

fn reload_hint(ui: &Ui) {
    if std::env::var_os(RELOAD_CMD_ENV).is_none() {
        ui.println(ui.dim("Reload the application for the changes to take effect."));
    }
}

/// List all registered profiles
pub fn list(switcher: &ProfileSwitcher, ui: &Ui) -> Result<()> {
    let profiles = switcher.registry().profiles();

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Create one with:");
        ui.println(format!("  {} add <name> --toggles hotkeys,appearance", ui.bold("vaultprof")));
        return Ok(());
    }

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Toggles"),
        ui.header_cell("Auto-sync"),
        ui.header_cell("Status"),
    ]);

    for profile in profiles {
        let icon = if profile.active { ui.icon_ok() } else { " " };
        let status_cell = if profile.active {
            ui.colored_cell("active", AnsiColor::Green)
        } else {
            ui.cell("-")
        };

        table.add_row(vec![
            ui.cell(icon),
            ui.cell(&profile.name),
            ui.cell(enabled_list(&profile.toggles)),
            ui.cell(if profile.auto_sync { "on" } else { "off" }),
            status_cell,
        ]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());

    Ok(())
}

/// Show the active profile and where things live
pub fn current(switcher: &ProfileSwitcher, ui: &Ui) -> Result<()> {
    let registry = switcher.registry();
    let active = registry.get_active();

    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();
    if active.is_builtin_default() {
        table.add_row(vec![
            ui.cell("Active profile:"),
            ui.colored_cell(format!("{} (built-in)", active.name), AnsiColor::Yellow),
        ]);
    } else {
        table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(&active.name)]);
        table.add_row(vec![ui.cell("Toggles:"), ui.cell(enabled_list(&active.toggles))]);
        table.add_row(vec![
            ui.cell("Auto-sync:"),
            ui.cell(if active.auto_sync { "on" } else { "off" }),
        ]);
    }
    if let Some(updated) = &registry.settings().updated_at {
        table.add_row(vec![
            ui.cell("Last saved:"),
            ui.cell(updated.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }
    table.add_row(vec![
        ui.cell("Live root:"),
        ui.cell(switcher.live_root().display().to_string()),
    ]);
    table.add_row(vec![
        ui.cell("Profiles path:"),
        ui.cell(registry.profiles_path().display().to_string()),
    ]);

    ui.println(table.to_string());
    Ok(())
}

/// Show a profile's toggles and the stored files it governs
pub fn inspect(switcher: &ProfileSwitcher, name: &str, ui: &Ui) -> Result<()> {
    require_profile(switcher, name)?;
    let profile = switcher.registry().find(name).cloned().context("profile vanished")?;
    let storage = switcher.profile_storage(name);

    ui.section(format!("Profile: {}", name));
    ui.newline();

    let mut toggle_table = ui.simple_table();
    toggle_table.set_header(vec![ui.header_cell(""), ui.header_cell("Toggle"), ui.header_cell("Governs")]);
    for key in ToggleKey::ALL {
        toggle_table.add_row(vec![
            ui.toggle_cell(profile.toggles.get(key)),
            ui.cell(key.as_str()),
            ui.cell(key.display_name()),
        ]);
    }
    ui.println(toggle_table.to_string());
    ui.newline();

    ui.section("Stored Files");
    ui.newline();

    let files = resolve(&profile.toggles)
        .expand(&storage)
        .with_context(|| format!("Failed to read profile storage: {}", storage.display()))?;
    if files.is_empty() {
        ui.println(ui.dim("  (nothing governed)"));
        return Ok(());
    }

    let mut file_table = ui.simple_table();
    file_table.set_header(vec![ui.header_cell("File"), ui.header_cell("Size")]);
    for rel in files {
        let size_cell = match std::fs::metadata(storage.join(&rel)) {
            Ok(meta) if meta.is_file() => ui.cell(format_bytes(meta.len())),
            _ => ui.colored_cell("missing", AnsiColor::Red),
        };
        file_table.add_row(vec![ui.cell(rel.display().to_string()), size_cell]);
    }
    ui.println(file_table.to_string());

    if storage.is_dir() {
        let total = crate::fs_utils::dir_size(&storage)
            .with_context(|| format!("Failed to calculate size for {}", storage.display()))?;
        ui.newline();
        ui.println(format!("Storage: {} ({})", storage.display(), format_bytes(total)));
    }

    Ok(())
}

/// Format bytes as human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Interactive toggle selection, pre-selecting `current`
fn select_toggles(prompt: &str, current: &Toggles) -> Result<Toggles> {
    let options: Vec<&'static str> = ToggleKey::ALL.iter().map(|k| k.display_name()).collect();
    let defaults: Vec<usize> = ToggleKey::ALL
        .iter()
        .enumerate()
        .filter(|(_, k)| current.get(**k))
        .map(|(i, _)| i)
        .collect();

    let selected = MultiSelect::new(prompt, options.clone())
        .with_default(&defaults)
        .with_help_message("Space to select, Enter to confirm")
        .prompt()
        .context("Toggle selection cancelled")?;

    Ok(ToggleKey::ALL
        .iter()
        .zip(&options)
        .map(|(key, label)| (*key, selected.contains(label)))
        .collect())
}

/// Options for `add`
#[derive(Debug, Default)]
pub struct AddOptions {
    /// Profile to inherit toggles from (default: the active one)
    pub from: Option<String>,
    /// Explicit toggles; overrides `from`
    pub toggles: Option<Vec<String>>,
    /// Pick toggles interactively
    pub select: bool,
    pub auto_sync: bool,
}

/// Create a new profile seeded from the live configuration
pub fn add(switcher: &mut ProfileSwitcher, name: &str, opts: AddOptions, ui: &Ui) -> Result<()> {
    if switcher.registry().find(name).is_some() {
        bail!(
            "Profile '{}' already exists.\nHint: Use 'vaultprof edit {}' to modify it, or choose a different name.",
            name,
            name
        );
    }
    if let Some(base) = &opts.from {
        require_profile(switcher, base)?;
    }

    let report = if let Some(names) = &opts.toggles {
        let toggles = parse_toggles(names)?.into_iter().map(|k| (k, true)).collect();
        switcher.create_profile_with_toggles(name, toggles)?
    } else if opts.select {
        let base = match &opts.from {
            Some(base) => switcher.registry().find(base).map(|p| p.toggles.clone()).unwrap_or_default(),
            None => switcher.registry().get_active().toggles.clone(),
        };
        let toggles = select_toggles("Which settings should this profile manage?", &base)?;
        switcher.create_profile_with_toggles(name, toggles)?
    } else {
        switcher.create_profile(name, opts.from.as_deref())?
    };

    if opts.auto_sync {
        let edit = ProfileEdit {
            auto_sync: Some(true),
            ..Default::default()
        };
        switcher.edit_profile(name, &edit)?;
    }

    ui.ok(format!("Created profile '{}' ({})", name, ui.sync_summary(&report)));
    ui.sync_details(&report);
    ui.newline();

    let profile = switcher.registry().find(name).context("profile vanished")?;
    ui.println(format!("Managed settings: {}", enabled_list(&profile.toggles)));
    if profile.active {
        ui.println("It is now the active profile.");
    } else {
        ui.println("To activate it:");
        ui.println(format!("  vaultprof use {}", name));
    }

    Ok(())
}

/// Switch to a profile
pub fn use_profile(switcher: &mut ProfileSwitcher, name: &str, ui: &Ui) -> Result<()> {
    require_profile(switcher, name)?;

    let spinner = ui.spinner(format!("Switching to profile '{}'...", name));

    match switcher.switch_profile(name) {
        Ok(SwitchOutcome::AlreadyActive) => {
            ui.spinner_finish_ok(&spinner, format!("'{}' is already active", name));
            Ok(())
        }
        Ok(SwitchOutcome::Switched(report)) => {
            ui.spinner_finish_ok(
                &spinner,
                format!("Active profile: {} ({})", name, ui.sync_summary(&report)),
            );
            ui.sync_details(&report);
            reload_hint(ui);
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Failed to switch: {}", e));
            if let crate::error::Error::PerFileFailure(faults) = &e {
                for fault in faults {
                    ui.err(format!("{}: {}", fault.path.display(), fault.reason));
                }
            }
            Err(e.into())
        }
    }
}

/// Options for `edit`
#[derive(Debug, Default)]
pub struct EditOptions {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub auto_sync: Option<bool>,
}

/// Edit a profile's toggles; interactive when no change is given
pub fn edit(switcher: &mut ProfileSwitcher, name: &str, opts: EditOptions, ui: &Ui) -> Result<()> {
    require_profile(switcher, name)?;

    let mut edit = ProfileEdit {
        toggles: Vec::new(),
        auto_sync: opts.auto_sync,
    };
    edit.toggles.extend(parse_toggles(&opts.enable)?.into_iter().map(|k| (k, true)));
    edit.toggles.extend(parse_toggles(&opts.disable)?.into_iter().map(|k| (k, false)));

    if edit.is_empty() {
        let current = switcher
            .registry()
            .find(name)
            .map(|p| p.toggles.clone())
            .unwrap_or_default();
        let selected = select_toggles(
            "Which settings should this profile manage? Current ones are pre-selected.",
            &current,
        )?;
        edit.toggles = ToggleKey::ALL.iter().map(|k| (*k, selected.get(*k))).collect();
    }

    switcher.edit_profile(name, &edit)?;

    let profile = switcher.registry().find(name).context("profile vanished")?;
    ui.ok(format!("Updated profile '{}'", name));
    ui.println(format!("Now managing: {}", enabled_list(&profile.toggles)));
    ui.println(format!("Auto-sync: {}", if profile.auto_sync { "on" } else { "off" }));
    Ok(())
}

/// Remove a profile and its stored files
pub fn remove(switcher: &mut ProfileSwitcher, name: &str, yes: bool, ui: &Ui) -> Result<()> {
    require_profile(switcher, name)?;

    if !yes {
        let confirmed = Confirm::new(&format!("Remove profile '{}' and its stored files?", name))
            .with_default(false)
            .prompt()
            .context("Confirmation cancelled")?;
        if !confirmed {
            ui.info("Nothing removed.");
            return Ok(());
        }
    }

    let removal = switcher.remove_profile(name)?;
    ui.ok(format!(
        "Removed profile '{}' ({} stored file(s) deleted)",
        name, removal.files_removed
    ));
    if let Some(fallback) = removal.fallback {
        ui.info(format!("Switched to '{}'", fallback));
        reload_hint(ui);
    }
    Ok(())
}

/// Copy live files into a profile's storage
pub fn save(switcher: &mut ProfileSwitcher, name: Option<String>, ui: &Ui) -> Result<()> {
    let name = name_or_active(switcher, name)?;
    require_profile(switcher, &name)?;

    let report = switcher.save_profile(&name)?;
    ui.ok(format!("Saved '{}' ({})", name, ui.sync_summary(&report)));
    ui.sync_details(&report);
    Ok(())
}

/// Copy a profile's stored files over the live configuration
pub fn load(switcher: &mut ProfileSwitcher, name: Option<String>, ui: &Ui) -> Result<()> {
    let name = name_or_active(switcher, name)?;
    require_profile(switcher, &name)?;

    let report = switcher.load_profile(&name)?;
    ui.ok(format!("Loaded '{}' ({})", name, ui.sync_summary(&report)));
    ui.sync_details(&report);
    reload_hint(ui);
    Ok(())
}

/// Newest-wins sync of the active profile
pub fn sync(switcher: &mut ProfileSwitcher, ui: &Ui) -> Result<()> {
    let spinner = ui.spinner("Syncing active profile...");
    match switcher.sync_settings() {
        Ok(Some(report)) => {
            ui.spinner_finish_ok(&spinner, format!("Synced ({})", ui.sync_summary(&report)));
            ui.sync_details(&report);
            Ok(())
        }
        Ok(None) => {
            ui.spinner_finish_ok(&spinner, "Auto-sync is off for the active profile, nothing to do");
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Sync failed: {}", e));
            Err(e.into())
        }
    }
}

/// Move profile storage to a new directory
pub fn relocate(switcher: &mut ProfileSwitcher, new_path: &Path, ui: &Ui) -> Result<()> {
    let new_path = std::path::absolute(new_path)
        .with_context(|| format!("Failed to resolve path: {:?}", new_path))?;
    let old_path = switcher.registry().profiles_path().to_path_buf();

    let moved = switcher.relocate_profiles(&new_path)?;
    ui.ok(format!(
        "Moved {} file(s) from {} to {}",
        moved,
        old_path.display(),
        new_path.display()
    ));
    Ok(())
}

/// Rebuild the profile list from stored profile documents
pub fn rescan(switcher: &mut ProfileSwitcher, ui: &Ui) -> Result<()> {
    let found = switcher.rescan()?;
    ui.ok(format!(
        "Found {} profile(s) in {}",
        found,
        switcher.registry().profiles_path().display()
    ));
    Ok(())
}

/// Run diagnostics
pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    run_doctor(paths, ui);
    Ok(())
}
