//! End-to-end tests driving the `vaultprof` binary against a temporary vault.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Env {
    temp: TempDir,
}

impl Env {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("vault/.obsidian")).unwrap();
        Self { temp }
    }

    fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    fn live(&self) -> PathBuf {
        self.temp.path().join("vault/.obsidian")
    }

    fn storage(&self, name: &str) -> PathBuf {
        self.home().join("profiles").join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("vaultprof").unwrap();
        cmd.env("VAULTPROF_HOME", self.home())
            .env("VAULTPROF_LIVE_ROOT", self.live())
            .env("NO_COLOR", "1")
            .env_remove("VAULTPROF_RELOAD_CMD")
            .env_remove("VAULTPROF_LOG")
            .env_remove("RUST_LOG");
        cmd
    }

    fn write_live(&self, rel: &str, content: &str) {
        write(&self.live().join(rel), content);
    }

    fn read_live(&self, rel: &str) -> String {
        fs::read_to_string(self.live().join(rel)).unwrap()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn list_without_profiles() {
    let env = Env::new();
    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles found"));
}

#[test]
fn add_seeds_storage_and_becomes_active() {
    let env = Env::new();
    env.write_live("hotkeys.json", r#"{"a":1}"#);
    env.write_live("app.json", "{}");

    env.cmd()
        .args(["add", "work", "--toggles", "hotkeys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created profile 'work'"))
        .stdout(predicate::str::contains("now the active profile"));

    assert!(env.storage("work").join("hotkeys.json").is_file());
    assert!(!env.storage("work").join("app.json").exists());
    assert!(env.storage("work").join("profile.json").is_file());

    env.cmd()
        .arg("current")
        .assert()
        .success()
        .stdout(predicate::str::contains("work"));
}

#[test]
fn add_rejects_duplicates_and_bad_names() {
    let env = Env::new();
    env.cmd().args(["add", "work", "--toggles", "hotkeys"]).assert().success();

    env.cmd()
        .args(["add", "work", "--toggles", "hotkeys"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    env.cmd()
        .args(["add", "bad/name", "--toggles", "hotkeys"])
        .assert()
        .failure();

    env.cmd()
        .args(["add", "other", "--toggles", "nonsense"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid toggle name"));
}

#[test]
fn use_switches_live_files() {
    let env = Env::new();
    env.write_live("hotkeys.json", "first");
    env.cmd().args(["add", "first", "--toggles", "hotkeys"]).assert().success();

    env.write_live("hotkeys.json", "second");
    env.cmd().args(["add", "second", "--from", "first"]).assert().success();

    env.cmd()
        .args(["use", "first"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already active"));
    assert_eq!(env.read_live("hotkeys.json"), "second");

    env.cmd()
        .args(["use", "second"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Active profile: second"));
    assert_eq!(env.read_live("hotkeys.json"), "second");

    env.cmd().args(["use", "first"]).assert().success();
    assert_eq!(env.read_live("hotkeys.json"), "first");

    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("first"))
        .stdout(predicate::str::contains("active"));
}

#[test]
fn live_root_with_trailing_separator() {
    let env = Env::new();
    env.write_live("hotkeys.json", "{}");
    let live = format!("{}{}", env.live().display(), std::path::MAIN_SEPARATOR);

    env.cmd()
        .arg("--live-root")
        .arg(&live)
        .args(["add", "work", "--toggles", "hotkeys"])
        .assert()
        .success();
    assert!(env.storage("work").join("hotkeys.json").is_file());
}

#[test]
fn use_unknown_profile_fails() {
    let env = Env::new();
    env.cmd()
        .args(["use", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn remove_active_falls_back() {
    let env = Env::new();
    env.cmd().args(["add", "a", "--toggles", "hotkeys"]).assert().success();
    env.cmd().args(["add", "b", "--toggles", "hotkeys"]).assert().success();

    env.cmd()
        .args(["remove", "a", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed profile 'a'"))
        .stdout(predicate::str::contains("Switched to 'b'"));

    assert!(!env.storage("a").exists());
    env.cmd()
        .arg("current")
        .assert()
        .success()
        .stdout(predicate::str::contains("b"));
}

#[test]
fn edit_toggles_non_interactively() {
    let env = Env::new();
    env.cmd().args(["add", "work", "--toggles", "hotkeys"]).assert().success();

    env.cmd()
        .args(["edit", "work", "--enable", "graph", "--disable", "hotkeys", "--auto-sync", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Now managing: graph"))
        .stdout(predicate::str::contains("Auto-sync: on"));
}

#[test]
fn save_and_load_default_to_active() {
    let env = Env::new();
    env.write_live("graph.json", "v1");
    env.cmd().args(["add", "work", "--toggles", "graph"]).assert().success();

    env.write_live("graph.json", "v2");
    env.cmd().arg("save").assert().success();
    assert_eq!(fs::read_to_string(env.storage("work").join("graph.json")).unwrap(), "v2");

    write(&env.storage("work").join("graph.json"), "v3");
    env.cmd().arg("load").assert().success();
    assert_eq!(env.read_live("graph.json"), "v3");
}

#[test]
fn sync_is_noop_without_auto_sync() {
    let env = Env::new();
    env.cmd().args(["add", "work", "--toggles", "graph"]).assert().success();
    env.cmd()
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-sync is off"));
}

#[test]
fn relocate_moves_storage() {
    let env = Env::new();
    env.write_live("hotkeys.json", "{}");
    env.cmd().args(["add", "work", "--toggles", "hotkeys"]).assert().success();

    let new_dir = env.temp.path().join("moved");
    env.cmd().arg("relocate").arg(&new_dir).assert().success();

    assert!(new_dir.join("work/hotkeys.json").is_file());
    assert!(!env.storage("work").exists());
}

#[test]
fn rescan_finds_profile_documents() {
    let env = Env::new();
    env.cmd().args(["add", "work", "--toggles", "hotkeys"]).assert().success();
    fs::remove_file(env.home().join("settings.json")).unwrap();

    env.cmd()
        .arg("rescan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 profile(s)"));
    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("work"));
}

#[test]
fn doctor_reports_missing_live_root() {
    let env = Env::new();
    fs::remove_dir_all(env.live()).unwrap();
    env.cmd()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Live root missing"));
}

#[test]
fn completions_generate() {
    let env = Env::new();
    env.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vaultprof"));
}
