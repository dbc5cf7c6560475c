//! End-to-end tests for the `catalog-sync` binary.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MENU: &str = r#"{
    "category": [{"name": "Drinks"}, {"name": "Snacks"}],
    "item": [
        {"name": "Cola", "category": "Drinks"},
        {"name": "Chips", "category": "Snacks"}
    ]
}"#;

/// A command isolated from the caller's home directory and environment.
fn cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("catalog-sync").unwrap();
    cmd.env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("CATALOG_SYNC_DB")
        .env_remove("CATALOG_SYNC_SOURCE")
        .env_remove("CATALOG_SYNC_FILE")
        .env_remove("CATALOG_SYNC_WORK_DIR")
        .env_remove("CATALOG_SYNC_MATCH")
        .env_remove("CATALOG_SYNC_USER")
        .env_remove("CATALOG_SYNC_PASSWORD");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn write_menu(dir: &Path, body: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("Menu.json");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn version_reports_package_version() {
    let home = TempDir::new().unwrap();
    let out = json_stdout(cmd(home.path()).args(["version", "--json"]));
    assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn status_before_init_is_not_initialized() {
    let home = TempDir::new().unwrap();
    let output = cmd(home.path())
        .args(["status", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("NOT_INITIALIZED"));
}

#[test]
fn init_reconcile_then_inspect() {
    let home = TempDir::new().unwrap();
    json_stdout(cmd(home.path()).args(["init", "--json"]));
    assert!(home.path().join(".catalog-sync/data/catalog.db").exists());
    assert!(home.path().join(".catalog-sync/config.json").exists());

    let menu = write_menu(&home.path().join("menus"), MENU);
    let summary = json_stdout(
        cmd(home.path())
            .arg("reconcile")
            .arg(&menu)
            .arg("--json"),
    );
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["report"]["categories"]["stats"]["created"], 2);
    assert_eq!(summary["report"]["category_items"]["stats"]["created"], 2);

    let catalog = json_stdout(cmd(home.path()).args(["catalog", "--json"]));
    assert_eq!(catalog[0]["name"], "Drinks");
    assert_eq!(catalog[0]["items"][0], "Cola");
    assert_eq!(catalog[1]["name"], "Snacks");

    // Move Chips under Drinks.
    write_menu(
        &home.path().join("menus"),
        r#"{"category": [{"name": "Drinks"}],
            "item": [{"name": "Cola", "category": "Drinks"},
                     {"name": "Chips", "category": "Drinks"}]}"#,
    );
    let summary = json_stdout(cmd(home.path()).arg("reconcile").arg(&menu).arg("--json"));
    assert_eq!(summary["report"]["pruned"]["stats"]["deleted"], 1);

    let status = json_stdout(cmd(home.path()).args(["status", "--json"]));
    assert_eq!(status["counts"]["categories"], 2);
    assert_eq!(status["counts"]["category_items"], 2);
    assert_eq!(status["runs"].as_array().unwrap().len(), 2);
    assert_eq!(status["runs"][0]["status"], "completed");
}

#[test]
fn import_from_local_source() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("catalog.db");
    let upstream = home.path().join("upstream");
    write_menu(&upstream, MENU);

    json_stdout(cmd(home.path()).arg("--db").arg(&db).args(["init", "--json"]));

    let summary = json_stdout(
        cmd(home.path())
            .arg("--db")
            .arg(&db)
            .arg("import")
            .arg("--source")
            .arg(&upstream)
            .arg("--work-dir")
            .arg(home.path().join("downloads"))
            .arg("--json"),
    );
    assert_eq!(summary["status"], "completed");
    assert!(home.path().join("downloads/Menu.json").exists());

    // Same snapshot again, straight from the work dir.
    let summary = json_stdout(
        cmd(home.path())
            .arg("--db")
            .arg(&db)
            .args(["import", "--skip-fetch", "--work-dir"])
            .arg(home.path().join("downloads"))
            .arg("--json"),
    );
    assert_eq!(summary["report"]["categories"]["stats"]["skipped"], 2);
    assert_eq!(summary["report"]["pruned"]["stats"]["deleted"], 0);
}

#[test]
fn import_without_source_is_config_error() {
    let home = TempDir::new().unwrap();
    json_stdout(cmd(home.path()).args(["init", "--json"]));

    let output = cmd(home.path())
        .args(["import", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn missing_source_file_is_transfer_error() {
    let home = TempDir::new().unwrap();
    json_stdout(cmd(home.path()).args(["init", "--json"]));

    let output = cmd(home.path())
        .arg("import")
        .arg("--source")
        .arg(home.path().join("empty"))
        .arg("--json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(String::from_utf8_lossy(&output.stderr).contains("TRANSFER_ERROR"));

    let status = json_stdout(cmd(home.path()).args(["status", "--json"]));
    assert_eq!(status["runs"][0]["status"], "failed");
}

#[test]
fn unknown_match_policy_is_rejected() {
    let home = TempDir::new().unwrap();
    json_stdout(cmd(home.path()).args(["init", "--json"]));
    let menu = write_menu(&home.path().join("menus"), MENU);

    let output = cmd(home.path())
        .arg("reconcile")
        .arg(&menu)
        .args(["--match-policy", "fuzzy", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INVALID_ARGUMENT"));
}

#[test]
fn malformed_snapshot_exits_with_input_error() {
    let home = TempDir::new().unwrap();
    json_stdout(cmd(home.path()).args(["init", "--json"]));
    let menu = write_menu(&home.path().join("menus"), "{\"category\": 5}");

    let output = cmd(home.path())
        .arg("reconcile")
        .arg(&menu)
        .arg("--json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("SNAPSHOT_ERROR"));
}
