use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn constellation() -> Command {
    let mut cmd = Command::cargo_bin("constellation").expect("binary built");
    cmd.env_remove("CONSTELLATION_CONTROL_PLANE")
        .env_remove("CONSTELLATION_ENV_TOKEN")
        .env_remove("CONSTELLATION_BUNDLE_PATH");
    cmd
}

#[test]
fn check_lists_catalog_functions() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("catalog.toml");
    fs::write(
        &bundle,
        r#"
[[application]]
identifier = "com.example.shop"
version = "v1"

[[application.runnable]]
name = "checkout"

[[application.runnable]]
name = "refund"
namespace = "payments"
"#,
    )
    .unwrap();
    let config = dir.path().join("constellation.toml");
    fs::write(&config, format!("bundle_path = {:?}\n", bundle.display().to_string())).unwrap();

    constellation()
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.shop@v1"))
        .stdout(predicate::str::contains("com.example.shop#default::checkout@v1"))
        .stdout(predicate::str::contains("com.example.shop#payments::refund@v1"));
}

#[test]
fn check_fails_on_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("constellation.toml");
    fs::write(&config, "[bootstrap]\nretry_interval_ms = 0\n").unwrap();

    constellation()
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bootstrap.retry_interval_ms"));
}

#[test]
fn run_rejects_empty_control_plane() {
    let dir = tempfile::tempdir().unwrap();

    constellation()
        .args(["run", "--config"])
        .arg(dir.path().join("absent.toml"))
        .args(["--control-plane", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("control_plane"));
}
