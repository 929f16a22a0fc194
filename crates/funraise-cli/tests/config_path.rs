use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("funraise")
        .env("FUNRAISE_HOME", dir.path())
        .env_remove("FUNRAISE_CONFIG")
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("funraise")
        .env("FUNRAISE_HOME", dir.path())
        .env_remove("FUNRAISE_CONFIG")
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("on_focus = \"rekey\""));
    assert!(contents.contains("debounce_ms = 300"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    cargo_bin_cmd!("funraise")
        .env("FUNRAISE_HOME", dir.path())
        .env_remove("FUNRAISE_CONFIG")
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_focus_updates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[search]\ndebounce_ms = 120\n").unwrap();

    cargo_bin_cmd!("funraise")
        .env("FUNRAISE_HOME", dir.path())
        .env_remove("FUNRAISE_CONFIG")
        .args(["config", "set-focus", "SWEEP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("refresh.on_focus = \"sweep\""));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("on_focus = \"sweep\""));
    assert!(contents.contains("debounce_ms = 120"));
}

#[test]
fn test_verbose_logs_config_commands() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("funraise")
        .env("FUNRAISE_HOME", dir.path())
        .env_remove("FUNRAISE_CONFIG")
        .env_remove("RUST_LOG")
        .args(["--verbose", "config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"))
        .stderr(predicate::str::contains("config written"));
}

#[test]
fn test_config_set_focus_rejects_unknown_policy() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("funraise")
        .env("FUNRAISE_HOME", dir.path())
        .env_remove("FUNRAISE_CONFIG")
        .args(["config", "set-focus", "reload"])
        .assert()
        .failure();

    assert!(!dir.path().join("config.toml").exists());
}

#[test]
fn test_explicit_config_flag_wins() {
    let dir = tempdir().unwrap();
    let custom = dir.path().join("custom.toml");

    cargo_bin_cmd!("funraise")
        .env("FUNRAISE_HOME", dir.path())
        .args(["config", "path", "--config"])
        .arg(&custom)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_broken_config_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "[search]\ndebounce_ms = \"soon\"\n").unwrap();

    cargo_bin_cmd!("funraise")
        .env("FUNRAISE_HOME", dir.path())
        .env_remove("FUNRAISE_CONFIG")
        .args(["refresh", "--consumer", "events"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}
