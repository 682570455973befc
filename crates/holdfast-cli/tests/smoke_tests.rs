//! Smoke tests for the holdfast CLI
//!
//! These tests verify basic CLI functionality without launching a browser.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the holdfast binary
fn holdfast() -> Command {
    let mut cmd = Command::cargo_bin("holdfast").expect("holdfast binary should exist");
    for key in [
        "HOLDFAST_CONFIG",
        "HOLDFAST_TIMEOUT_SECONDS",
        "HOLDFAST_POLL_INTERVAL_MILLIS",
        "HOLDFAST_SETTLE_BUFFER_MILLIS",
        "TEST_BROWSER",
    ] {
        let _ = cmd.env_remove(key);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    holdfast()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    holdfast()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_shows_help() {
    holdfast().assert().failure(); // Requires a subcommand
}

#[test]
fn test_inspect_subcommand_help() {
    holdfast()
        .args(["inspect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--locator"))
        .stdout(predicate::str::contains("--probe"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_prints_defaults() {
    holdfast()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeoutSeconds: 10"))
        .stdout(predicate::str::contains("disabledClasses"));
}

#[test]
fn test_config_applies_environment() {
    holdfast()
        .arg("config")
        .env("HOLDFAST_TIMEOUT_SECONDS", "30")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeoutSeconds: 30"));
}

#[test]
fn test_config_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("holdfast.yaml");
    fs::write(&path, "timeoutSeconds: 9\nbrowser: chromium\n").unwrap();

    holdfast()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("timeoutSeconds: 9"))
        .stdout(predicate::str::contains("browser: chromium"));
}

#[test]
fn test_config_rejects_bad_environment() {
    holdfast()
        .arg("config")
        .env("HOLDFAST_TIMEOUT_SECONDS", "soon")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_config_env_browser_falls_back_to_chrome() {
    holdfast()
        .arg("config")
        .env("TEST_BROWSER", "firefox")
        .assert()
        .success()
        .stdout(predicate::str::contains("browser: chrome"));
}

#[test]
fn test_config_rejects_unsupported_file_browser() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("holdfast.yaml");
    fs::write(&path, "browser: netscape\n").unwrap();

    holdfast()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported browser"));
}

// ============================================================================
// Inspect Argument Validation
// ============================================================================

#[test]
fn test_inspect_requires_locator() {
    holdfast()
        .args(["inspect", "https://app.test"])
        .assert()
        .failure();
}

#[test]
fn test_inspect_rejects_malformed_locator() {
    holdfast()
        .args(["inspect", "https://app.test", "-l", "nonsense"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("Invalid argument")
                .or(predicate::str::contains("browser support")),
        );
}

#[test]
fn test_verbose_flag() {
    holdfast().args(["-v", "config"]).assert().success();
}

#[test]
fn test_quiet_flag() {
    holdfast().args(["-q", "config"]).assert().success();
}
