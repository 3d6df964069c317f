//! Integration tests for CLI argument handling
//!
//! Runs the binary with a clean environment so only the flags given here apply.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Helper to run the CLI with given args from `dir` and capture output
fn run_cli_in(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_vendordash"))
        .args(args)
        .current_dir(dir)
        .env_remove("VENDORDASH_API_URL")
        .env_remove("VENDORDASH_API_KEY")
        .env_remove("VENDORDASH_VENDOR_ID")
        .env_remove("VENDORDASH_CACHE_DIR")
        .env_remove("VENDORDASH_NAMESPACE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute vendordash")
}

fn run_cli(args: &[&str]) -> std::process::Output {
    let dir = TempDir::new().unwrap();
    run_cli_in(dir.path(), args)
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("vendordash"), "Help should mention vendordash");
    assert!(stdout.contains("packages"), "Help should list the packages command");
    assert!(stdout.contains("availability"), "Help should list the availability command");
}

#[test]
fn test_missing_backend_settings_prints_error() {
    let output = run_cli(&["packages", "list"]);
    assert!(!output.status.success(), "Expected missing settings to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("VENDORDASH_API_URL"),
        "Should say which setting is missing: {}",
        stderr
    );
}

#[test]
fn test_non_http_api_url_rejected() {
    let output = run_cli(&[
        "dashboard",
        "--api-url",
        "ftp://example.test",
        "--api-key",
        "k",
        "--vendor-id",
        "v1",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid API URL"), "Unexpected error: {}", stderr);
}

#[test]
fn test_invalid_date_prints_error_and_exits() {
    let output = run_cli(&["availability", "block", "next-friday"]);
    assert!(!output.status.success(), "Expected invalid date to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid date"), "Unexpected error: {}", stderr);
}

#[test]
fn test_invalid_price_prints_error_and_exits() {
    let output = run_cli(&["packages", "add", "--name", "Gold", "--price", "lots"]);
    assert!(!output.status.success(), "Expected invalid price to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid price"), "Unexpected error: {}", stderr);
}

#[test]
fn test_cache_clear_works_offline() {
    let workdir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let cached = cache_dir.path().join("vendordash_cache_packages.json");
    let foreign = cache_dir.path().join("other_app_settings.json");
    fs::write(&cached, r#"{"data":[],"timestamp":0,"ttl":60000}"#).unwrap();
    fs::write(&foreign, "{}").unwrap();

    let dir_arg = cache_dir.path().to_string_lossy().to_string();
    let output = run_cli_in(workdir.path(), &["cache", "clear", "--cache-dir", &dir_arg]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cleared all cached entries"));
    assert!(!cached.exists(), "Namespaced entry should be removed");
    assert!(foreign.exists(), "Entries outside the namespace must survive");
}

#[test]
fn test_cache_clear_with_pattern() {
    let workdir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let packages = cache_dir.path().join("vendordash_cache_packages.json");
    let dashboard = cache_dir.path().join("vendordash_cache_dashboard.json");
    fs::write(&packages, "{}").unwrap();
    fs::write(&dashboard, "{}").unwrap();

    let dir_arg = cache_dir.path().to_string_lossy().to_string();
    let output = run_cli_in(
        workdir.path(),
        &["cache", "clear", "pack", "--cache-dir", &dir_arg],
    );

    assert!(output.status.success());
    assert!(!packages.exists());
    assert!(dashboard.exists());
}
