//! CLI Integration Tests for quorum-server
//!
//! Runs the built binary against scaffolded configurations in temporary
//! directories.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run quorum-server with arguments inside `dir`
fn run_quorum(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_quorum-server"))
        .args(args)
        .arg("--no-color")
        .current_dir(dir)
        .env_remove("QUORUM_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute quorum-server")
}

fn scaffold_minimal() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_quorum(&["init", "--minimal"], dir.path());
    assert!(output.status.success(), "init failed: {:?}", output);
    dir
}

// =============================================================================
// Help and Version
// =============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let output = run_quorum(&["--help"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["serve", "ask", "providers", "config", "init"] {
        assert!(stdout.contains(command), "missing '{}' in help", command);
    }
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    let output = run_quorum(&["--version"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Init
// =============================================================================

#[test]
fn test_init_minimal_creates_config() {
    let dir = scaffold_minimal();

    let content = fs::read_to_string(dir.path().join("quorum.toml")).unwrap();
    assert!(content.contains("[providers.scripted-primary]"));
    assert!(!dir.path().join(".env.example").exists());
}

#[test]
fn test_init_full_creates_env_example() {
    let dir = TempDir::new().unwrap();
    let output = run_quorum(&["init"], dir.path());

    assert!(output.status.success());
    let env_example = fs::read_to_string(dir.path().join(".env.example")).unwrap();
    assert!(env_example.contains("ANTHROPIC_API_KEY="));
}

#[test]
fn test_init_does_not_overwrite() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("quorum.toml"), "# mine\n").unwrap();

    let output = run_quorum(&["init", "--minimal"], dir.path());

    assert!(output.status.success());
    let content = fs::read_to_string(dir.path().join("quorum.toml")).unwrap();
    assert_eq!(content, "# mine\n");
}

// =============================================================================
// Commands over a configuration
// =============================================================================

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_quorum(&["providers"], dir.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_config_validate() {
    let dir = scaffold_minimal();
    let output = run_quorum(&["config", "--validate"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration is valid"));
    assert!(stdout.contains("scripted-backup"));
}

#[test]
fn test_providers_lists_scripted_providers() {
    let dir = scaffold_minimal();
    let output = run_quorum(&["providers"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("scripted-primary"));
    assert!(stdout.contains("static"));
}

#[test]
fn test_providers_check_reports_connectivity() {
    let dir = scaffold_minimal();
    let output = run_quorum(&["providers", "--check"], dir.path());

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Connectivity"));
    assert!(stdout.contains("SUCCESS"));
    assert!(stdout.contains("2 of 2 providers reachable"));
}

#[test]
fn test_ask_prints_json() {
    let dir = scaffold_minimal();
    let output = run_quorum(
        &["ask", "Why is the sky blue?", "-c", "reasoning", "--json"],
        dir.path(),
    );

    assert!(output.status.success(), "{:?}", output);
    let body: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(body["content"], "Reasoning: Why is the sky blue?");
    assert_eq!(body["contributingProviders"][0], "scripted-primary");
    assert_eq!(body["fallbackUsed"], false);
}

#[test]
fn test_ask_rejects_unknown_capability() {
    let dir = scaffold_minimal();
    let output = run_quorum(&["ask", "q", "-c", "astrology"], dir.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("astrology"));
}
