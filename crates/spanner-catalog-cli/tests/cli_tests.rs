//! CLI integration tests for spanner-catalog.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions that need no live database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the spanner-catalog binary.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("spanner-catalog").unwrap();
    cmd.env_remove("SPANNER_EMULATOR_HOST");
    cmd
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tables"))
        .stdout(predicate::str::contains("describe"))
        .stdout(predicate::str::contains("rows"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("spanner-catalog"));
}

#[test]
fn test_describe_requires_table() {
    cmd()
        .arg("describe")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<TABLE>"));
}

#[test]
fn test_rows_subcommand_help() {
    cmd()
        .args(["rows", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Read all rows"));
}

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test the database connection"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_and_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: warn]"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error, not a config error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "tables"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let file = config_file("invalid: yaml: content: [\n");
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "tables"])
        .assert()
        .code(1);
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let file = config_file("");
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_bad_database_path_exits_with_code_1() {
    let file = config_file("connection:\n  database: my-database\n");
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "tables"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("projects/<p>/instances/<i>/databases/<d>"));
}

#[test]
fn test_unknown_driver_exits_with_code_1() {
    let file = config_file(
        "driver: bigtable\nconnection:\n  database: projects/p/instances/i/databases/d\n",
    );
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "tables"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown driver: bigtable"));
}

#[test]
fn test_missing_credentials_exits_with_code_2() {
    let file = config_file(
        "connection:\n  database: projects/p/instances/i/databases/d\n  access_token_env: SPANNER_CATALOG_TEST_UNSET_TOKEN\n",
    );
    cmd()
        .env_remove("SPANNER_CATALOG_TEST_UNSET_TOKEN")
        .args(["--config", file.path().to_str().unwrap(), "describe", "Singers"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no access token"));
}
