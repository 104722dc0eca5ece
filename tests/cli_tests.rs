//! CLI integration tests using assert_cmd.
//!
//! None of these need a database: they cover help output, argument
//! validation, and the configuration gate that must refuse to start the
//! system on a broken config file.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[allow(deprecated)]
fn adventide() -> Command {
    Command::cargo_bin("adventide").unwrap()
}

// --- Help and arg validation ---

#[test]
fn help_shows_all_subcommands() {
    adventide().arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("migrate"))
            .and(predicate::str::contains("seed"))
            .and(predicate::str::contains("check-config")),
    );
}

#[test]
fn help_serve_shows_args() {
    adventide()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--host").and(predicate::str::contains("--port")));
}

#[test]
fn migrate_without_database_url_fails() {
    adventide()
        .arg("migrate")
        .env_remove("DATABASE_URL")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL is required"));
}

// --- Configuration gate ---

#[test]
fn check_config_fails_on_missing_file() {
    adventide()
        .args(["--config", "/nonexistent/adventide.toml", "check-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

#[test]
fn check_config_accepts_the_example_config() {
    adventide()
        .args(["--config", "adventide.example.toml", "check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: season 2025-12-15..2026-01-14 (31 days)"));
}

#[test]
fn check_config_rejects_an_inverted_season() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [season]
        start = "2025-12-15"
        end = "2025-12-01"
        days = 24

        [points]
        free_cap = 1015
        paid_cap = 1001
        global_cap = 2026

        [uploads]
        allowed_extensions = ["png"]

        [[rewards.personal]]
        key = "small"
        name = "Small prize"
        threshold = 555
        "#
    )
    .unwrap();
    adventide()
        .args(["--config", file.path().to_str().unwrap(), "check-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("before season.start"));
}
