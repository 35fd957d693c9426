//! CLI integration tests for arbor
//!
//! Tests the arbor CLI commands end-to-end using assert_cmd.

use arbor_core::domain::taxonomy::{Topic, TopicRepository};
use arbor_core::infrastructure::taxonomy::SqliteTopicRepository;
use arbor_core::storage::{Database, DatabaseConfig};
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create a command with config and database isolated to a
/// temporary directory
fn arbor_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("arbor").unwrap();
    cmd.env("ARBOR_CONFIG_DIR", config_dir.path());
    cmd.env_remove("ARBOR_API_KEY");
    cmd.env_remove("OPENROUTER_API_KEY");
    cmd
}

#[test]
fn test_help_command() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Self-organizing hierarchical knowledge base",
        ));
}

#[test]
fn test_version_output() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("arbor"));
}

#[test]
fn test_config_path_uses_override_dir() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(dir.path().to_str().unwrap()));
}

#[test]
fn test_config_set_and_get_roundtrip() {
    let dir = TempDir::new().unwrap();

    arbor_cmd(&dir)
        .args(["config", "set", "llm.temperature", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set llm.temperature = 0.5"));

    arbor_cmd(&dir)
        .args(["config", "get", "llm.temperature"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.5"));
}

#[test]
fn test_config_get_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["config", "get", "no.such.key"])
        .assert()
        .failure();
}

#[test]
fn test_config_list_shows_defaults() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("llm.default_model"));
}

#[test]
fn test_topics_list_empty_database() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["topics", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No topics found"));
}

#[test]
fn test_topics_show_missing_topic_fails() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["topics", "show", "no-such-slug"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_tree_empty_database() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No topics found"));
}

#[test]
fn test_tree_json_empty_database() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["tree", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_stats_empty_database() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Topics: 0"));
}

#[test]
fn test_stats_json_output() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["stats", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_topics\""));
}

#[test]
fn test_resolve_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["resolve", "linear algebra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_resolve_known_slug_needs_no_api_key() {
    let dir = TempDir::new().unwrap();

    // Seed the store the CLI will open at its default location
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let db = Database::new(DatabaseConfig::with_path(dir.path().join("arbor.db")))
            .await
            .unwrap();
        let repo = SqliteTopicRepository::new(db.pool().clone());
        repo.insert_topic(&Topic::new("Plumbing")).await.unwrap();
        db.close().await;
    });

    // A repeat query resolves from the slug index alone
    arbor_cmd(&dir)
        .args(["resolve", "Plumbing", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plumbing"));
}

#[test]
fn test_generate_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["generate", "Plumbing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_doctor_reports_missing_api_key() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .args(["doctor"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("API Key: Not configured"));
}

#[test]
fn test_doctor_passes_with_api_key() {
    let dir = TempDir::new().unwrap();
    arbor_cmd(&dir)
        .env("ARBOR_API_KEY", "sk-test-key")
        .args(["doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database: Connected"))
        .stdout(predicate::str::contains("All checks passed"));
}
