//! Integration tests for CLI functionality
//!
//! These tests verify that task files, configuration discovery and the
//! orchestrator work together. Unit tests for individual functions are
//! located in the respective module files.

use corch::cli::{Args, ConfigDiscovery, ExecutionMode, TaskFileError, TaskLoader};
use corch::{TaskOrchestrator, TaskStatus, WorkerId};
use clap::Parser;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const BACKLOG_TOML: &str = r#"
[[tasks]]
id = "issue-1"
priority = 1
resource_keys = ["src/main.rs"]

[tasks.metadata]
description = "Crash on empty input"
issue_number = 1
branch_name = "fix/empty-input"
estimated_duration_minutes = 30

[[tasks]]
id = "issue-2"
priority = 1
dependencies = ["issue-1"]

[[tasks]]
id = "pr-3"
kind = "pr"
priority = 3
resource_keys = ["src/main.rs"]
"#;

/// Restores the working directory when dropped
struct CwdGuard(std::path::PathBuf);

impl CwdGuard {
    fn enter(dir: &std::path::Path) -> Self {
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        Self(previous)
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.0);
    }
}

#[tokio::test]
async fn test_task_file_to_ready_list() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("backlog.toml");
    fs::write(&path, BACKLOG_TOML).unwrap();

    let tasks = TaskLoader::load_tasks(&path).unwrap();
    assert_eq!(tasks[0].metadata.branch_name.as_deref(), Some("fix/empty-input"));
    assert_eq!(tasks[0].metadata.estimated_duration_minutes, Some(30));

    let orchestrator = TaskOrchestrator::default();
    for result in orchestrator.add_tasks(tasks).await {
        result.unwrap();
    }

    let worker = WorkerId::new("w1");
    let ready = orchestrator.list_ready(&worker, &Default::default()).await;
    let ids: Vec<&str> = ready.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["issue-1", "pr-3"]);

    orchestrator.claim(&worker, &ready[0].id).await.unwrap();
    assert!(
        orchestrator
            .claim(&WorkerId::new("w2"), &ready[1].id)
            .await
            .unwrap_err()
            .is_conflict()
    );
}

#[tokio::test]
async fn test_json_and_toml_backlogs_agree() {
    let temp_dir = TempDir::new().unwrap();
    let toml_path = temp_dir.path().join("backlog.toml");
    fs::write(&toml_path, BACKLOG_TOML).unwrap();

    let from_toml = TaskLoader::load_file(&toml_path).unwrap();
    let json_path = temp_dir.path().join("backlog.json");
    fs::write(&json_path, serde_json::to_string(&from_toml).unwrap()).unwrap();

    let toml_tasks = TaskLoader::load_tasks(&toml_path).unwrap();
    let json_tasks = TaskLoader::load_tasks(&json_path).unwrap();
    assert_eq!(toml_tasks.len(), json_tasks.len());
    for (a, b) in toml_tasks.iter().zip(&json_tasks) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.priority, b.priority);
        assert_eq!(a.dependencies, b.dependencies);
        assert_eq!(a.metadata, b.metadata);
        assert_eq!(b.status(), TaskStatus::Pending);
    }
}

#[test]
fn test_unsupported_task_file_extension() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.md");
    fs::write(&path, "- [ ] something").unwrap();

    assert!(matches!(
        TaskLoader::load_tasks(&path),
        Err(TaskFileError::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_args_to_modes() {
    let args = Args::try_parse_from([
        "corch",
        "--log-level",
        "corch=trace",
        "simulate",
        "backlog.toml",
        "--capability",
        "rust",
    ])
    .unwrap();
    assert_eq!(args.log_level.as_deref(), Some("corch=trace"));
    assert!(matches!(args.mode().unwrap(), ExecutionMode::Simulate(_)));

    assert!(Args::try_parse_from(["corch", "plan"]).is_err());
}

#[test]
#[serial]
fn test_configuration_discovery_prefers_project_file() {
    let temp_dir = TempDir::new().unwrap();
    let _cwd = CwdGuard::enter(temp_dir.path());

    fs::create_dir_all(temp_dir.path().join(".corch")).unwrap();
    fs::write(
        temp_dir.path().join(".corch").join("config.toml"),
        "[simulation]\nworkers = 2\n",
    )
    .unwrap();
    fs::write(temp_dir.path().join("corch.toml"), "[simulation]\nworkers = 5\n").unwrap();

    let found = ConfigDiscovery::find_config_file().unwrap();
    assert!(found.ends_with("corch.toml"));
    assert_eq!(ConfigDiscovery::discover_config().unwrap().simulation.workers, 5);

    fs::remove_file(temp_dir.path().join("corch.toml")).unwrap();
    assert_eq!(ConfigDiscovery::discover_config().unwrap().simulation.workers, 2);
}

#[test]
#[serial]
fn test_configuration_discovery_reports_bad_file() {
    let temp_dir = TempDir::new().unwrap();
    let _cwd = CwdGuard::enter(temp_dir.path());

    fs::write(temp_dir.path().join("corch.toml"), "simulation = [").unwrap();
    assert!(ConfigDiscovery::discover_config().is_err());
}
