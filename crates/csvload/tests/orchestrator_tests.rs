//! Orchestrator tests
//!
//! Runs whole batches against the scripted destination: partitioning of
//! outcomes, bounded concurrency, completion ordering and isolation of a
//! panicking load.

mod common;

use common::{write_csv, ScriptedDestination, VALID_CSV};
use csvload::config::{DatabaseSettings, LoadConfig};
use csvload::{LoadError, LoadTask, Orchestrator, WritePolicy};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn config(dir: &TempDir, files: &[&str], max_workers: usize) -> LoadConfig {
    LoadConfig {
        source_dir: dir.path().to_path_buf(),
        files: files.iter().map(|f| f.to_string()).collect(),
        write_policy: WritePolicy::Replace,
        max_workers,
        max_retries: 3,
        retry_delay_secs: 0.0,
        ..LoadConfig::default()
    }
}

fn path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

// ============================================================================
// Partitioning
// ============================================================================

#[tokio::test]
async fn test_mixed_batch_partitions_outcomes() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "a.csv", VALID_CSV);
    write_csv(dir.path(), "b.csv", "");
    write_csv(dir.path(), "c.csv", VALID_CSV);

    let destination = ScriptedDestination::new();
    let orchestrator =
        Orchestrator::new(config(&dir, &["a.csv", "b.csv", "c.csv"], 2), destination.shared())
            .unwrap();

    let report = orchestrator.run().await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.successful.len(), 2);
    assert!(report.successful.contains(&path(&dir, "a.csv")));
    assert!(report.successful.contains(&path(&dir, "c.csv")));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].source_path, path(&dir, "b.csv"));
    assert_eq!(report.failed[0].error_message, "Empty or malformed CSV");
    assert!(!report.all_succeeded());

    let state = destination.state();
    assert_eq!(state.committed.get("a"), Some(&2));
    assert_eq!(state.committed.get("c"), Some(&2));
    assert!(!state.committed.contains_key("b"));
}

#[tokio::test]
async fn test_every_task_reported_exactly_once() {
    let dir = TempDir::new().unwrap();
    let mut names = Vec::new();
    for i in 0..12 {
        let name = format!("file_{:02}.csv", i);
        // Every third file has no rows
        let content = if i % 3 == 0 { "id,value\n" } else { VALID_CSV };
        write_csv(dir.path(), &name, content);
        names.push(name);
    }
    let files: Vec<&str> = names.iter().map(String::as_str).collect();

    let destination = ScriptedDestination::new().fail_writes("file_01", &["deadlock detected"]);
    let orchestrator = Orchestrator::new(config(&dir, &files, 3), destination.shared()).unwrap();

    let report = orchestrator.run().await;

    assert_eq!(report.total(), 12);
    assert_eq!(report.successful.len(), 8);
    assert_eq!(report.failed.len(), 4);
    assert!(report
        .failed
        .iter()
        .all(|f| f.error_message == "Validation failed"));

    let mut seen: Vec<PathBuf> = report
        .successful
        .iter()
        .cloned()
        .chain(report.failed.iter().map(|f| f.source_path.clone()))
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 12);

    let state = destination.state();
    assert_eq!(state.writes.get("file_01"), Some(&2));
    assert_eq!(state.sessions_opened, state.sessions_closed);
    assert_eq!(state.open_sessions, 0);
}

#[tokio::test]
async fn test_empty_batch() {
    let dir = TempDir::new().unwrap();
    let destination = ScriptedDestination::new();
    let orchestrator = Orchestrator::new(config(&dir, &[], 4), destination.shared()).unwrap();

    let report = orchestrator.run().await;

    assert_eq!(report.total(), 0);
    assert!(report.all_succeeded());
    assert_eq!(destination.state().connect_calls, 0);
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_is_bounded_by_max_workers() {
    let dir = TempDir::new().unwrap();
    let mut destination = ScriptedDestination::new();
    let mut tasks = Vec::new();
    for i in 0..8 {
        let name = format!("t{}.csv", i);
        let path = write_csv(dir.path(), &name, VALID_CSV);
        destination = destination.delay_writes(&format!("t{}", i), Duration::from_millis(40));
        tasks.push(LoadTask::new(path, format!("t{}", i)));
    }

    let orchestrator = Orchestrator::new(config(&dir, &[], 2), destination.shared()).unwrap();
    let report = orchestrator.run_tasks(tasks, 2).await;

    assert_eq!(report.successful.len(), 8);
    let state = destination.state();
    assert!(state.max_open_sessions <= 2, "saw {} open sessions", state.max_open_sessions);
    assert!(state.max_open_sessions >= 1);
    assert_eq!(state.open_sessions, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_report_follows_completion_order() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "slow.csv", VALID_CSV);
    write_csv(dir.path(), "fast.csv", VALID_CSV);

    let destination = ScriptedDestination::new().delay_writes("slow", Duration::from_millis(300));
    let orchestrator =
        Orchestrator::new(config(&dir, &["slow.csv", "fast.csv"], 2), destination.shared())
            .unwrap();

    let report = orchestrator.run().await;

    assert_eq!(
        report.successful,
        vec![path(&dir, "fast.csv"), path(&dir, "slow.csv")]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_worker_runs_in_submission_order() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "first.csv", VALID_CSV);
    write_csv(dir.path(), "second.csv", VALID_CSV);
    write_csv(dir.path(), "third.csv", VALID_CSV);

    let destination = ScriptedDestination::new().delay_writes("first", Duration::from_millis(100));
    let orchestrator = Orchestrator::new(
        config(&dir, &["first.csv", "second.csv", "third.csv"], 1),
        destination.shared(),
    )
    .unwrap();

    let report = orchestrator.run().await;

    assert_eq!(
        report.successful,
        vec![
            path(&dir, "first.csv"),
            path(&dir, "second.csv"),
            path(&dir, "third.csv")
        ]
    );
    assert_eq!(destination.state().max_open_sessions, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_load_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "good.csv", VALID_CSV);
    write_csv(dir.path(), "boom.csv", VALID_CSV);
    write_csv(dir.path(), "also_good.csv", VALID_CSV);

    let destination = ScriptedDestination::new().panic_on("boom");
    let orchestrator = Orchestrator::new(
        config(&dir, &["good.csv", "boom.csv", "also_good.csv"], 2),
        destination.shared(),
    )
    .unwrap();

    let report = orchestrator.run().await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.successful.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].source_path, path(&dir, "boom.csv"));
    assert!(report.failed[0].error_message.starts_with("Load task panicked"));
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_zero_workers_rejected() {
    let dir = TempDir::new().unwrap();
    let result = Orchestrator::new(config(&dir, &["a.csv"], 0), ScriptedDestination::new().shared());
    assert!(matches!(result, Err(LoadError::Configuration(_))));
}

#[test]
fn test_missing_database_settings_rejected() {
    let dir = TempDir::new().unwrap();
    let config = LoadConfig {
        database: DatabaseSettings {
            host: None,
            user: Some("loader".to_string()),
            password: Some("secret".to_string()),
            name: Some("olist".to_string()),
            ..DatabaseSettings::default()
        },
        ..config(&dir, &["a.csv"], 2)
    };

    match Orchestrator::from_config(config) {
        Err(LoadError::Configuration(message)) => assert!(message.contains("DB_HOST")),
        Err(other) => panic!("expected configuration error, got {:?}", other),
        Ok(_) => panic!("expected configuration error"),
    }
}
