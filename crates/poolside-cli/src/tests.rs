use std::path::Path;

use clap::Parser;
use poolside_core::db::StorageConfig;
use poolside_core::models::{ReferenceSnapshot, StatusCounts};
use poolside_core::{JudgeSession, QueueHealth, QueueSummary, SyncStatus};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use crate::cli::{Cli, Commands, CompletionShell, StatusFilter};
use crate::commands::browse::{format_code_lines, format_event_lines, format_swimmer_lines};
use crate::commands::common::{
    format_record_lines, format_relative_time, format_status_lines, record_to_list_item,
    resolve_config_with,
};
use crate::commands::compact::{compaction_cutoff, run_compact};
use crate::commands::completions::render_completions;
use crate::commands::list::list_records;
use crate::commands::snapshot::run_snapshot_demo;
use crate::commands::sync::{format_report, run_retry, run_sync};
use crate::error::CliError;

fn write_config(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("config.json");
    std::fs::write(&path, json).unwrap();
    path
}

async fn demo_session() -> (TempDir, JudgeSession) {
    let tmp = tempdir().unwrap();
    let config_path = write_config(tmp.path(), "{}");
    let config =
        resolve_config_with(Some(&config_path), Some(tmp.path().join("judge.db")), |_| None)
            .unwrap();
    let session = JudgeSession::open(config).await.unwrap();
    run_snapshot_demo(&session).await.unwrap();
    (tmp, session)
}

#[test]
fn list_accepts_kebab_case_status() {
    let cli =
        Cli::try_parse_from(["poolside", "list", "--status", "in-flight", "-l", "5"]).unwrap();
    match cli.command {
        Commands::List { status, limit, json } => {
            assert_eq!(status, Some(StatusFilter::InFlight));
            assert_eq!(SyncStatus::from(StatusFilter::InFlight), SyncStatus::InFlight);
            assert_eq!(limit, 5);
            assert!(!json);
        }
        _ => panic!("expected list command"),
    }
}

#[test]
fn global_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from(["poolside", "dq", "101", "505", "1A", "--db-path", "/tmp/x.db"])
        .unwrap();
    assert_eq!(cli.db_path.as_deref(), Some(Path::new("/tmp/x.db")));
    assert!(matches!(
        cli.command,
        Commands::Dq { event: 101, swimmer: 505, ref code } if code == "1A"
    ));
}

#[test]
fn db_path_flag_beats_environment_and_file() {
    let tmp = tempdir().unwrap();
    let config_path = write_config(
        tmp.path(),
        r#"{ "storage": { "kind": "persistent", "path": "/from/file.db" } }"#,
    );

    let config = resolve_config_with(Some(&config_path), None, |key| {
        (key == "POOLSIDE_DB_PATH").then(|| "/from/env.db".to_string())
    })
    .unwrap();
    assert_eq!(config.storage, StorageConfig::persistent("/from/env.db"));

    let config = resolve_config_with(Some(&config_path), Some("/from/flag.db".into()), |key| {
        (key == "POOLSIDE_DB_PATH").then(|| "/from/env.db".to_string())
    })
    .unwrap();
    assert_eq!(config.storage, StorageConfig::persistent("/from/flag.db"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let tmp = tempdir().unwrap();
    let error = resolve_config_with(Some(&tmp.path().join("nope.json")), None, |_| None)
        .unwrap_err();
    assert!(matches!(error, CliError::Config(ref message) if message.contains("not found")));
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn status_lines_warn_only_when_records_failed() {
    let clear = QueueSummary::from(StatusCounts {
        synced: 4,
        ..StatusCounts::default()
    });
    let lines = format_status_lines(&clear);
    assert_eq!(lines[0], "Pending: 0");
    assert!(lines.iter().all(|line| !line.starts_with("warning")));

    let failing = QueueSummary::from(StatusCounts {
        pending: 1,
        failed: 2,
        ..StatusCounts::default()
    });
    assert_eq!(failing.health, QueueHealth::NeedsAttention);
    let lines = format_status_lines(&failing);
    assert_eq!(lines[1], "Failed:  2");
    assert!(lines
        .last()
        .unwrap()
        .starts_with("warning: 2 DQs failed to sync"));
}

#[test]
fn compaction_requires_positive_age() {
    assert!(matches!(
        compaction_cutoff(0, 0),
        Err(CliError::InvalidCompactionAge)
    ));
    assert_eq!(compaction_cutoff(1, 100_000_000).unwrap(), 100_000_000 - 86_400_000);
}

#[test]
fn completions_use_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("poolside"));
}

#[test]
fn browse_lines_include_ids() {
    let snapshot = ReferenceSnapshot::demo();
    let events = format_event_lines(&snapshot.events);
    assert_eq!(events.len(), snapshot.events.len());
    assert!(events[0].ends_with("id 1"));

    let swimmers = format_swimmer_lines(&snapshot.swimmers);
    assert!(swimmers[0].starts_with("Lane "));
}

#[tokio::test(flavor = "multi_thread")]
async fn recorded_dq_is_listed_as_pending() {
    let (_tmp, session) = demo_session().await;
    let record = session.enqueue(1, 1, "1a").await.unwrap();

    let pending = list_records(&session, Some(SyncStatus::Pending), 10)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].local_id, record.local_id);

    let synced = list_records(&session, Some(SyncStatus::Synced), 10)
        .await
        .unwrap();
    assert!(synced.is_empty());

    let lines = format_record_lines(&pending, record.created_at);
    assert!(lines[0].starts_with(&format!("#{}", record.local_id)));
    assert!(lines[0].contains("1A"));
    assert!(lines[0].contains("pending"));

    let item = record_to_list_item(&record);
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["status"], "pending");
    assert_eq!(json["dedup_key"], record.dedup_key.as_str());
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_sync_reports_missing_remote() {
    let (_tmp, session) = demo_session().await;
    session.enqueue(1, 1, "1A").await.unwrap();

    let error = run_sync(&session).await.unwrap_err();
    assert!(matches!(error, CliError::Core(poolside_core::Error::Config(_))));
    assert_eq!(session.pending_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_rejects_unknown_and_non_failed_records() {
    let (_tmp, session) = demo_session().await;

    let error = run_retry(&session, 42).await.unwrap_err();
    assert!(matches!(error, CliError::RecordNotFound(42)));

    let record = session.enqueue(1, 1, "1A").await.unwrap();
    let error = run_retry(&session, record.local_id).await.unwrap_err();
    assert!(matches!(error, CliError::Core(ref core) if core.is_stale_state()));
}

#[tokio::test(flavor = "multi_thread")]
async fn compact_keeps_unsynced_records() {
    let (_tmp, session) = demo_session().await;
    session.enqueue(1, 1, "1A").await.unwrap();

    let removed = run_compact(&session, 1).await.unwrap();
    assert_eq!(removed, 0);
    assert_eq!(session.pending_count().await.unwrap(), 1);
}

#[test]
fn report_line_mentions_deferred_records() {
    let report = poolside_core::SyncReport {
        synced: 2,
        deferred: 1,
        ..Default::default()
    };
    assert_eq!(
        format_report(&report),
        "Sync pass: 2 synced, 0 will retry, 0 failed, 1 waiting for backoff"
    );
}

#[test]
fn code_lines_group_by_category() {
    let catalog = poolside_core::models::DqCodeCatalog::from_json(
        r#"{ "Start": [{ "code": "5A", "description": "False start" }] }"#,
    )
    .unwrap();
    assert_eq!(
        format_code_lines(&catalog),
        vec!["Start:".to_string(), "  5A    False start".to_string()]
    );
}
