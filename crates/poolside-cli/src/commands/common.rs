use std::path::{Path, PathBuf};

use chrono::Utc;
use poolside_core::config::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use poolside_core::db::StorageConfig;
use poolside_core::{DqRecord, JudgeConfig, JudgeSession, QueueHealth, QueueSummary, SyncStatus};
use serde::Serialize;

use crate::error::CliError;

const DB_FILE_NAME: &str = "poolside.db";

#[derive(Debug, Serialize)]
pub struct DqListItem {
    pub local_id: i64,
    pub dedup_key: String,
    pub event_id: i64,
    pub swimmer_id: i64,
    pub dq_code: String,
    pub status: SyncStatus,
    pub attempt_count: u32,
    pub remote_id: Option<String>,
    pub last_error: Option<String>,
    pub next_retry_at: Option<i64>,
    pub created_at: i64,
    pub created_at_iso: String,
    pub relative_time: String,
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve config directory".into()))
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(DB_FILE_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve data directory".into()))
}

/// Resolve the judge config for this invocation.
///
/// Precedence: `--db-path`, then `POOLSIDE_*` environment, then the config
/// file, then defaults. The CLI always uses a persistent store.
pub fn resolve_config(
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<JudgeConfig, CliError> {
    resolve_config_with(config_path, db_path, |key| std::env::var(key).ok())
}

pub fn resolve_config_with(
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<JudgeConfig, CliError> {
    let mut config = match config_path {
        Some(path) if !path.exists() => {
            return Err(CliError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Some(path) => JudgeConfig::load_from_path(path)?,
        None => JudgeConfig::load_from_path(&default_config_path()?)?,
    };
    config.apply_overrides(env)?;

    if let Some(path) = db_path {
        config.storage = StorageConfig::persistent(path);
    } else if !config.storage.is_persistent() {
        config.storage = StorageConfig::persistent(default_db_path()?);
    }
    Ok(config)
}

pub async fn open_session(
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<JudgeSession, CliError> {
    let config = resolve_config(config_path, db_path)?;
    Ok(JudgeSession::open(config).await?)
}

pub fn record_to_list_item(record: &DqRecord) -> DqListItem {
    let now_ms = Utc::now().timestamp_millis();
    DqListItem {
        local_id: record.local_id,
        dedup_key: record.dedup_key.as_str(),
        event_id: record.event_id,
        swimmer_id: record.swimmer_id,
        dq_code: record.dq_code.clone(),
        status: record.sync_status,
        attempt_count: record.attempt_count,
        remote_id: record.remote_id.clone(),
        last_error: record.last_error.clone(),
        next_retry_at: record.next_retry_at,
        created_at: record.created_at,
        created_at_iso: format_timestamp(record.created_at),
        relative_time: format_relative_time(record.created_at, now_ms),
    }
}

pub fn format_record_lines(records: &[DqRecord], now_ms: i64) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let relative_time = format_relative_time(record.created_at, now_ms);
            let base = format!(
                "#{:<5} event {:<5} swimmer {:<6} {:<4}  {:<9}  {relative_time}",
                record.local_id,
                record.event_id,
                record.swimmer_id,
                record.dq_code,
                record.sync_status.as_str(),
            );
            match (&record.remote_id, &record.last_error) {
                (Some(remote_id), _) => format!("{base}  -> {remote_id}"),
                (None, Some(error)) => format!("{base}  ({error})"),
                (None, None) => base,
            }
        })
        .collect()
}

pub fn format_status_lines(summary: &QueueSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Pending: {}", summary.pending_count),
        format!("Failed:  {}", summary.failed_count),
        format!("Synced:  {}", summary.counts.synced),
        format!("Queue:   {}", summary.health.label()),
    ];
    if summary.health == QueueHealth::NeedsAttention {
        lines.push(failed_warning(summary.failed_count));
    }
    lines
}

pub fn failed_warning(failed_count: usize) -> String {
    let noun = if failed_count == 1 { "DQ" } else { "DQs" };
    format!(
        "warning: {failed_count} {noun} failed to sync; review with `poolside list --status failed` and requeue with `poolside retry <id>`"
    )
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}
