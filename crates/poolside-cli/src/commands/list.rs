use chrono::Utc;
use poolside_core::{DqRecord, JudgeSession, SyncStatus};

use crate::commands::common::{format_record_lines, record_to_list_item, DqListItem};
use crate::error::CliError;

pub async fn list_records(
    session: &JudgeSession,
    status: Option<SyncStatus>,
    limit: usize,
) -> Result<Vec<DqRecord>, CliError> {
    let store = session.store();
    let records = match status {
        Some(status) => {
            let mut records = store.list_by_status(status).await?;
            records.truncate(limit);
            records
        }
        None => store.list_recent(limit).await?,
    };
    Ok(records)
}

pub async fn run_list(
    session: &JudgeSession,
    status: Option<SyncStatus>,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let records = list_records(session, status, limit).await?;

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<DqListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No DQs recorded.");
        return Ok(());
    }

    for line in format_record_lines(&records, Utc::now().timestamp_millis()) {
        println!("{line}");
    }
    Ok(())
}
