use poolside_core::JudgeSession;

use crate::error::CliError;

pub async fn run_dq(
    session: &JudgeSession,
    event_id: i64,
    swimmer_id: i64,
    code: &str,
) -> Result<(), CliError> {
    let record = session.enqueue(event_id, swimmer_id, code).await?;
    println!(
        "Recorded DQ #{} ({} for swimmer {} in event {}), {}",
        record.local_id,
        record.dq_code,
        record.swimmer_id,
        record.event_id,
        record.sync_status
    );

    let pending = session.pending_count().await?;
    println!("{pending} waiting to sync");
    Ok(())
}
