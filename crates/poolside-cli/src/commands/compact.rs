use chrono::Utc;
use poolside_core::JudgeSession;

use crate::error::CliError;

const DAY_MS: i64 = 24 * 60 * 60 * 1_000;

pub fn compaction_cutoff(days: u32, now_ms: i64) -> Result<i64, CliError> {
    if days == 0 {
        return Err(CliError::InvalidCompactionAge);
    }
    Ok(now_ms.saturating_sub(i64::from(days) * DAY_MS))
}

pub async fn run_compact(session: &JudgeSession, days: u32) -> Result<usize, CliError> {
    let cutoff = compaction_cutoff(days, Utc::now().timestamp_millis())?;
    let removed = session.store().compact_synced(cutoff).await?;
    println!("Removed {removed} synced DQs older than {days} days");
    Ok(removed)
}
