use poolside_core::JudgeSession;

use crate::commands::common::format_status_lines;
use crate::error::CliError;

pub async fn run_status(session: &JudgeSession, as_json: bool) -> Result<(), CliError> {
    let summary = session.summary().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for line in format_status_lines(&summary) {
        println!("{line}");
    }
    if !session.is_online() {
        println!("Remote: not configured (offline only)");
    }
    Ok(())
}
