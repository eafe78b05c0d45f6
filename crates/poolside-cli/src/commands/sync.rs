use poolside_core::{JudgeSession, PassOutcome, SyncReport};
use tokio_util::sync::CancellationToken;

use crate::commands::common::{failed_warning, format_status_lines};
use crate::error::CliError;

pub fn format_report(report: &SyncReport) -> String {
    let mut line = format!(
        "Sync pass: {} synced, {} will retry, {} failed",
        report.synced, report.retried, report.failed
    );
    if report.deferred > 0 {
        line.push_str(&format!(", {} waiting for backoff", report.deferred));
    }
    if report.store_errors > 0 {
        line.push_str(&format!(", {} store errors", report.store_errors));
    }
    line
}

pub async fn run_sync(session: &JudgeSession) -> Result<PassOutcome, CliError> {
    let outcome = session.sync_now().await?;
    match outcome {
        PassOutcome::Completed(report) => println!("{}", format_report(&report)),
        PassOutcome::Skipped => println!("Sync already in progress"),
    }

    let failed = session.failed_count().await?;
    if failed > 0 {
        println!("{}", failed_warning(failed));
    }
    Ok(outcome)
}

/// Run the background loop until Ctrl-C, printing the queue state as it changes.
pub async fn run_watch(session: &JudgeSession) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let handle = session.spawn_sync_loop(cancel.clone())?;
    println!(
        "Syncing every {}s; press Ctrl-C to stop",
        session.config().sync_interval_secs
    );

    let mut ticker = tokio::time::interval(session.config().sync_interval());
    let mut last = None;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            _ = ticker.tick() => {
                let summary = session.summary().await?;
                if last.as_ref() != Some(&summary) {
                    for line in format_status_lines(&summary) {
                        println!("{line}");
                    }
                    last = Some(summary);
                }
            }
        }
    }

    handle.shutdown().await;
    println!("Stopped");
    Ok(())
}

pub async fn run_retry(session: &JudgeSession, local_id: i64) -> Result<(), CliError> {
    if session.store().get(local_id).await?.is_none() {
        return Err(CliError::RecordNotFound(local_id));
    }

    let record = session.reset_failed(local_id).await?;
    println!("DQ #{} is {} again", record.local_id, record.sync_status);

    if session.is_online() {
        run_sync(session).await?;
    }
    Ok(())
}
