use std::path::Path;

use poolside_core::models::ReferenceSnapshot;
use poolside_core::JudgeSession;

use crate::error::CliError;

fn describe(snapshot: &ReferenceSnapshot) -> String {
    format!(
        "{} events, {} heats, {} swimmers",
        snapshot.events.len(),
        snapshot.heats.len(),
        snapshot.swimmers.len()
    )
}

pub async fn run_snapshot_import(session: &JudgeSession, path: &Path) -> Result<(), CliError> {
    let snapshot = ReferenceSnapshot::load(path)?;
    if snapshot.is_empty() {
        println!("warning: {} has no events, heats or swimmers", path.display());
    }
    session.store().load_snapshot(&snapshot).await?;
    println!("Loaded {} from {}", describe(&snapshot), path.display());
    Ok(())
}

pub async fn run_snapshot_demo(session: &JudgeSession) -> Result<(), CliError> {
    let snapshot = ReferenceSnapshot::demo();
    session.store().load_snapshot(&snapshot).await?;
    println!("Loaded demo meet: {}", describe(&snapshot));
    Ok(())
}
