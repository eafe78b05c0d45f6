//! Poolside CLI - judging console for recording swim meet disqualifications
//!
//! DQs are written to the local store first and synced when the remote
//! authority is reachable.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands, SnapshotCommands};
use crate::commands::browse::{run_codes, run_events, run_heats, run_swimmers};
use crate::commands::common::open_session;
use crate::commands::compact::run_compact;
use crate::commands::completions::run_completions;
use crate::commands::dq::run_dq;
use crate::commands::list::run_list;
use crate::commands::snapshot::{run_snapshot_demo, run_snapshot_import};
use crate::commands::status::run_status;
use crate::commands::sync::{run_retry, run_sync, run_watch};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("poolside=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let session = open_session(cli.config.as_deref(), cli.db_path).await?;

    match cli.command {
        Commands::Dq {
            event,
            swimmer,
            code,
        } => run_dq(&session, event, swimmer, &code).await?,
        Commands::Status { json } => run_status(&session, json).await?,
        Commands::List {
            status,
            limit,
            json,
        } => run_list(&session, status.map(Into::into), limit, json).await?,
        Commands::Sync => {
            run_sync(&session).await?;
        }
        Commands::Watch => run_watch(&session).await?,
        Commands::Retry { local_id } => run_retry(&session, local_id).await?,
        Commands::Events => run_events(&session).await?,
        Commands::Heats { event } => run_heats(&session, event).await?,
        Commands::Swimmers { heat } => run_swimmers(&session, heat).await?,
        Commands::Codes => run_codes(&session),
        Commands::Snapshot { command } => match command {
            SnapshotCommands::Import { path } => run_snapshot_import(&session, &path).await?,
            SnapshotCommands::Demo => run_snapshot_demo(&session).await?,
        },
        Commands::Compact { days } => {
            run_compact(&session, days).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
