use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use poolside_core::SyncStatus;

#[derive(Parser)]
#[command(name = "poolside")]
#[command(about = "Record swim meet disqualifications, online or not")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to judge config JSON
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a disqualification
    Dq {
        /// Event ID
        event: i64,
        /// Swimmer ID
        swimmer: i64,
        /// DQ code (e.g. 1A)
        code: String,
    },
    /// Show pending and failed counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recorded DQs
    List {
        /// Only show records in this sync state
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one sync pass against the remote authority
    Sync,
    /// Keep syncing in the background until Ctrl-C
    Watch,
    /// Put a failed DQ back in line for delivery
    Retry {
        /// Local record ID
        local_id: i64,
    },
    /// List events in the reference snapshot
    Events,
    /// List heats of an event
    Heats {
        /// Event ID
        event: i64,
    },
    /// List swimmers of a heat
    Swimmers {
        /// Heat ID
        heat: i64,
    },
    /// List the configured DQ codes by category
    Codes,
    /// Manage the reference snapshot
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// Delete synced DQs older than a number of days
    Compact {
        /// Age threshold in days
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Replace events, heats and swimmers from a JSON file
    Import {
        /// Snapshot JSON path
        path: PathBuf,
    },
    /// Load the built-in demo meet
    Demo,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Pending,
    InFlight,
    Synced,
    Failed,
}

impl From<StatusFilter> for SyncStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::InFlight => Self::InFlight,
            StatusFilter::Synced => Self::Synced,
            StatusFilter::Failed => Self::Failed,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
