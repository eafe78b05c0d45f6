//! Error types for poolside-core

use thiserror::Error;

use crate::models::SyncStatus;

/// Result type alias using poolside-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in poolside-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Stored value could not be decoded
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found
    #[error("DQ record not found: {0}")]
    NotFound(i64),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Event or swimmer missing from the reference snapshot
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// The DQ could not be made durable locally; the judge must retry
    #[error("DQ was not recorded locally: {0}")]
    Write(String),

    /// Optimistic transition guard rejected the update
    #[error("DQ record {local_id} is {actual}, expected {expected}")]
    StaleState {
        local_id: i64,
        expected: SyncStatus,
        actual: SyncStatus,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this is the optimistic concurrency guard firing.
    pub const fn is_stale_state(&self) -> bool {
        matches!(self, Self::StaleState { .. })
    }
}
