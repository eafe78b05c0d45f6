use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] poolside_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("DQ record not found: {0}")]
    RecordNotFound(i64),
    #[error("Compaction threshold must be at least one day")]
    InvalidCompactionAge,
}
