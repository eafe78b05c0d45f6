//! poolside-core - Core library for Poolside
//!
//! Offline-durable recording of swim meet disqualifications: judges append
//! DQs to a local store that survives crashes, and a background worker
//! delivers them to the meet's remote authority exactly once.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;
pub mod services;
pub mod status;
pub mod sync;
pub mod util;

pub use config::JudgeConfig;
pub use error::{Error, Result};
pub use models::{DedupKey, DqRecord, SyncStatus};
pub use services::{DqStore, JudgeSession};
pub use status::{QueueHealth, QueueSummary};
pub use sync::{PassOutcome, SyncReport};
