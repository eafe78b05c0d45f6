//! Database layer for Poolside

mod connection;
mod dq_repository;
mod migrations;
mod reference_repository;

pub use connection::{Database, StorageConfig};
pub use dq_repository::{DqRepository, SqliteDqRepository, TransitionFields};
pub use reference_repository::{ReferenceRepository, SqliteReferenceRepository};
