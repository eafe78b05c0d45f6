//! Database connection management

use crate::error::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::migrations;

/// Where the local store keeps its data, chosen once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    /// `SQLite` file on disk; survives process restarts
    Persistent { path: PathBuf },
    /// Process-local store for tests and dry runs
    #[default]
    InMemory,
}

impl StorageConfig {
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self::Persistent { path: path.into() }
    }

    pub const fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent { .. })
    }
}

/// Database wrapper for the `SQLite` connection
pub struct Database {
    conn: Connection,
    storage: StorageConfig,
}

impl Database {
    /// Open the store described by `storage`
    ///
    /// Safe to call repeatedly: migrations only run the steps a file is missing.
    pub fn open_storage(storage: &StorageConfig) -> Result<Self> {
        match storage {
            StorageConfig::Persistent { path } => Self::open(path),
            StorageConfig::InMemory => Self::open_in_memory(),
        }
    }

    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let database = Self {
            conn: Connection::open(path)?,
            storage: StorageConfig::persistent(path),
        };
        database.configure()?;
        database.migrate()?;
        tracing::debug!("Opened DQ store at {}", path.display());
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let database = Self {
            conn: Connection::open_in_memory()?,
            storage: StorageConfig::InMemory,
        };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` so a committed append survives an immediate crash
    fn configure(&self) -> Result<()> {
        // In-memory databases report "memory" and keep it
        self.conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .ok();
        self.conn.execute_batch(
            "PRAGMA synchronous = FULL;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn)
    }

    pub const fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
