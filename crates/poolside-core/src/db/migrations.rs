//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
pub(super) const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate(conn, 1, V1_REFERENCE_SNAPSHOT)?;
    }
    if version < 2 {
        migrate(conn, 2, V2_DQ_RECORDS)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

/// Apply one migration step and record it, all or nothing
fn migrate(conn: &Connection, version: i32, statements: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
    )?;
    tx.execute_batch(statements)?;
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Version 1: read-only reference snapshot
const V1_REFERENCE_SNAPSHOT: &str = "
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY,
        number INTEGER NOT NULL,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS heats (
        id INTEGER PRIMARY KEY,
        event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        number INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_heats_event ON heats(event_id, number);
    CREATE TABLE IF NOT EXISTS swimmers (
        id INTEGER PRIMARY KEY,
        heat_id INTEGER NOT NULL REFERENCES heats(id) ON DELETE CASCADE,
        lane INTEGER NOT NULL,
        name TEXT NOT NULL,
        team TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_swimmers_heat ON swimmers(heat_id, lane);
";

/// Version 2: DQ write queue
///
/// AUTOINCREMENT keeps `local_id` from ever being handed out twice, even
/// after synced rows are compacted away. DQ rows deliberately carry no
/// foreign keys: a snapshot reload must never cascade into recorded DQs.
const V2_DQ_RECORDS: &str = "
    CREATE TABLE IF NOT EXISTS dq_records (
        local_id INTEGER PRIMARY KEY AUTOINCREMENT,
        dedup_key TEXT NOT NULL UNIQUE,
        event_id INTEGER NOT NULL,
        swimmer_id INTEGER NOT NULL,
        dq_code TEXT NOT NULL,
        sync_status TEXT NOT NULL DEFAULT 'pending'
            CHECK (sync_status IN ('pending', 'in_flight', 'synced', 'failed')),
        attempt_count INTEGER NOT NULL DEFAULT 0 CHECK (attempt_count >= 0),
        last_attempt_at INTEGER,
        next_retry_at INTEGER,
        remote_id TEXT,
        last_error TEXT,
        created_at INTEGER NOT NULL,
        CHECK ((sync_status = 'synced') = (remote_id IS NOT NULL))
    );
    CREATE INDEX IF NOT EXISTS idx_dq_records_status ON dq_records(sync_status, created_at, local_id);
";
