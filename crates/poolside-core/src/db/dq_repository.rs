//! DQ record repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{DedupKey, DqRecord, NewDqRecord, StatusCounts, SyncStatus};
use rusqlite::{params, Connection, OptionalExtension};

const RECORD_COLUMNS: &str = "local_id, dedup_key, event_id, swimmer_id, dq_code, sync_status,
    attempt_count, last_attempt_at, next_retry_at, remote_id, last_error, created_at";

/// Fields written alongside a status change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionFields {
    /// Required when moving to `synced`, forbidden otherwise
    pub remote_id: Option<String>,
    /// Count this transition as a failed delivery attempt
    pub increment_attempts: bool,
    /// Left unchanged when `None`
    pub last_attempt_at: Option<i64>,
    /// Replaces the stored deadline (`None` clears it)
    pub next_retry_at: Option<i64>,
    /// Left unchanged when `None`; cleared on `synced`
    pub last_error: Option<String>,
}

impl TransitionFields {
    /// Claim for delivery at `now`
    pub const fn claim(now: i64) -> Self {
        Self {
            remote_id: None,
            increment_attempts: false,
            last_attempt_at: Some(now),
            next_retry_at: None,
            last_error: None,
        }
    }

    /// Remote acknowledged the record
    pub fn acknowledged(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            ..Self::default()
        }
    }

    /// Delivery failed; `next_retry_at` is `None` when no retry follows
    pub fn failed_attempt(error: impl Into<String>, next_retry_at: Option<i64>) -> Self {
        Self {
            increment_attempts: true,
            next_retry_at,
            last_error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Trait for DQ record storage operations
pub trait DqRepository {
    /// Durably append a new record in `pending`
    fn append(&self, record: &NewDqRecord) -> Result<DqRecord>;

    /// Get a record by local ID
    fn get(&self, local_id: i64) -> Result<Option<DqRecord>>;

    /// All records in `status`, oldest first
    fn list_by_status(&self, status: SyncStatus) -> Result<Vec<DqRecord>>;

    /// Most recent records regardless of status, newest first
    fn list_recent(&self, limit: usize) -> Result<Vec<DqRecord>>;

    /// Row counts per status
    fn count_by_status(&self) -> Result<StatusCounts>;

    /// Move a record `from -> to`, failing with `StaleState` if it is not in `from`
    fn transition(
        &self,
        local_id: i64,
        from: SyncStatus,
        to: SyncStatus,
        fields: &TransitionFields,
    ) -> Result<()>;

    /// Return `in_flight` records last claimed before `cutoff` to `pending`
    fn recover_in_flight(&self, cutoff: i64, now: i64) -> Result<Vec<i64>>;

    /// Delete `synced` records created before `cutoff`
    fn compact_synced(&self, cutoff: i64) -> Result<usize>;
}

/// `SQLite` implementation of `DqRepository`
pub struct SqliteDqRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDqRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn current_status(&self, local_id: i64) -> Result<Option<SyncStatus>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT sync_status FROM dq_records WHERE local_id = ?1",
                params![local_id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|value| value.parse().map_err(Error::Database))
            .transpose()
    }

    fn transition_on(
        conn: &Connection,
        local_id: i64,
        from: SyncStatus,
        to: SyncStatus,
        fields: &TransitionFields,
    ) -> Result<usize> {
        let rows = conn.execute(
            "UPDATE dq_records SET
                sync_status = ?1,
                remote_id = ?2,
                attempt_count = attempt_count + ?3,
                last_attempt_at = COALESCE(?4, last_attempt_at),
                next_retry_at = ?5,
                last_error = CASE WHEN ?1 = 'synced' THEN NULL ELSE COALESCE(?6, last_error) END
             WHERE local_id = ?7 AND sync_status = ?8",
            params![
                to.as_str(),
                fields.remote_id,
                i64::from(fields.increment_attempts),
                fields.last_attempt_at,
                fields.next_retry_at,
                fields.last_error,
                local_id,
                from.as_str(),
            ],
        )?;
        Ok(rows)
    }

    /// Parse a record from a database row
    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DqRecord> {
        let dedup_key: String = row.get(1)?;
        let sync_status: String = row.get(5)?;
        Ok(DqRecord {
            local_id: row.get(0)?,
            dedup_key: dedup_key
                .parse::<DedupKey>()
                .map_err(|e| conversion_error(1, e))?,
            event_id: row.get(2)?,
            swimmer_id: row.get(3)?,
            dq_code: row.get(4)?,
            sync_status: sync_status
                .parse::<SyncStatus>()
                .map_err(|e| conversion_error(5, e))?,
            attempt_count: row.get(6)?,
            last_attempt_at: row.get(7)?,
            next_retry_at: row.get(8)?,
            remote_id: row.get(9)?,
            last_error: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

fn conversion_error(
    column: usize,
    error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, error.into())
}

fn validate_transition(from: SyncStatus, to: SyncStatus, fields: &TransitionFields) -> Result<()> {
    if !from.can_transition_to(to) {
        return Err(Error::InvalidInput(format!(
            "illegal DQ transition {from} -> {to}"
        )));
    }
    match (to, fields.remote_id.as_deref()) {
        (SyncStatus::Synced, None) => Err(Error::InvalidInput(
            "a synced DQ record requires a remote id".into(),
        )),
        (SyncStatus::Synced, Some(remote_id)) if remote_id.trim().is_empty() => Err(
            Error::InvalidInput("remote id must not be empty".into()),
        ),
        (status, Some(_)) if status != SyncStatus::Synced => Err(Error::InvalidInput(format!(
            "only synced DQ records carry a remote id, not {status}"
        ))),
        _ => Ok(()),
    }
}

impl DqRepository for SqliteDqRepository<'_> {
    fn append(&self, record: &NewDqRecord) -> Result<DqRecord> {
        self.conn
            .execute(
                "INSERT INTO dq_records (dedup_key, event_id, swimmer_id, dq_code, sync_status, attempt_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5)",
                params![
                    record.dedup_key.as_str(),
                    record.event_id,
                    record.swimmer_id,
                    record.dq_code,
                    record.created_at
                ],
            )
            .map_err(|e| Error::Write(e.to_string()))?;

        Ok(DqRecord {
            local_id: self.conn.last_insert_rowid(),
            dedup_key: record.dedup_key,
            event_id: record.event_id,
            swimmer_id: record.swimmer_id,
            dq_code: record.dq_code.clone(),
            sync_status: SyncStatus::Pending,
            attempt_count: 0,
            last_attempt_at: None,
            next_retry_at: None,
            remote_id: None,
            last_error: None,
            created_at: record.created_at,
        })
    }

    fn get(&self, local_id: i64) -> Result<Option<DqRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM dq_records WHERE local_id = ?1"),
                params![local_id],
                Self::parse_record,
            )
            .optional()?;
        Ok(record)
    }

    fn list_by_status(&self, status: SyncStatus) -> Result<Vec<DqRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS}
             FROM dq_records
             WHERE sync_status = ?1
             ORDER BY created_at ASC, local_id ASC"
        ))?;

        let records = stmt
            .query_map(params![status.as_str()], Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<DqRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS}
             FROM dq_records
             ORDER BY created_at DESC, local_id DESC
             LIMIT ?1"
        ))?;

        let records = stmt
            .query_map(params![limit as i64], Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn count_by_status(&self) -> Result<StatusCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT sync_status, COUNT(*) FROM dq_records GROUP BY sync_status")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let status = status.parse::<SyncStatus>().map_err(Error::Database)?;
            counts.set(status, count);
        }
        Ok(counts)
    }

    fn transition(
        &self,
        local_id: i64,
        from: SyncStatus,
        to: SyncStatus,
        fields: &TransitionFields,
    ) -> Result<()> {
        validate_transition(from, to, fields)?;

        if Self::transition_on(self.conn, local_id, from, to, fields)? == 1 {
            return Ok(());
        }

        match self.current_status(local_id)? {
            Some(actual) => Err(Error::StaleState {
                local_id,
                expected: from,
                actual,
            }),
            None => Err(Error::NotFound(local_id)),
        }
    }

    fn recover_in_flight(&self, cutoff: i64, now: i64) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction()?;

        let mut stmt = tx.prepare(
            "SELECT local_id FROM dq_records
             WHERE sync_status = 'in_flight'
               AND (last_attempt_at IS NULL OR last_attempt_at < ?1)
             ORDER BY created_at ASC, local_id ASC",
        )?;
        let stranded = stmt
            .query_map(params![cutoff], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        let fields =
            TransitionFields::failed_attempt("interrupted before acknowledgement", Some(now));
        for local_id in &stranded {
            Self::transition_on(
                &tx,
                *local_id,
                SyncStatus::InFlight,
                SyncStatus::Pending,
                &fields,
            )?;
        }

        tx.commit()?;
        Ok(stranded)
    }

    fn compact_synced(&self, cutoff: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM dq_records WHERE sync_status = 'synced' AND created_at < ?1",
            params![cutoff],
        )?;
        Ok(rows)
    }
}
