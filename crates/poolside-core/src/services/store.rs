//! Shared store handle used by the queue, sync worker and status reporter.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, DqRepository, ReferenceRepository, SqliteDqRepository, SqliteReferenceRepository,
    StorageConfig, TransitionFields,
};
use crate::models::{
    DqRecord, Event, Heat, NewDqRecord, ReferenceSnapshot, StatusCounts, Swimmer, SyncStatus,
};
use crate::Result;

/// Thread-safe, cloneable handle to the durable local store.
///
/// The lock is held for one store operation at a time, so the foreground
/// enqueue path never waits on a remote call made by the sync worker.
#[derive(Clone)]
pub struct DqStore {
    db: Arc<Mutex<Database>>,
}

impl DqStore {
    /// Open the store selected by configuration.
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        let db = Database::open_storage(storage)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open a persistent store at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(&StorageConfig::persistent(db_path))
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&StorageConfig::InMemory)
    }

    /// Storage backend this handle was opened with.
    pub async fn storage(&self) -> StorageConfig {
        let db = self.db.lock().await;
        db.storage().clone()
    }

    /// Durably append a new pending record.
    pub async fn append(&self, record: &NewDqRecord) -> Result<DqRecord> {
        let db = self.db.lock().await;
        let repo = SqliteDqRepository::new(db.connection());
        repo.append(record)
    }

    /// Fetch a record by local id.
    pub async fn get(&self, local_id: i64) -> Result<Option<DqRecord>> {
        let db = self.db.lock().await;
        let repo = SqliteDqRepository::new(db.connection());
        repo.get(local_id)
    }

    /// List records in a status, oldest first.
    pub async fn list_by_status(&self, status: SyncStatus) -> Result<Vec<DqRecord>> {
        let db = self.db.lock().await;
        let repo = SqliteDqRepository::new(db.connection());
        repo.list_by_status(status)
    }

    /// List recent records, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<DqRecord>> {
        let db = self.db.lock().await;
        let repo = SqliteDqRepository::new(db.connection());
        repo.list_recent(limit)
    }

    /// Row counts per status.
    pub async fn count_by_status(&self) -> Result<StatusCounts> {
        let db = self.db.lock().await;
        let repo = SqliteDqRepository::new(db.connection());
        repo.count_by_status()
    }

    /// Guarded status transition.
    pub async fn transition(
        &self,
        local_id: i64,
        from: SyncStatus,
        to: SyncStatus,
        fields: &TransitionFields,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = SqliteDqRepository::new(db.connection());
        repo.transition(local_id, from, to, fields)
    }

    /// Return stranded in-flight records to pending.
    pub async fn recover_in_flight(&self, cutoff: i64, now: i64) -> Result<Vec<i64>> {
        let db = self.db.lock().await;
        let repo = SqliteDqRepository::new(db.connection());
        repo.recover_in_flight(cutoff, now)
    }

    /// Delete synced records created before `cutoff`.
    pub async fn compact_synced(&self, cutoff: i64) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = SqliteDqRepository::new(db.connection());
        repo.compact_synced(cutoff)
    }

    /// List events.
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        let db = self.db.lock().await;
        let repo = SqliteReferenceRepository::new(db.connection());
        repo.list_events()
    }

    /// List heats for an event.
    pub async fn list_heats_by_event(&self, event_id: i64) -> Result<Vec<Heat>> {
        let db = self.db.lock().await;
        let repo = SqliteReferenceRepository::new(db.connection());
        repo.list_heats_by_event(event_id)
    }

    /// List swimmers for a heat.
    pub async fn list_swimmers_by_heat(&self, heat_id: i64) -> Result<Vec<Swimmer>> {
        let db = self.db.lock().await;
        let repo = SqliteReferenceRepository::new(db.connection());
        repo.list_swimmers_by_heat(heat_id)
    }

    /// Whether both references of a DQ exist in the snapshot, as `(event, swimmer)`.
    pub async fn references_exist(&self, event_id: i64, swimmer_id: i64) -> Result<(bool, bool)> {
        let db = self.db.lock().await;
        let repo = SqliteReferenceRepository::new(db.connection());
        Ok((repo.event_exists(event_id)?, repo.swimmer_exists(swimmer_id)?))
    }

    /// Replace the reference snapshot.
    pub async fn load_snapshot(&self, snapshot: &ReferenceSnapshot) -> Result<()> {
        let db = self.db.lock().await;
        let repo = SqliteReferenceRepository::new(db.connection());
        repo.replace_snapshot(snapshot)
    }
}
