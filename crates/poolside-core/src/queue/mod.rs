//! DQ write queue: the single entry point the judging UI records through.

use std::sync::Arc;

use crate::db::TransitionFields;
use crate::error::{Error, Result};
use crate::models::{normalize_dq_code, DqCodeCatalog, DqRecord, NewDqRecord, SyncStatus};
use crate::services::DqStore;

/// Validates and durably records DQs; never touches the network.
#[derive(Clone)]
pub struct DqQueue {
    store: DqStore,
    catalog: Option<Arc<DqCodeCatalog>>,
}

impl DqQueue {
    pub const fn new(store: DqStore) -> Self {
        Self {
            store,
            catalog: None,
        }
    }

    /// Restrict accepted codes to a closed code list
    #[must_use]
    pub fn with_catalog(mut self, catalog: DqCodeCatalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn catalog(&self) -> Option<&DqCodeCatalog> {
        self.catalog.as_deref()
    }

    /// Record a DQ against a swimmer.
    ///
    /// Returns the persisted `pending` record once it is durable. Storage
    /// failures come back as [`Error::Write`] so the judge can retry the tap.
    pub async fn enqueue(&self, event_id: i64, swimmer_id: i64, dq_code: &str) -> Result<DqRecord> {
        let dq_code = normalize_dq_code(dq_code)
            .ok_or_else(|| Error::InvalidInput("DQ code cannot be empty".into()))?;

        if let Some(catalog) = &self.catalog {
            if !catalog.contains(&dq_code) {
                return Err(Error::InvalidInput(format!("unknown DQ code: {dq_code}")));
            }
        }

        let (event_known, swimmer_known) = self
            .store
            .references_exist(event_id, swimmer_id)
            .await
            .map_err(|e| Error::Write(e.to_string()))?;
        if !event_known {
            return Err(Error::UnknownReference(format!("event {event_id}")));
        }
        if !swimmer_known {
            return Err(Error::UnknownReference(format!("swimmer {swimmer_id}")));
        }

        let record = self
            .store
            .append(&NewDqRecord::new(event_id, swimmer_id, dq_code))
            .await?;

        tracing::info!(
            local_id = record.local_id,
            event_id,
            swimmer_id,
            dq_code = %record.dq_code,
            "DQ recorded locally"
        );
        Ok(record)
    }

    /// Operator intervention: put a `failed` record back in line for delivery.
    pub async fn reset_failed(&self, local_id: i64) -> Result<DqRecord> {
        self.store
            .transition(
                local_id,
                SyncStatus::Failed,
                SyncStatus::Pending,
                &TransitionFields::default(),
            )
            .await?;

        tracing::info!(local_id, "Failed DQ reset to pending");
        self.store
            .get(local_id)
            .await?
            .ok_or(Error::NotFound(local_id))
    }
}
