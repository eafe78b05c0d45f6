//! Judge session: the surface a judging UI drives.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::JudgeConfig;
use crate::error::{Error, Result};
use crate::models::{DqCodeCatalog, DqRecord, ReferenceSnapshot};
use crate::queue::DqQueue;
use crate::status::{QueueSummary, StatusReporter};
use crate::sync::{
    spawn_sync_loop, HttpAuthority, PassOutcome, RemoteAuthority, SyncLoopHandle, SyncWorker,
};
use crate::util::{duration_millis, now_millis};

use super::DqStore;

/// Store, queue, status and (when a remote is configured) the sync worker,
/// wired from one [`JudgeConfig`].
pub struct JudgeSession {
    config: JudgeConfig,
    store: DqStore,
    queue: DqQueue,
    status: StatusReporter,
    worker: Option<SyncWorker>,
}

impl JudgeSession {
    /// Open a session, talking HTTP to `api_base_url` when one is configured.
    pub async fn open(config: JudgeConfig) -> Result<Self> {
        let remote = match &config.api_base_url {
            Some(url) => {
                let authority = HttpAuthority::new(url.clone(), config.request_timeout())
                    .map_err(|error| Error::Config(error.message().to_string()))?;
                Some(Arc::new(authority) as Arc<dyn RemoteAuthority>)
            }
            None => None,
        };
        Self::open_with_remote(config, remote).await
    }

    /// Open a session against an explicit remote authority (or none).
    ///
    /// Loads the configured snapshot and code catalog, then returns records
    /// stranded `in_flight` by a previous crash to `pending`.
    pub async fn open_with_remote(
        config: JudgeConfig,
        remote: Option<Arc<dyn RemoteAuthority>>,
    ) -> Result<Self> {
        config.validate()?;
        let store = DqStore::open(&config.storage)?;

        if let Some(path) = &config.snapshot_path {
            let snapshot = ReferenceSnapshot::load(path)?;
            store.load_snapshot(&snapshot).await?;
        }

        let mut queue = DqQueue::new(store.clone());
        if let Some(path) = &config.dq_codes_path {
            queue = queue.with_catalog(DqCodeCatalog::load(path)?);
        }

        let worker = remote.map(|remote| {
            SyncWorker::new(store.clone(), remote)
                .with_policy(config.retry)
                .with_request_timeout(config.request_timeout())
        });

        let now = now_millis();
        let recovered = match &worker {
            Some(worker) => worker.recover(now).await?,
            None => {
                let cutoff = now.saturating_sub(duration_millis(config.request_timeout()));
                store.recover_in_flight(cutoff, now).await?.len()
            }
        };
        tracing::info!(
            storage = ?config.storage,
            online = worker.is_some(),
            recovered,
            "Judge session opened"
        );

        Ok(Self {
            status: StatusReporter::new(store.clone()),
            config,
            store,
            queue,
            worker,
        })
    }

    pub const fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub const fn store(&self) -> &DqStore {
        &self.store
    }

    /// Closed DQ code list, when one is configured
    pub fn code_catalog(&self) -> Option<&DqCodeCatalog> {
        self.queue.catalog()
    }

    pub const fn is_online(&self) -> bool {
        self.worker.is_some()
    }

    pub async fn enqueue(&self, event_id: i64, swimmer_id: i64, dq_code: &str) -> Result<DqRecord> {
        self.queue.enqueue(event_id, swimmer_id, dq_code).await
    }

    pub async fn pending_count(&self) -> Result<usize> {
        self.status.pending_count().await
    }

    pub async fn failed_count(&self) -> Result<usize> {
        self.status.failed_count().await
    }

    pub async fn summary(&self) -> Result<QueueSummary> {
        self.status.summary().await
    }

    /// Run one sync pass immediately.
    pub async fn sync_now(&self) -> Result<PassOutcome> {
        self.worker()?.run_pass().await
    }

    pub async fn reset_failed(&self, local_id: i64) -> Result<DqRecord> {
        self.queue.reset_failed(local_id).await
    }

    /// Start the periodic background loop at the configured interval.
    pub fn spawn_sync_loop(&self, cancel: CancellationToken) -> Result<SyncLoopHandle> {
        let worker = self.worker()?.clone();
        Ok(spawn_sync_loop(worker, self.config.sync_interval(), cancel))
    }

    fn worker(&self) -> Result<&SyncWorker> {
        self.worker.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "no api_base_url configured (set it in config or {})",
                crate::config::ENV_API_URL
            ))
        })
    }
}
