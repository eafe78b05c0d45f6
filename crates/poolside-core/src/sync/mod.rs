//! Sync worker: delivers pending DQs to the remote authority.
//!
//! A pass walks every `pending` record oldest first, claims it
//! (`pending -> in_flight`), submits it and records the outcome:
//! acknowledged records become `synced`, transient failures go back to
//! `pending` with an exponential retry deadline, and rejected payloads (or
//! records out of retries) become `failed` until an operator resets them.

mod remote;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::db::TransitionFields;
use crate::models::{DqRecord, SyncStatus};
use crate::services::DqStore;
use crate::util::{duration_millis, now_millis};
use crate::Result;

pub use remote::{HttpAuthority, RemoteAuthority, SubmitAck, SubmitError, SubmitRequest};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Exponential backoff with jitter and an attempt ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub factor: u32,
    pub max_delay_ms: u64,
    /// Failed attempts after which a retryable error becomes terminal
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 2_000,
            factor: 2,
            max_delay_ms: 5 * 60 * 1_000,
            max_attempts: 10,
        }
    }
}

impl RetryPolicy {
    /// `base * factor^attempt_count`, capped
    pub fn capped_delay(&self, attempt_count: u32) -> Duration {
        let growth = u64::from(self.factor.max(1)).saturating_pow(attempt_count);
        let delay = self.base_delay_ms.saturating_mul(growth).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Equal jitter: half the capped delay plus a random share of the other half
    pub fn backoff<R: Rng + ?Sized>(&self, attempt_count: u32, rng: &mut R) -> Duration {
        let capped = duration_millis(self.capped_delay(attempt_count));
        let half = capped / 2;
        let jitter = rng.gen_range(0..=capped - half);
        Duration::from_millis(u64::try_from(half + jitter).unwrap_or(self.max_delay_ms))
    }

    /// Whether `attempts` failed deliveries exhaust the policy
    pub const fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

/// Per-pass tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub retried: usize,
    pub failed: usize,
    /// Left pending because their retry deadline had not elapsed
    pub deferred: usize,
    /// Claimed by someone else first
    pub stale: usize,
    /// Local store errors while recording an outcome
    pub store_errors: usize,
}

impl SyncReport {
    pub const fn attempted(&self) -> usize {
        self.synced + self.retried + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(SyncReport),
    /// Another pass was already running; this request was dropped
    Skipped,
}

/// Clears the run flag when the pass ends, including on cancellation.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Pushes pending records to the remote authority
#[derive(Clone)]
pub struct SyncWorker {
    store: DqStore,
    remote: Arc<dyn RemoteAuthority>,
    policy: RetryPolicy,
    request_timeout: Duration,
    running: Arc<AtomicBool>,
}

impl SyncWorker {
    pub fn new(store: DqStore, remote: Arc<dyn RemoteAuthority>) -> Self {
        Self {
            store,
            remote,
            policy: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Recovery sweep: `in_flight` records older than the request timeout
    /// were abandoned (usually by a crash) and go back to `pending`.
    pub async fn recover(&self, now: i64) -> Result<usize> {
        self.sweep(now, now).await
    }

    /// Return claims older than the request timeout (as of `now`) to
    /// `pending`, due again at `retry_at`.
    async fn sweep(&self, now: i64, retry_at: i64) -> Result<usize> {
        let cutoff = now.saturating_sub(duration_millis(self.request_timeout));
        let recovered = self.store.recover_in_flight(cutoff, retry_at).await?;
        if !recovered.is_empty() {
            tracing::warn!(
                count = recovered.len(),
                ids = ?recovered,
                "Recovered DQ records stranded in flight"
            );
        }
        Ok(recovered.len())
    }

    /// Run one sync pass now.
    pub async fn run_pass(&self) -> Result<PassOutcome> {
        self.run_pass_at(now_millis()).await
    }

    /// Run one sync pass, treating records as due if their retry deadline
    /// is at or before `now` (Unix ms).
    ///
    /// Claims and retry deadlines are stamped with the wall clock at the
    /// moment they happen, not with `now`.
    pub async fn run_pass_at(&self, now: i64) -> Result<PassOutcome> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            tracing::debug!("Sync pass already running; dropping request");
            return Ok(PassOutcome::Skipped);
        };

        // No claim of ours is live while the guard is held, so anything
        // in flight past the request timeout was abandoned.
        let swept_at = now_millis();
        self.sweep(swept_at, now.min(swept_at)).await?;

        let mut report = SyncReport::default();
        for record in self.store.list_by_status(SyncStatus::Pending).await? {
            if !record.is_due(now) {
                report.deferred += 1;
                continue;
            }
            self.deliver(&record, &mut report).await;
        }

        if report.attempted() > 0 || report.store_errors > 0 {
            tracing::info!(
                synced = report.synced,
                retried = report.retried,
                failed = report.failed,
                deferred = report.deferred,
                store_errors = report.store_errors,
                "Sync pass finished"
            );
        }
        Ok(PassOutcome::Completed(report))
    }

    async fn deliver(&self, record: &DqRecord, report: &mut SyncReport) {
        let local_id = record.local_id;

        match self
            .store
            .transition(
                local_id,
                SyncStatus::Pending,
                SyncStatus::InFlight,
                &TransitionFields::claim(now_millis()),
            )
            .await
        {
            Ok(()) => {}
            Err(error) if error.is_stale_state() => {
                tracing::debug!(local_id, "DQ already claimed; skipping");
                report.stale += 1;
                return;
            }
            Err(error) => {
                tracing::warn!(local_id, %error, "Failed to claim DQ for delivery");
                report.store_errors += 1;
                return;
            }
        }

        let request = SubmitRequest::from(record);
        let result = tokio::time::timeout(self.request_timeout, self.remote.submit(&request))
            .await
            .unwrap_or_else(|_| {
                Err(SubmitError::Retryable(format!(
                    "no response within {:?}",
                    self.request_timeout
                )))
            });

        let (to, fields) = match result {
            Ok(ack) => {
                tracing::debug!(local_id, remote_id = %ack.remote_id, "DQ acknowledged");
                (SyncStatus::Synced, TransitionFields::acknowledged(ack.remote_id))
            }
            Err(SubmitError::Retryable(message)) => {
                let attempts = record.attempt_count.saturating_add(1);
                if self.policy.is_exhausted(attempts) {
                    tracing::warn!(
                        local_id,
                        attempts,
                        %message,
                        "DQ out of retries; marking failed"
                    );
                    (
                        SyncStatus::Failed,
                        TransitionFields::failed_attempt(
                            format!("gave up after {attempts} attempts: {message}"),
                            None,
                        ),
                    )
                } else {
                    let delay = self
                        .policy
                        .backoff(record.attempt_count, &mut rand::thread_rng());
                    let next_retry_at = now_millis().saturating_add(duration_millis(delay));
                    tracing::warn!(
                        local_id,
                        attempts,
                        %message,
                        retry_in_ms = duration_millis(delay),
                        "DQ delivery failed; will retry"
                    );
                    (
                        SyncStatus::Pending,
                        TransitionFields::failed_attempt(message, Some(next_retry_at)),
                    )
                }
            }
            Err(SubmitError::Terminal(message)) => {
                tracing::warn!(local_id, %message, "DQ rejected by remote; marking failed");
                (SyncStatus::Failed, TransitionFields::failed_attempt(message, None))
            }
        };

        match self
            .store
            .transition(local_id, SyncStatus::InFlight, to, &fields)
            .await
        {
            Ok(()) => match to {
                SyncStatus::Synced => report.synced += 1,
                SyncStatus::Pending => report.retried += 1,
                SyncStatus::Failed => report.failed += 1,
                SyncStatus::InFlight => {}
            },
            Err(error) => {
                // Left in flight; the next pass's recovery sweep returns it to pending.
                tracing::warn!(local_id, %error, "Failed to record DQ delivery outcome");
                report.store_errors += 1;
            }
        }
    }
}

/// Running background sync loop
pub struct SyncLoopHandle {
    trigger: mpsc::Sender<()>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SyncLoopHandle {
    /// Ask for a pass now instead of waiting for the next tick.
    ///
    /// A trigger that lands while a pass runs is dropped.
    pub fn trigger(&self) {
        // Full means a pass is already requested.
        let _ = self.trigger.try_send(());
    }

    /// Stop the loop, abandoning any pass in progress.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(error) = self.task.await {
            tracing::warn!(%error, "Sync loop task ended abnormally");
        }
    }
}

/// Spawn the periodic sync loop on the current tokio runtime.
pub fn spawn_sync_loop(
    worker: SyncWorker,
    interval: Duration,
    cancel: CancellationToken,
) -> SyncLoopHandle {
    let (trigger, mut requests) = mpsc::channel::<()>(1);

    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                    Some(()) = requests.recv() => {}
                }

                tokio::select! {
                    () = cancel.cancelled() => break,
                    outcome = worker.run_pass() => {
                        if let Err(error) = outcome {
                            tracing::warn!(%error, "Sync pass aborted");
                        }
                    }
                }

                // Ticks and triggers that arrived during the pass are dropped.
                while requests.try_recv().is_ok() {}
                ticker.reset();
            }
            tracing::debug!("Sync loop stopped");
        }
    });

    SyncLoopHandle {
        trigger,
        cancel,
        task,
    }
}
