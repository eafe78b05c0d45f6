//! Queue status exposed to the judging UI.

use serde::Serialize;

use crate::models::StatusCounts;
use crate::services::DqStore;
use crate::Result;

/// Coarse queue state for an at-a-glance indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueHealth {
    /// Everything recorded has been acknowledged
    Clear,
    /// Records are waiting for delivery
    Pending,
    /// At least one record failed and needs an operator
    NeedsAttention,
}

impl QueueHealth {
    pub const fn from_counts(counts: &StatusCounts) -> Self {
        if counts.failed > 0 {
            Self::NeedsAttention
        } else if counts.outstanding() > 0 {
            Self::Pending
        } else {
            Self::Clear
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Clear => "all synced",
            Self::Pending => "waiting to sync",
            Self::NeedsAttention => "needs attention",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub counts: StatusCounts,
    /// `pending` plus `in_flight`
    pub pending_count: usize,
    pub failed_count: usize,
    pub health: QueueHealth,
}

impl From<StatusCounts> for QueueSummary {
    fn from(counts: StatusCounts) -> Self {
        Self {
            pending_count: counts.outstanding(),
            failed_count: counts.failed,
            health: QueueHealth::from_counts(&counts),
            counts,
        }
    }
}

/// Read-only counts, computed from the store on every call.
#[derive(Clone)]
pub struct StatusReporter {
    store: DqStore,
}

impl StatusReporter {
    pub const fn new(store: DqStore) -> Self {
        Self { store }
    }

    /// Records not yet acknowledged and not failed.
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.store.count_by_status().await?.outstanding())
    }

    pub async fn failed_count(&self) -> Result<usize> {
        Ok(self.store.count_by_status().await?.failed)
    }

    pub async fn summary(&self) -> Result<QueueSummary> {
        Ok(self.store.count_by_status().await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransitionFields;
    use crate::models::{NewDqRecord, SyncStatus};
    use pretty_assertions::assert_eq;

    #[test]
    fn health_prefers_failures_over_pending() {
        let mut counts = StatusCounts::default();
        assert_eq!(QueueHealth::from_counts(&counts), QueueHealth::Clear);

        counts.in_flight = 1;
        assert_eq!(QueueHealth::from_counts(&counts), QueueHealth::Pending);

        counts.failed = 1;
        assert_eq!(QueueHealth::from_counts(&counts), QueueHealth::NeedsAttention);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_count_includes_in_flight() {
        let store = DqStore::open_in_memory().unwrap();
        let reporter = StatusReporter::new(store.clone());

        let claimed = store.append(&NewDqRecord::new(1, 1, "1A")).await.unwrap();
        store.append(&NewDqRecord::new(1, 2, "2B")).await.unwrap();
        store
            .transition(
                claimed.local_id,
                SyncStatus::Pending,
                SyncStatus::InFlight,
                &TransitionFields::claim(1),
            )
            .await
            .unwrap();

        assert_eq!(reporter.pending_count().await.unwrap(), 2);
        assert_eq!(reporter.failed_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn summary_reflects_store_without_caching() {
        let store = DqStore::open_in_memory().unwrap();
        let reporter = StatusReporter::new(store.clone());

        let empty = reporter.summary().await.unwrap();
        assert_eq!(empty.health, QueueHealth::Clear);

        let record = store.append(&NewDqRecord::new(1, 1, "ZZ")).await.unwrap();
        store
            .transition(
                record.local_id,
                SyncStatus::Pending,
                SyncStatus::InFlight,
                &TransitionFields::claim(1),
            )
            .await
            .unwrap();
        store
            .transition(
                record.local_id,
                SyncStatus::InFlight,
                SyncStatus::Failed,
                &TransitionFields::failed_attempt("rejected", None),
            )
            .await
            .unwrap();

        let summary = reporter.summary().await.unwrap();
        assert_eq!(summary.pending_count, 0);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.health, QueueHealth::NeedsAttention);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["health"], "needs_attention");
        assert_eq!(json["counts"]["failed"], 1);
    }
}
