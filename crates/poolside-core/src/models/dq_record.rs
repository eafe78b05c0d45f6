//! DQ record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Client-generated idempotency token carried on every remote submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey(Uuid);

impl DedupKey {
    /// Create a fresh random 128-bit key
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the string representation of this key
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for DedupKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DedupKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Where a record sits in the sync lifecycle
///
/// `pending -> in_flight -> {synced | pending | failed}`, plus the manual
/// `failed -> pending` reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    InFlight,
    Synced,
    Failed,
}

impl SyncStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::InFlight, Self::Synced, Self::Failed];

    /// Stored column value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }

    /// Whether `self -> to` is an edge of the lifecycle
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::InFlight)
                | (Self::InFlight, Self::Synced | Self::Pending | Self::Failed)
                | (Self::Failed, Self::Pending)
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_flight" | "inflight" => Ok(Self::InFlight),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown sync status: {other}")),
        }
    }
}

/// A DQ ready to be appended; the store assigns `local_id` and starts it `pending`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDqRecord {
    pub dedup_key: DedupKey,
    pub event_id: i64,
    pub swimmer_id: i64,
    pub dq_code: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl NewDqRecord {
    /// Build a new record with a fresh dedup key stamped now
    #[must_use]
    pub fn new(event_id: i64, swimmer_id: i64, dq_code: impl Into<String>) -> Self {
        Self {
            dedup_key: DedupKey::new(),
            event_id,
            swimmer_id,
            dq_code: dq_code.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A disqualification recorded on this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DqRecord {
    /// Local primary key, never reused
    pub local_id: i64,
    pub dedup_key: DedupKey,
    pub event_id: i64,
    pub swimmer_id: i64,
    pub dq_code: String,
    pub sync_status: SyncStatus,
    /// Failed delivery attempts so far
    pub attempt_count: u32,
    /// Last time the record was claimed for delivery (Unix ms)
    pub last_attempt_at: Option<i64>,
    /// Earliest time the record may be claimed again (Unix ms)
    pub next_retry_at: Option<i64>,
    /// Identifier assigned by the meet-management backend once acknowledged
    pub remote_id: Option<String>,
    /// Most recent delivery error, for the operator
    pub last_error: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl DqRecord {
    /// Whether the retry deadline has elapsed at `now`
    #[must_use]
    pub fn is_due(&self, now: i64) -> bool {
        !matches!(self.next_retry_at, Some(at) if at > now)
    }
}

/// Row counts per sync status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_flight: usize,
    pub synced: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub const fn get(&self, status: SyncStatus) -> usize {
        match status {
            SyncStatus::Pending => self.pending,
            SyncStatus::InFlight => self.in_flight,
            SyncStatus::Synced => self.synced,
            SyncStatus::Failed => self.failed,
        }
    }

    pub fn set(&mut self, status: SyncStatus, count: usize) {
        match status {
            SyncStatus::Pending => self.pending = count,
            SyncStatus::InFlight => self.in_flight = count,
            SyncStatus::Synced => self.synced = count,
            SyncStatus::Failed => self.failed = count,
        }
    }

    /// Records not yet acknowledged and still eligible for delivery
    pub const fn outstanding(&self) -> usize {
        self.pending + self.in_flight
    }

    pub const fn total(&self) -> usize {
        self.pending + self.in_flight + self.synced + self.failed
    }
}
