//! Data models for Poolside

mod dq_code;
mod dq_record;
mod reference;

pub use dq_code::{normalize_dq_code, DqCode, DqCodeCatalog};
pub use dq_record::{DedupKey, DqRecord, NewDqRecord, StatusCounts, SyncStatus};
pub use reference::{Event, Heat, ReferenceSnapshot, Swimmer};
