pub mod browse;
pub mod common;
pub mod compact;
pub mod completions;
pub mod dq;
pub mod list;
pub mod snapshot;
pub mod status;
pub mod sync;
