//! Async service layer shared by every Poolside front end.

mod session;
mod store;

pub use session::JudgeSession;
pub use store::DqStore;
