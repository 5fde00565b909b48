//! Append-only change log for event-log pagination.

mod log;

pub use log::ChangeLog;
