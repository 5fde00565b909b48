//! Collaborator contracts and capabilities.

pub mod change_sink;
pub mod clock;
pub mod evictable;
pub mod rebase;
pub mod record_source;
pub mod revision_store;

pub use change_sink::ChangeSink;
pub use clock::{Clock, ManualClock, SystemClock};
pub use evictable::Evictable;
pub use rebase::RebaseStrategy;
pub use record_source::RecordSource;
pub use revision_store::{CasOutcome, RevisionStore};
