//! Data model shared by the mutation and pagination engines.

pub mod change_event;
pub mod change_summary;
pub mod fingerprint;
pub mod listing;
pub mod receipt;
pub mod revision;
pub mod scope_key;
pub mod snapshot;

pub use change_event::{ChangeEvent, ChangeKind};
pub use change_summary::{ChangeSummary, TouchedFields, UpdateKind};
pub use fingerprint::Fingerprint;
pub use listing::{Direction, Filter, KeyPosition, Ordering, Record, SortField, SortValue};
pub use receipt::{IdempotencyRecord, MutationReceipt, ResolutionKind};
pub use revision::ResourceRevision;
pub use scope_key::ScopeKey;
pub use snapshot::ViewSnapshot;
