//! # steadfast-mutation
//!
//! Safe writes under client retries.
//!
//! - [`IdempotencyStore`]: per-(user, resource, token) outcomes with a pending
//!   state that coalesces concurrent duplicates.
//! - [`ConflictResolver`]: retry vs rebase vs conflict on revision mismatch.
//! - [`RevisionJournal`]: what produced each recent revision, so a rebase is
//!   only taken when it is provably safe.
//! - [`MutationEngine`]: the Mutate operation tying them together.

pub mod conflict;
pub mod engine;
pub mod idempotency;
pub mod journal;
pub mod update;

pub use conflict::{ConflictResolver, Resolution};
pub use engine::{MutateOutcome, MutateRequest, MutationEngine};
pub use idempotency::{Admission, IdempotencyStore, PendingAttempt};
pub use journal::{JournalEntry, RevisionJournal};
pub use update::Update;
