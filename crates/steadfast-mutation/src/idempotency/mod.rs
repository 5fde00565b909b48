//! Idempotency records keyed by (user, resource, token).

mod store;

pub use store::{Admission, IdempotencyStore, PendingAttempt};
