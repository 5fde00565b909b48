use serde::Serialize;
use serde_json::Value;

use crate::errors::UpdateError;
use crate::models::ChangeSummary;

/// Capability an update payload implements so it can be applied, described,
/// and, when it provably commutes with intervening changes, rebased onto a
/// newer revision instead of being rejected.
pub trait RebaseStrategy: Serialize + Send + Sync {
    /// Compute the next state from `base`.
    fn apply(&self, base: &Value) -> Result<Value, UpdateError>;

    /// Describe this update for the revision journal.
    fn summary(&self) -> ChangeSummary;

    /// True when applying `self` after `prior` yields the same state as
    /// applying it before.
    fn commutes_with(&self, prior: &ChangeSummary) -> bool;
}
