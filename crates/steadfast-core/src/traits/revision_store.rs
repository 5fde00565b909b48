use serde_json::Value;

use crate::errors::StoreError;
use crate::models::ResourceRevision;

/// Result of a compare-and-set against the revision store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write landed and produced this revision.
    Committed { revision: u64 },
    /// The resource is no longer at the expected revision.
    StaleRevision { current: u64 },
}

/// External store holding current state and a monotonic revision per resource.
///
/// The gateway only ever writes through `compare_and_set`.
pub trait RevisionStore: Send + Sync {
    /// Current state, or `None` if the resource was never written.
    fn read(&self, resource_id: &str) -> Result<Option<ResourceRevision>, StoreError>;

    /// Replace the payload iff the resource is still at `expected_revision`.
    /// `expected_revision == 0` creates a resource that does not exist yet.
    fn compare_and_set(
        &self,
        resource_id: &str,
        expected_revision: u64,
        new_payload: &Value,
    ) -> Result<CasOutcome, StoreError>;

    /// Read, mapping a missing resource to its revision-0 state.
    fn read_or_absent(&self, resource_id: &str) -> Result<ResourceRevision, StoreError> {
        Ok(self
            .read(resource_id)?
            .unwrap_or_else(|| ResourceRevision::absent(resource_id)))
    }
}
