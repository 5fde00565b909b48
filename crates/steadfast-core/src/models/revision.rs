use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::INITIAL_REVISION;

/// Current state of a resource as held by the external revision store.
///
/// `revision_number` strictly increases on every successful write and is
/// never reused for the same `resource_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRevision {
    pub resource_id: String,
    pub revision_number: u64,
    pub payload: Value,
}

impl ResourceRevision {
    /// The state of a resource that has never been written.
    pub fn absent(resource_id: &str) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            revision_number: INITIAL_REVISION,
            payload: Value::Null,
        }
    }
}
