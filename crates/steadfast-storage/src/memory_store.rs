//! In-memory revision store: one `DashMap` entry per resource, CAS under the
//! entry's shard lock.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use steadfast_core::errors::StoreError;
use steadfast_core::models::ResourceRevision;
use steadfast_core::traits::{CasOutcome, RevisionStore};

/// Thread-safe in-memory `RevisionStore`.
#[derive(Default)]
pub struct MemoryRevisionStore {
    resources: DashMap<String, ResourceRevision>,
}

impl MemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `payload` unconditionally, bumping the revision. Stands in for
    /// writers that bypass the gateway.
    pub fn force_write(&self, resource_id: &str, payload: Value) -> u64 {
        let mut entry = self
            .resources
            .entry(resource_id.to_string())
            .or_insert_with(|| ResourceRevision::absent(resource_id));
        entry.revision_number += 1;
        entry.payload = payload;
        entry.revision_number
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn read(&self, resource_id: &str) -> Result<Option<ResourceRevision>, StoreError> {
        Ok(self.resources.get(resource_id).map(|r| r.clone()))
    }

    fn compare_and_set(
        &self,
        resource_id: &str,
        expected_revision: u64,
        new_payload: &Value,
    ) -> Result<CasOutcome, StoreError> {
        match self.resources.entry(resource_id.to_string()) {
            Entry::Vacant(vacant) => {
                if expected_revision != 0 {
                    return Ok(CasOutcome::StaleRevision { current: 0 });
                }
                vacant.insert(ResourceRevision {
                    resource_id: resource_id.to_string(),
                    revision_number: 1,
                    payload: new_payload.clone(),
                });
                Ok(CasOutcome::Committed { revision: 1 })
            }
            Entry::Occupied(mut occupied) => {
                let current = occupied.get().revision_number;
                if current != expected_revision {
                    return Ok(CasOutcome::StaleRevision { current });
                }
                let state = occupied.get_mut();
                state.revision_number = current + 1;
                state.payload = new_payload.clone();
                Ok(CasOutcome::Committed {
                    revision: current + 1,
                })
            }
        }
    }
}
