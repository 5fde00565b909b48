//! Revision store wrapper that mirrors every committed write into a
//! listable collection, so mutated resources show up in listings.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use steadfast_core::errors::StoreError;
use steadfast_core::models::ResourceRevision;
use steadfast_core::traits::{CasOutcome, RevisionStore};

use crate::collection::MemoryCollection;

/// Forwards reads and compare-and-set to `inner`; on commit, upserts the new
/// payload into `collection` (which in turn reports the change to its sink).
///
/// Racing commits may reach the mirror out of order. The last mirrored
/// revision per resource is kept, and an older revision never overwrites a
/// newer one.
pub struct MirroredRevisionStore {
    inner: Arc<dyn RevisionStore>,
    collection: Arc<MemoryCollection>,
    mirrored: DashMap<String, u64>,
}

impl MirroredRevisionStore {
    pub fn new(inner: Arc<dyn RevisionStore>, collection: Arc<MemoryCollection>) -> Self {
        Self {
            inner,
            collection,
            mirrored: DashMap::new(),
        }
    }

    pub fn collection(&self) -> &Arc<MemoryCollection> {
        &self.collection
    }

    fn mirror(&self, resource_id: &str, revision: u64, payload: &Value) {
        let mut last = self.mirrored.entry(resource_id.to_string()).or_insert(0);
        if revision <= *last {
            tracing::debug!(resource_id, revision, last = *last, "skipping stale mirror write");
            return;
        }
        self.collection.upsert(resource_id, payload.clone());
        *last = revision;
    }
}

impl RevisionStore for MirroredRevisionStore {
    fn read(&self, resource_id: &str) -> Result<Option<ResourceRevision>, StoreError> {
        self.inner.read(resource_id)
    }

    fn compare_and_set(
        &self,
        resource_id: &str,
        expected_revision: u64,
        new_payload: &Value,
    ) -> Result<CasOutcome, StoreError> {
        let outcome = self
            .inner
            .compare_and_set(resource_id, expected_revision, new_payload)?;
        if let CasOutcome::Committed { revision } = outcome {
            self.mirror(resource_id, revision, new_payload);
        }
        Ok(outcome)
    }
}
