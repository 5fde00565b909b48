use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Fingerprint, Ordering};

/// Frozen ordered id sequence for one filter+ordering view.
///
/// Immutable after creation; pages read from `ordered_record_ids` so
/// concurrent record mutation cannot reorder, duplicate, or skip entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub snapshot_id: String,
    pub created_at: DateTime<Utc>,
    pub ordered_record_ids: Vec<String>,
    pub filter_fingerprint: Fingerprint,
    pub ordering: Ordering,
}

impl ViewSnapshot {
    pub fn len(&self) -> usize {
        self.ordered_record_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_record_ids.is_empty()
    }
}
