use chrono::{DateTime, Utc};

use crate::models::ChangeKind;

/// Receives every record change made to a collection.
pub trait ChangeSink: Send + Sync {
    fn record_change(&self, record_id: &str, kind: ChangeKind, changed_at: DateTime<Utc>);
}
