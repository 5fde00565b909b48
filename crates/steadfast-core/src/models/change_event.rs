use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// One entry of the append-only change log. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Strictly increasing across the log.
    pub event_id: u64,
    pub record_id: String,
    pub changed_at: DateTime<Utc>,
    pub kind: ChangeKind,
}
