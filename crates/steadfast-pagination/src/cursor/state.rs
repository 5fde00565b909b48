use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use steadfast_core::constants::{CURSOR_FORMAT_VERSION, CURSOR_LEGACY_FORMAT_VERSION};
use steadfast_core::models::{Fingerprint, KeyPosition};

/// Where the next page starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionMarker {
    /// Keyset: strictly after this sort value and id.
    After { position: KeyPosition },
    /// Snapshot: index into the frozen id sequence.
    Offset { offset: u64 },
    /// Change log: strictly after this event id.
    Event { after_event: u64 },
}

/// Decoded cursor contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    pub format_version: u8,
    pub filter_fingerprint: Fingerprint,
    pub position: PositionMarker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl CursorState {
    pub fn new(
        filter_fingerprint: Fingerprint,
        position: PositionMarker,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            format_version: CURSOR_FORMAT_VERSION,
            filter_fingerprint,
            position,
            snapshot_id: None,
            lease_id: None,
            issued_at,
        }
    }

    pub fn with_snapshot(mut self, snapshot_id: impl Into<String>) -> Self {
        self.snapshot_id = Some(snapshot_id.into());
        self
    }

    pub fn with_lease(mut self, lease_id: impl Into<String>) -> Self {
        self.lease_id = Some(lease_id.into());
        self
    }
}

/// Body of a version-1 cursor. It predates leases and issue timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LegacyBody {
    pub format_version: u8,
    pub filter_fingerprint: Fingerprint,
    pub position: PositionMarker,
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

impl LegacyBody {
    pub fn from_state(state: &CursorState) -> Self {
        Self {
            format_version: CURSOR_LEGACY_FORMAT_VERSION,
            filter_fingerprint: state.filter_fingerprint.clone(),
            position: state.position.clone(),
            snapshot_id: state.snapshot_id.clone(),
        }
    }

    /// Upgrade to the current state shape; `issued_at` stands in for the
    /// missing issue time.
    pub fn upgrade(self, issued_at: DateTime<Utc>) -> CursorState {
        CursorState {
            format_version: CURSOR_LEGACY_FORMAT_VERSION,
            filter_fingerprint: self.filter_fingerprint,
            position: self.position,
            snapshot_id: self.snapshot_id,
            lease_id: None,
            issued_at,
        }
    }
}
