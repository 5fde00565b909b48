//! Snapshot store and background eviction configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Configuration for the snapshot store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Seconds without a page read before a snapshot is evicted. Default: 900.
    pub idle_ttl_secs: Option<u64>,
    /// Seconds after which a view is re-materialized for new listings. Default: 3600.
    pub max_age_secs: Option<u64>,
    /// Bound on waiting for a concurrent materialization. Default: 5000.
    pub creation_timeout_ms: Option<u64>,
    /// Largest id sequence a snapshot may freeze. Default: 100000.
    pub max_ids: Option<usize>,
}

impl SnapshotConfig {
    pub fn effective_idle_ttl(&self) -> Duration {
        Duration::from_secs(
            self.idle_ttl_secs
                .unwrap_or(defaults::DEFAULT_SNAPSHOT_IDLE_TTL_SECS),
        )
    }

    pub fn effective_max_age(&self) -> Duration {
        Duration::from_secs(
            self.max_age_secs
                .unwrap_or(defaults::DEFAULT_SNAPSHOT_MAX_AGE_SECS),
        )
    }

    pub fn effective_creation_timeout(&self) -> Duration {
        Duration::from_millis(
            self.creation_timeout_ms
                .unwrap_or(defaults::DEFAULT_SNAPSHOT_CREATION_TIMEOUT_MS),
        )
    }

    pub fn effective_max_ids(&self) -> usize {
        self.max_ids.unwrap_or(defaults::DEFAULT_SNAPSHOT_MAX_IDS)
    }
}

/// Configuration for the background eviction worker.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EvictionConfig {
    /// Milliseconds between eviction sweeps. Default: 30000.
    pub interval_ms: Option<u64>,
}

impl EvictionConfig {
    pub fn effective_interval(&self) -> Duration {
        Duration::from_millis(
            self.interval_ms
                .unwrap_or(defaults::DEFAULT_EVICTION_INTERVAL_MS),
        )
    }
}
