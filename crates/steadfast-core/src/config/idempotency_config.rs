//! Idempotency and conflict-resolution configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Configuration for the idempotency store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Seconds a completed record is kept. Default: 86400.
    pub record_ttl_secs: Option<u64>,
    /// Bound on waiting for a concurrent attempt with the same scope key. Default: 5000.
    pub wait_timeout_ms: Option<u64>,
}

impl IdempotencyConfig {
    pub fn effective_record_ttl(&self) -> Duration {
        Duration::from_secs(self.record_ttl_secs.unwrap_or(defaults::DEFAULT_RECORD_TTL_SECS))
    }

    pub fn effective_wait_timeout(&self) -> Duration {
        Duration::from_millis(
            self.wait_timeout_ms
                .unwrap_or(defaults::DEFAULT_MUTATION_WAIT_TIMEOUT_MS),
        )
    }
}

/// Configuration for conflict resolution.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConflictConfig {
    /// Compare-and-set attempts before a rebase gives up. Default: 3.
    pub max_rebase_attempts: Option<u32>,
    /// Committed revisions remembered per resource. Default: 128.
    pub journal_depth: Option<usize>,
}

impl ConflictConfig {
    pub fn effective_max_rebase_attempts(&self) -> u32 {
        self.max_rebase_attempts
            .unwrap_or(defaults::DEFAULT_MAX_REBASE_ATTEMPTS)
    }

    pub fn effective_journal_depth(&self) -> usize {
        self.journal_depth.unwrap_or(defaults::DEFAULT_JOURNAL_DEPTH)
    }
}
