//! Cursor, pagination, and change-log configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// How listings ordered by a volatile key are kept consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolatileStrategy {
    /// Freeze the ordered id sequence on the first page.
    #[default]
    Snapshot,
    /// Iterate the append-only change log.
    EventLog,
}

impl VolatileStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::EventLog => "event_log",
        }
    }
}

impl std::str::FromStr for VolatileStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snapshot" => Ok(Self::Snapshot),
            "event_log" => Ok(Self::EventLog),
            other => Err(format!("unknown volatile strategy: {other}")),
        }
    }
}

/// Configuration for cursor encoding.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CursorConfig {
    /// Secret used to derive the cursor integrity key. When unset a random
    /// key is drawn per process and cursors do not survive restarts.
    pub secret: Option<String>,
    /// Seconds a cursor stays valid after issue. Default: 3600.
    pub ttl_secs: Option<u64>,
    /// Accept version-1 cursors during the upgrade grace period. Default: true.
    pub accept_legacy: Option<bool>,
}

impl CursorConfig {
    pub fn effective_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs.unwrap_or(defaults::DEFAULT_CURSOR_TTL_SECS))
    }

    pub fn effective_accept_legacy(&self) -> bool {
        self.accept_legacy
            .unwrap_or(defaults::DEFAULT_ACCEPT_LEGACY_CURSORS)
    }
}

/// Configuration for the pagination engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size when the request names none. Default: 50.
    pub default_limit: Option<usize>,
    /// Upper bound on page size; larger requests are clamped. Default: 500.
    pub max_limit: Option<usize>,
    /// Strategy for volatile-key orderings. Default: snapshot.
    pub volatile_strategy: Option<VolatileStrategy>,
}

impl PaginationConfig {
    pub fn effective_default_limit(&self) -> usize {
        self.default_limit.unwrap_or(defaults::DEFAULT_PAGE_LIMIT)
    }

    pub fn effective_max_limit(&self) -> usize {
        self.max_limit.unwrap_or(defaults::DEFAULT_MAX_PAGE_LIMIT)
    }

    pub fn effective_volatile_strategy(&self) -> VolatileStrategy {
        self.volatile_strategy.unwrap_or_default()
    }
}

/// Configuration for the change log.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChangeLogConfig {
    /// Seconds a deletion event is kept once no cursor needs it. Default: 86400.
    pub retention_secs: Option<u64>,
}

impl ChangeLogConfig {
    pub fn effective_retention(&self) -> Duration {
        Duration::from_secs(
            self.retention_secs
                .unwrap_or(defaults::DEFAULT_CHANGELOG_RETENTION_SECS),
        )
    }
}
