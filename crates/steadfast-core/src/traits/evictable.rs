use chrono::{DateTime, Utc};

use crate::errors::StoreError;

/// A store with time-bounded entries swept by the background eviction worker.
///
/// Implementations must not hold locks across the whole sweep; foreground
/// requests keep running while eviction is in progress.
pub trait Evictable: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Remove everything expired as of `now`; returns how many entries went.
    fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}
