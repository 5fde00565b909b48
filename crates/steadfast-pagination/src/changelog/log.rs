//! ChangeLog: monotonic events, cursor leases, and lease-aware compaction.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use steadfast_core::config::{ChangeLogConfig, CursorConfig};
use steadfast_core::errors::StoreError;
use steadfast_core::models::{ChangeEvent, ChangeKind};
use steadfast_core::traits::{ChangeSink, Clock, Evictable};

#[derive(Default)]
struct LogState {
    events: BTreeMap<u64, ChangeEvent>,
    /// Newest event id per record.
    latest: HashMap<String, u64>,
    last_id: u64,
}

#[derive(Debug, Clone, Copy)]
struct Lease {
    position: u64,
    expires_at: DateTime<Utc>,
}

/// Change log fed by the record source through [`ChangeSink`].
///
/// Event ids start at 1; position 0 means "before everything".
pub struct ChangeLog {
    state: RwLock<LogState>,
    leases: DashMap<String, Lease>,
    clock: Arc<dyn Clock>,
    retention: chrono::Duration,
    lease_ttl: chrono::Duration,
}

impl ChangeLog {
    pub fn new(clock: Arc<dyn Clock>, config: &ChangeLogConfig, cursor: &CursorConfig) -> Self {
        Self {
            state: RwLock::new(LogState::default()),
            leases: DashMap::new(),
            clock,
            retention: chrono::Duration::from_std(config.effective_retention())
                .unwrap_or(chrono::Duration::MAX),
            lease_ttl: chrono::Duration::from_std(cursor.effective_ttl())
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Up to `limit` events with id greater than `after`, oldest first.
    pub fn read_after(&self, after: u64, limit: usize) -> Vec<ChangeEvent> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .events
            .range(after.saturating_add(1)..)
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Id of the newest event ever appended (0 if none).
    pub fn head(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_id
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take a lease protecting events after `position` from compaction.
    pub fn pin(&self, position: u64) -> String {
        let lease_id = uuid::Uuid::new_v4().to_string();
        self.leases.insert(
            lease_id.clone(),
            Lease {
                position,
                expires_at: self.lease_expiry(),
            },
        );
        lease_id
    }

    /// Move a live lease forward and extend it. Returns false if the lease
    /// has expired or was released.
    pub fn renew(&self, lease_id: &str, position: u64) -> bool {
        let now = self.clock.now();
        match self.leases.get_mut(lease_id) {
            Some(mut lease) if lease.expires_at > now => {
                lease.position = lease.position.max(position);
                lease.expires_at = self.lease_expiry();
                true
            }
            _ => false,
        }
    }

    pub fn release(&self, lease_id: &str) -> bool {
        self.leases.remove(lease_id).is_some()
    }

    pub fn lease_alive(&self, lease_id: &str) -> bool {
        let now = self.clock.now();
        self.leases
            .get(lease_id)
            .is_some_and(|lease| lease.expires_at > now)
    }

    pub fn lease_count(&self) -> usize {
        self.leases.len()
    }

    /// Drop expired leases, then every event that no live lease still needs
    /// and that is either superseded by a newer event for the same record
    /// or is a deletion older than the retention window.
    pub fn compact(&self, now: DateTime<Utc>) -> usize {
        self.leases.retain(|_, lease| lease.expires_at > now);
        let floor = self
            .leases
            .iter()
            .map(|lease| lease.position)
            .min()
            .unwrap_or(u64::MAX);
        let deletion_cutoff = now.checked_sub_signed(self.retention);

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let droppable: Vec<u64> = state
            .events
            .range(..=floor)
            .filter(|(id, event)| {
                let superseded = state.latest.get(&event.record_id) != Some(*id);
                let stale_deletion = event.kind == ChangeKind::Deleted
                    && deletion_cutoff.is_some_and(|cutoff| event.changed_at < cutoff);
                superseded || stale_deletion
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &droppable {
            if let Some(event) = state.events.remove(id) {
                if state.latest.get(&event.record_id) == Some(id) {
                    state.latest.remove(&event.record_id);
                }
            }
        }
        droppable.len()
    }

    fn lease_expiry(&self) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_add_signed(self.lease_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl ChangeSink for ChangeLog {
    fn record_change(&self, record_id: &str, kind: ChangeKind, changed_at: DateTime<Utc>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.last_id += 1;
        let event_id = state.last_id;
        state.events.insert(
            event_id,
            ChangeEvent {
                event_id,
                record_id: record_id.to_string(),
                changed_at,
                kind,
            },
        );
        state.latest.insert(record_id.to_string(), event_id);
    }
}

impl Evictable for ChangeLog {
    fn name(&self) -> &'static str {
        "changelog"
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(self.compact(now))
    }
}
