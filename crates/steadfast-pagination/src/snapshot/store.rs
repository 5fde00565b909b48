//! SnapshotStore: one immutable id sequence per (filter, ordering) view.

use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use steadfast_core::config::SnapshotConfig;
use steadfast_core::errors::{SnapshotError, StoreError};
use steadfast_core::models::{Fingerprint, Ordering, ViewSnapshot};
use steadfast_core::sync::{FlightError, SingleFlight};
use steadfast_core::tracing::events;
use steadfast_core::traits::{Clock, Evictable};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViewKey {
    filter_fingerprint: Fingerprint,
    ordering: Ordering,
}

struct SnapshotEntry {
    snapshot: Arc<ViewSnapshot>,
    last_access_ms: AtomicI64,
}

impl SnapshotEntry {
    fn touch(&self, now: DateTime<Utc>) {
        self.last_access_ms
            .fetch_max(now.timestamp_millis(), AtomicOrdering::Relaxed);
    }

    fn idle_since(&self) -> i64 {
        self.last_access_ms.load(AtomicOrdering::Relaxed)
    }
}

/// Snapshot registry with lazy, single-flight materialization.
///
/// A snapshot is never modified after insertion. Reads clone an `Arc`, so
/// eviction never waits on a page being served.
pub struct SnapshotStore {
    snapshots: DashMap<String, SnapshotEntry>,
    by_view: DashMap<ViewKey, String>,
    flights: SingleFlight<ViewKey, Arc<ViewSnapshot>>,
    clock: Arc<dyn Clock>,
    idle_ttl: chrono::Duration,
    max_age: chrono::Duration,
    creation_timeout: Duration,
    max_ids: usize,
}

impl SnapshotStore {
    pub fn new(clock: Arc<dyn Clock>, config: &SnapshotConfig) -> Self {
        Self {
            snapshots: DashMap::new(),
            by_view: DashMap::new(),
            flights: SingleFlight::new(),
            clock,
            idle_ttl: chrono::Duration::from_std(config.effective_idle_ttl())
                .unwrap_or(chrono::Duration::MAX),
            max_age: chrono::Duration::from_std(config.effective_max_age())
                .unwrap_or(chrono::Duration::MAX),
            creation_timeout: config.effective_creation_timeout(),
            max_ids: config.effective_max_ids(),
        }
    }

    /// Current snapshot of the view, materializing it with `materialize` if
    /// there is none or the existing one is older than the max age.
    ///
    /// Concurrent first requests for one view share a single
    /// materialization; waiters give up after the creation timeout.
    pub fn get_or_create<F>(
        &self,
        filter_fingerprint: &Fingerprint,
        ordering: Ordering,
        materialize: F,
    ) -> Result<Arc<ViewSnapshot>, SnapshotError>
    where
        F: FnOnce() -> Result<Vec<String>, StoreError>,
    {
        let key = ViewKey {
            filter_fingerprint: filter_fingerprint.clone(),
            ordering,
        };
        let now = self.clock.now();
        if let Some(existing) = self.current_for(&key, now) {
            return Ok(existing);
        }

        self.flights
            .run(key.clone(), self.creation_timeout, || {
                // A previous leader may have finished while we queued.
                if let Some(existing) = self.current_for(&key, self.clock.now()) {
                    return Ok(existing);
                }
                self.materialize(key.clone(), materialize)
            })
            .map_err(|err| match err {
                FlightError::Failed(e) => e,
                FlightError::LeaderFailed { reason } => SnapshotError::CreationFailed { reason },
                FlightError::TimedOut { waited } => SnapshotError::CreationTimeout {
                    waited_ms: waited.as_millis() as u64,
                },
            })
    }

    /// Ids at `offset..offset + limit` of the snapshot, plus its total length.
    pub fn page(
        &self,
        snapshot_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<String>, usize), SnapshotError> {
        let snapshot = self.get(snapshot_id)?;
        let total = snapshot.len();
        let start = offset.min(total);
        let end = start.saturating_add(limit).min(total);
        Ok((snapshot.ordered_record_ids[start..end].to_vec(), total))
    }

    /// Live snapshot by id; refreshes its idle timer.
    pub fn get(&self, snapshot_id: &str) -> Result<Arc<ViewSnapshot>, SnapshotError> {
        let entry = self
            .snapshots
            .get(snapshot_id)
            .ok_or_else(|| SnapshotError::Expired {
                snapshot_id: snapshot_id.to_string(),
            })?;
        entry.touch(self.clock.now());
        Ok(Arc::clone(&entry.snapshot))
    }

    pub fn contains(&self, snapshot_id: &str) -> bool {
        self.snapshots.contains_key(snapshot_id)
    }

    /// Evict one snapshot. Cursors that reference it decode as expired.
    pub fn invalidate(&self, snapshot_id: &str) -> bool {
        let removed = self.snapshots.remove(snapshot_id);
        if let Some((_, entry)) = &removed {
            let key = ViewKey {
                filter_fingerprint: entry.snapshot.filter_fingerprint.clone(),
                ordering: entry.snapshot.ordering,
            };
            self.by_view.remove_if(&key, |_, id| id == snapshot_id);
            events::snapshot_evicted(snapshot_id, "invalidated");
        }
        removed.is_some()
    }

    /// Evict every snapshot materialized for `filter_fingerprint`, under any
    /// ordering. Returns how many were evicted.
    pub fn invalidate_view(&self, filter_fingerprint: &Fingerprint) -> usize {
        let ids: Vec<String> = self
            .snapshots
            .iter()
            .filter(|e| e.snapshot.filter_fingerprint == *filter_fingerprint)
            .map(|e| e.key().clone())
            .collect();
        ids.iter().filter(|id| self.invalidate(id)).count()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn current_for(&self, key: &ViewKey, now: DateTime<Utc>) -> Option<Arc<ViewSnapshot>> {
        let id = self.by_view.get(key)?.value().clone();
        let entry = self.snapshots.get(&id)?;
        if now - entry.snapshot.created_at >= self.max_age {
            return None;
        }
        entry.touch(now);
        Some(Arc::clone(&entry.snapshot))
    }

    fn materialize<F>(&self, key: ViewKey, materialize: F) -> Result<Arc<ViewSnapshot>, SnapshotError>
    where
        F: FnOnce() -> Result<Vec<String>, StoreError>,
    {
        let ids = materialize()?;
        if ids.len() > self.max_ids {
            return Err(SnapshotError::TooLarge {
                count: ids.len(),
                max: self.max_ids,
            });
        }

        let now = self.clock.now();
        let snapshot = Arc::new(ViewSnapshot {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            ordered_record_ids: ids,
            filter_fingerprint: key.filter_fingerprint.clone(),
            ordering: key.ordering,
        });
        self.snapshots.insert(
            snapshot.snapshot_id.clone(),
            SnapshotEntry {
                snapshot: Arc::clone(&snapshot),
                last_access_ms: AtomicI64::new(now.timestamp_millis()),
            },
        );
        self.by_view.insert(key, snapshot.snapshot_id.clone());
        events::snapshot_materialized(&snapshot.snapshot_id, snapshot.len());
        Ok(snapshot)
    }
}

impl Evictable for SnapshotStore {
    fn name(&self) -> &'static str {
        "snapshots"
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = now
            .checked_sub_signed(self.idle_ttl)
            .map_or(i64::MIN, |t| t.timestamp_millis());
        let idle: Vec<String> = self
            .snapshots
            .iter()
            .filter(|e| e.idle_since() <= cutoff)
            .map(|e| e.key().clone())
            .collect();

        let mut evicted = 0;
        for id in idle {
            // Re-check: a page may have touched it since the scan.
            let removed = self
                .snapshots
                .remove_if(&id, |_, entry| entry.idle_since() <= cutoff);
            if let Some((_, entry)) = removed {
                let key = ViewKey {
                    filter_fingerprint: entry.snapshot.filter_fingerprint.clone(),
                    ordering: entry.snapshot.ordering,
                };
                self.by_view.remove_if(&key, |_, current| *current == id);
                events::snapshot_evicted(&id, "idle");
                evicted += 1;
            }
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steadfast_core::traits::ManualClock;

    fn store(clock: Arc<ManualClock>) -> SnapshotStore {
        let config = SnapshotConfig {
            idle_ttl_secs: Some(60),
            max_age_secs: Some(600),
            creation_timeout_ms: Some(100),
            max_ids: Some(3),
        };
        SnapshotStore::new(clock, &config)
    }

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("c{i}")).collect()
    }

    #[test]
    fn view_is_materialized_once() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock);
        let fp = Fingerprint::from_hex("f");
        let first = store
            .get_or_create(&fp, Ordering::modified_desc(), || Ok(ids(2)))
            .unwrap();
        let second = store
            .get_or_create(&fp, Ordering::modified_desc(), || panic!("must reuse"))
            .unwrap();
        assert_eq!(first.snapshot_id, second.snapshot_id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn page_slices_and_clamps() {
        let store = store(Arc::new(ManualClock::default()));
        let snap = store
            .get_or_create(&Fingerprint::from_hex("f"), Ordering::modified_desc(), || Ok(ids(3)))
            .unwrap();
        let (page, total) = store.page(&snap.snapshot_id, 2, 10).unwrap();
        assert_eq!(page, ["c3"]);
        assert_eq!(total, 3);
        let (empty, _) = store.page(&snap.snapshot_id, 9, 10).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn oversized_view_is_rejected() {
        let store = store(Arc::new(ManualClock::default()));
        let err = store
            .get_or_create(&Fingerprint::from_hex("f"), Ordering::modified_desc(), || Ok(ids(4)))
            .unwrap_err();
        assert!(matches!(err, SnapshotError::TooLarge { count: 4, max: 3 }));
        assert!(store.is_empty());
    }

    #[test]
    fn idle_snapshot_is_evicted_and_expires() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock.clone());
        let snap = store
            .get_or_create(&Fingerprint::from_hex("f"), Ordering::modified_desc(), || Ok(ids(1)))
            .unwrap();

        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(store.evict_expired(clock.now()).unwrap(), 0);
        store.page(&snap.snapshot_id, 0, 1).unwrap();

        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(store.evict_expired(clock.now()).unwrap(), 1);
        assert!(matches!(
            store.page(&snap.snapshot_id, 0, 1),
            Err(SnapshotError::Expired { .. })
        ));
    }

    #[test]
    fn aged_view_is_rematerialized() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock.clone());
        let fp = Fingerprint::from_hex("f");
        let old = store
            .get_or_create(&fp, Ordering::modified_desc(), || Ok(ids(1)))
            .unwrap();
        clock.advance(chrono::Duration::seconds(601));
        let fresh = store
            .get_or_create(&fp, Ordering::modified_desc(), || Ok(ids(2)))
            .unwrap();
        assert_ne!(old.snapshot_id, fresh.snapshot_id);
        // The old snapshot stays readable until idle eviction.
        assert!(store.contains(&old.snapshot_id));
    }

    #[test]
    fn invalidate_view_drops_all_orderings() {
        let store = store(Arc::new(ManualClock::default()));
        let fp = Fingerprint::from_hex("f");
        store.get_or_create(&fp, Ordering::modified_desc(), || Ok(ids(1))).unwrap();
        store.get_or_create(&fp, Ordering::created_asc(), || Ok(ids(1))).unwrap();
        store
            .get_or_create(&Fingerprint::from_hex("g"), Ordering::created_asc(), || Ok(ids(1)))
            .unwrap();
        assert_eq!(store.invalidate_view(&fp), 2);
        assert_eq!(store.len(), 1);
    }
}
