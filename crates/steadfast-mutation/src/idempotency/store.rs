//! IdempotencyStore: append-then-finalize records with waiter coalescing.
//!
//! A scope key is claimed eagerly with a pending slot on first sight. A
//! duplicate that arrives while the slot is pending blocks on the slot's
//! completion (bounded by the wait timeout) instead of executing again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use steadfast_core::config::IdempotencyConfig;
use steadfast_core::errors::{MutationError, StoreError};
use steadfast_core::models::{Fingerprint, IdempotencyRecord, MutationReceipt, ScopeKey};
use steadfast_core::sync::Completion;
use steadfast_core::traits::{Clock, Evictable};

/// How a pending attempt ended, as seen by its waiters.
#[derive(Debug, Clone)]
enum Settled {
    Completed(IdempotencyRecord),
    Abandoned,
}

enum Slot {
    Pending {
        fingerprint: Fingerprint,
        completion: Arc<Completion<Settled>>,
    },
    Completed(IdempotencyRecord),
}

/// Decision taken under the entry lock, acted on after it is released.
enum Observed {
    Claim,
    Replay(IdempotencyRecord),
    Mismatch,
    Wait(Arc<Completion<Settled>>),
}

/// Result of admitting a mutation attempt.
pub enum Admission<'a> {
    /// No live record: the caller owns execution and must finish the attempt.
    Fresh(PendingAttempt<'a>),
    /// Identical request already completed; replay the stored response.
    DuplicateSame(IdempotencyRecord),
    /// Token already used for a different request.
    DuplicateConflict,
}

impl std::fmt::Debug for Admission<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh(p) => f.debug_tuple("Fresh").field(&p.scope).finish(),
            Self::DuplicateSame(r) => f.debug_tuple("DuplicateSame").field(r).finish(),
            Self::DuplicateConflict => f.write_str("DuplicateConflict"),
        }
    }
}

/// Thread-safe idempotency store backed by `DashMap`.
pub struct IdempotencyStore {
    slots: DashMap<ScopeKey, Slot>,
    clock: Arc<dyn Clock>,
    record_ttl: chrono::Duration,
    wait_timeout: Duration,
}

impl IdempotencyStore {
    pub fn new(clock: Arc<dyn Clock>, config: &IdempotencyConfig) -> Self {
        let record_ttl = chrono::Duration::from_std(config.effective_record_ttl())
            .unwrap_or(chrono::Duration::MAX);
        Self {
            slots: DashMap::new(),
            clock,
            record_ttl,
            wait_timeout: config.effective_wait_timeout(),
        }
    }

    /// Admit an attempt for `scope` carrying `fingerprint`.
    ///
    /// Returns `Timeout` if a concurrent identical attempt stays pending
    /// beyond the wait bound.
    pub fn record_or_fetch(
        &self,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
    ) -> Result<Admission<'_>, MutationError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let now = self.clock.now();
            let waiting_on = match self.slots.entry(scope.clone()) {
                Entry::Vacant(vacant) => {
                    let completion = Arc::new(Completion::new());
                    vacant.insert(Slot::Pending {
                        fingerprint: fingerprint.clone(),
                        completion: Arc::clone(&completion),
                    });
                    return Ok(Admission::Fresh(self.pending(scope, fingerprint, completion, now)));
                }
                Entry::Occupied(mut occupied) => {
                    let observed = match occupied.get() {
                        Slot::Completed(record) if record.is_expired(now) => Observed::Claim,
                        Slot::Completed(record) if record.request_fingerprint == *fingerprint => {
                            Observed::Replay(record.clone())
                        }
                        Slot::Completed(_) => Observed::Mismatch,
                        Slot::Pending { fingerprint: f, .. } if f != fingerprint => Observed::Mismatch,
                        Slot::Pending { completion, .. } => Observed::Wait(Arc::clone(completion)),
                    };
                    match observed {
                        Observed::Claim => {
                            let completion = Arc::new(Completion::new());
                            occupied.insert(Slot::Pending {
                                fingerprint: fingerprint.clone(),
                                completion: Arc::clone(&completion),
                            });
                            return Ok(Admission::Fresh(
                                self.pending(scope, fingerprint, completion, now),
                            ));
                        }
                        Observed::Replay(record) => return Ok(Admission::DuplicateSame(record)),
                        Observed::Mismatch => return Ok(Admission::DuplicateConflict),
                        Observed::Wait(completion) => completion,
                    }
                }
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            match waiting_on.wait(remaining) {
                Some(Settled::Completed(record)) => {
                    return Ok(if record.request_fingerprint == *fingerprint {
                        Admission::DuplicateSame(record)
                    } else {
                        Admission::DuplicateConflict
                    });
                }
                // The owner failed; race for the slot again.
                Some(Settled::Abandoned) => continue,
                None => {
                    return Err(MutationError::Timeout {
                        resource_id: scope.resource_id.clone(),
                        waited_ms: self.wait_timeout.as_millis() as u64,
                    })
                }
            }
        }
    }

    /// Number of slots, pending and completed.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Pending { .. }))
            .count()
    }

    fn pending(
        &self,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
        completion: Arc<Completion<Settled>>,
        started_at: DateTime<Utc>,
    ) -> PendingAttempt<'_> {
        PendingAttempt {
            store: self,
            scope: scope.clone(),
            fingerprint: fingerprint.clone(),
            completion,
            started_at,
            finished: false,
        }
    }

    fn owns(slot: &Slot, completion: &Arc<Completion<Settled>>) -> bool {
        matches!(slot, Slot::Pending { completion: c, .. } if Arc::ptr_eq(c, completion))
    }
}

impl Evictable for IdempotencyStore {
    fn name(&self) -> &'static str {
        "idempotency"
    }

    /// Drops completed records past their expiry. Pending slots are owned by
    /// a live attempt and are never evicted.
    fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let expired: Vec<ScopeKey> = self
            .slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Completed(r) if r.is_expired(now)))
            .map(|slot| slot.key().clone())
            .collect();

        let mut evicted = 0;
        for key in expired {
            let removed = self
                .slots
                .remove_if(&key, |_, slot| {
                    matches!(slot, Slot::Completed(r) if r.is_expired(now))
                })
                .is_some();
            if removed {
                evicted += 1;
            }
        }
        Ok(evicted)
    }
}

/// Ownership of a pending scope key.
///
/// Call [`complete`](Self::complete) after a successful mutation. Dropping
/// the attempt without completing abandons it: the pending slot is cleared
/// and waiters re-enter admission.
pub struct PendingAttempt<'a> {
    store: &'a IdempotencyStore,
    scope: ScopeKey,
    fingerprint: Fingerprint,
    completion: Arc<Completion<Settled>>,
    started_at: DateTime<Utc>,
    finished: bool,
}

impl PendingAttempt<'_> {
    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    /// Finalize with the committed outcome and wake waiters.
    pub fn complete(mut self, receipt: MutationReceipt) -> IdempotencyRecord {
        let now = self.store.clock.now();
        let record = IdempotencyRecord {
            scope_key: self.scope.clone(),
            request_fingerprint: self.fingerprint.clone(),
            resulting_revision: receipt.revision,
            response_snapshot: receipt,
            created_at: self.started_at,
            expires_at: now
                .checked_add_signed(self.store.record_ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        if let Some(mut slot) = self.store.slots.get_mut(&self.scope) {
            if IdempotencyStore::owns(&slot, &self.completion) {
                *slot = Slot::Completed(record.clone());
            }
        }
        self.completion.complete(Settled::Completed(record.clone()));
        self.finished = true;
        record
    }

    /// Give up the scope key without recording an outcome.
    pub fn abandon(self) {}
}

impl Drop for PendingAttempt<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let completion = &self.completion;
        self.store
            .slots
            .remove_if(&self.scope, |_, slot| IdempotencyStore::owns(slot, completion));
        completion.complete(Settled::Abandoned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use steadfast_core::models::ResolutionKind;
    use steadfast_core::traits::ManualClock;

    fn store(clock: Arc<ManualClock>) -> IdempotencyStore {
        let config = IdempotencyConfig {
            record_ttl_secs: Some(60),
            wait_timeout_ms: Some(50),
        };
        IdempotencyStore::new(clock, &config)
    }

    fn receipt(revision: u64) -> MutationReceipt {
        MutationReceipt {
            resource_id: "r1".into(),
            revision,
            state: json!({"n": revision}),
            resolution: ResolutionKind::Applied,
            committed_at: Utc.timestamp_opt(0, 0).single().unwrap(),
        }
    }

    #[test]
    fn completed_record_replays_and_rejects_mismatch() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock);
        let scope = ScopeKey::new("u1", "r1", "t1");
        let fp = Fingerprint::from_hex("aa");

        match store.record_or_fetch(&scope, &fp).unwrap() {
            Admission::Fresh(pending) => {
                pending.complete(receipt(6));
            }
            other => panic!("expected Fresh, got {other:?}"),
        }

        match store.record_or_fetch(&scope, &fp).unwrap() {
            Admission::DuplicateSame(record) => assert_eq!(record.resulting_revision, 6),
            other => panic!("expected DuplicateSame, got {other:?}"),
        }
        assert!(matches!(
            store.record_or_fetch(&scope, &Fingerprint::from_hex("bb")).unwrap(),
            Admission::DuplicateConflict
        ));
    }

    #[test]
    fn abandoned_attempt_frees_the_scope() {
        let store = store(Arc::new(ManualClock::default()));
        let scope = ScopeKey::new("u1", "r1", "t1");
        let fp = Fingerprint::from_hex("aa");

        let first = store.record_or_fetch(&scope, &fp).unwrap();
        assert_eq!(store.pending_count(), 1);
        drop(first);
        assert!(store.is_empty());
        assert!(matches!(
            store.record_or_fetch(&scope, &fp).unwrap(),
            Admission::Fresh(_)
        ));
    }

    #[test]
    fn pending_duplicate_times_out() {
        let store = store(Arc::new(ManualClock::default()));
        let scope = ScopeKey::new("u1", "r1", "t1");
        let fp = Fingerprint::from_hex("aa");

        let _owner = store.record_or_fetch(&scope, &fp).unwrap();
        let err = store.record_or_fetch(&scope, &fp).unwrap_err();
        assert!(matches!(err, MutationError::Timeout { waited_ms: 50, .. }));
    }

    #[test]
    fn expired_record_is_fresh_again_and_evictable() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock.clone());
        let scope = ScopeKey::new("u1", "r1", "t1");
        let fp = Fingerprint::from_hex("aa");

        if let Admission::Fresh(p) = store.record_or_fetch(&scope, &fp).unwrap() {
            p.complete(receipt(1));
        }
        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(store.evict_expired(clock.now()).unwrap(), 1);
        assert!(matches!(
            store.record_or_fetch(&scope, &Fingerprint::from_hex("bb")).unwrap(),
            Admission::Fresh(_)
        ));
    }
}
