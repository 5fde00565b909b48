//! Outcome counters for the gateway surface.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use steadfast_core::errors::{MutationError, PaginationError, SnapshotError};
use steadfast_core::models::ResolutionKind;
use steadfast_mutation::MutateOutcome;

/// Lock-free counters updated on every request and eviction sweep.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    applied: AtomicU64,
    replayed: AtomicU64,
    rebased: AtomicU64,
    conflicts: AtomicU64,
    token_mismatches: AtomicU64,
    timeouts: AtomicU64,
    cursor_rejections: AtomicU64,
    evictions: AtomicU64,
    eviction_failures: AtomicU64,
}

/// Point-in-time copy of [`GatewayMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub applied: u64,
    pub replayed: u64,
    pub rebased: u64,
    pub conflicts: u64,
    pub token_mismatches: u64,
    pub timeouts: u64,
    pub cursor_rejections: u64,
    pub evictions: u64,
    pub eviction_failures: u64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mutation(&self, result: &Result<MutateOutcome, MutationError>) {
        let counter = match result {
            Ok(outcome) if outcome.replayed => &self.replayed,
            Ok(outcome) => match outcome.receipt.resolution {
                ResolutionKind::Applied => &self.applied,
                ResolutionKind::Rebased => &self.rebased,
            },
            Err(MutationError::Conflict { .. }) => &self.conflicts,
            Err(MutationError::TokenReuseMismatch { .. }) => &self.token_mismatches,
            Err(MutationError::Timeout { .. }) => &self.timeouts,
            Err(_) => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_list_error(&self, err: &PaginationError) {
        match err {
            PaginationError::Cursor(_) => {
                self.cursor_rejections.fetch_add(1, Ordering::Relaxed);
            }
            PaginationError::Snapshot(SnapshotError::CreationTimeout { .. }) => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn record_evictions(&self, evicted: usize) {
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn record_eviction_failure(&self) {
        self.eviction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            applied: load(&self.applied),
            replayed: load(&self.replayed),
            rebased: load(&self.rebased),
            conflicts: load(&self.conflicts),
            token_mismatches: load(&self.token_mismatches),
            timeouts: load(&self.timeouts),
            cursor_rejections: load(&self.cursor_rejections),
            evictions: load(&self.evictions),
            eviction_failures: load(&self.eviction_failures),
        }
    }
}
