//! Structured log events for key gateway operations.
//!
//! Each function emits a `tracing` event with structured fields.

use crate::models::ScopeKey;

pub fn mutation_applied(scope: &ScopeKey, revision: u64) {
    tracing::debug!(
        event = "mutation_applied",
        resource_id = %scope.resource_id,
        revision = revision,
        "mutation applied"
    );
}

pub fn mutation_replayed(scope: &ScopeKey, revision: u64) {
    tracing::info!(
        event = "mutation_replayed",
        user_id = %scope.user_id,
        resource_id = %scope.resource_id,
        revision = revision,
        "duplicate request answered from idempotency record"
    );
}

pub fn token_reuse_detected(scope: &ScopeKey) {
    tracing::warn!(
        event = "token_reuse_detected",
        user_id = %scope.user_id,
        resource_id = %scope.resource_id,
        "idempotency token reused for a different request"
    );
}

pub fn conflict_detected(resource_id: &str, expected: u64, actual: u64, reason: &str) {
    tracing::info!(
        event = "conflict_detected",
        resource_id = %resource_id,
        expected_revision = expected,
        actual_revision = actual,
        reason = %reason,
        "revision conflict"
    );
}

pub fn mutation_rebased(resource_id: &str, expected: u64, base: u64, revision: u64) {
    tracing::info!(
        event = "mutation_rebased",
        resource_id = %resource_id,
        expected_revision = expected,
        base_revision = base,
        revision = revision,
        "update rebased onto newer revision"
    );
}

pub fn mutation_wait_timeout(scope: &ScopeKey, waited_ms: u64) {
    tracing::warn!(
        event = "mutation_wait_timeout",
        resource_id = %scope.resource_id,
        waited_ms = waited_ms,
        "timed out waiting for concurrent attempt"
    );
}

pub fn snapshot_materialized(snapshot_id: &str, record_count: usize) {
    tracing::info!(
        event = "snapshot_materialized",
        snapshot_id = %snapshot_id,
        record_count = record_count,
        "view snapshot materialized"
    );
}

pub fn snapshot_evicted(snapshot_id: &str, reason: &str) {
    tracing::debug!(
        event = "snapshot_evicted",
        snapshot_id = %snapshot_id,
        reason = %reason,
        "view snapshot evicted"
    );
}

pub fn cursor_rejected(code: &str, reason: &str) {
    tracing::info!(
        event = "cursor_rejected",
        code = %code,
        reason = %reason,
        "cursor rejected"
    );
}

pub fn eviction_completed(target: &str, evicted: usize) {
    tracing::debug!(
        event = "eviction_completed",
        target = %target,
        evicted = evicted,
        "eviction sweep completed"
    );
}

pub fn eviction_failed(target: &str, error: &str) {
    tracing::warn!(
        event = "eviction_failed",
        target = %target,
        error = %error,
        "eviction sweep failed; retrying next tick"
    );
}
