//! Tracing setup is idempotent and event helpers are safe to call with or
//! without an installed subscriber.

use steadfast_core::models::ScopeKey;
use steadfast_core::tracing::{events, init_tracing, init_tracing_json};

#[test]
fn init_is_idempotent() {
    init_tracing();
    init_tracing();
    init_tracing_json();
}

#[test]
fn events_and_spans_emit() {
    init_tracing();
    let scope = ScopeKey::new("u1", "doc-1", "tok-1");
    let span = steadfast_core::mutation_span!(scope);
    let _entered = span.enter();
    events::mutation_applied(&scope, 1);
    events::mutation_replayed(&scope, 1);
    events::conflict_detected("doc-1", 1, 2, "non-commuting");
    events::eviction_failed("idempotency", "store unavailable");
}
