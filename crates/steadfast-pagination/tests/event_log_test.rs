//! Volatile orderings served by walking the change log.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use steadfast_core::config::{SteadfastConfig, VolatileStrategy};
use steadfast_core::errors::SteadfastErrorCode;
use steadfast_core::models::{ChangeKind, Filter, Ordering};
use steadfast_core::traits::{Clock, ManualClock};
use steadfast_pagination::{ChangeLog, ListEntry, ListPage, ListRequest, ListingStrategy, PaginationEngine};
use steadfast_storage::MemoryCollection;
use test_fixtures::{manual_clock, seeded_collection};

fn setup(count: usize) -> (Arc<MemoryCollection>, PaginationEngine, Arc<ManualClock>) {
    let config = SteadfastConfig::from_toml("[pagination]\nvolatile_strategy = \"event_log\"\n").unwrap();
    let clock = manual_clock();
    let changelog = Arc::new(ChangeLog::new(clock.clone(), &config.changelog, &config.cursor));
    let collection = Arc::new(seeded_collection(count, clock.clone(), Some(changelog.clone())));
    let engine = PaginationEngine::new(collection.clone(), changelog, clock.clone(), &config);
    (collection, engine, clock)
}

fn request(filter: Filter, limit: usize) -> ListRequest {
    ListRequest::new(filter, Ordering::modified_desc()).with_limit(limit)
}

fn drain(engine: &PaginationEngine, request: &ListRequest) -> Vec<ListPage> {
    let mut pages = vec![engine.list(request).unwrap()];
    while let Some(cursor) = pages.last().and_then(|p| p.next_cursor.clone()) {
        pages.push(engine.list(&request.clone().with_cursor(cursor)).unwrap());
    }
    pages
}

#[test]
fn modified_record_is_reported_again() {
    let (collection, engine, clock) = setup(5);
    let req = request(Filter::new(), 2);

    let page1 = engine.list(&req).unwrap();
    assert_eq!(page1.strategy, ListingStrategy::EventLog);
    assert_eq!(page1.record_ids(), ["c1", "c2"]);
    assert_eq!(engine.changelog().lease_count(), 1);

    clock.advance(chrono::Duration::seconds(1));
    collection.modify("c1", json!({"team": "odd", "rank": 100}));

    let page2 = engine
        .list(&req.clone().with_cursor(page1.next_cursor.unwrap()))
        .unwrap();
    assert_eq!(page2.record_ids(), ["c3", "c4"]);

    let page3 = engine
        .list(&req.with_cursor(page2.next_cursor.unwrap()))
        .unwrap();
    assert_eq!(page3.record_ids(), ["c5", "c1"]);
    assert!(!page3.has_more);
    assert!(page3.next_cursor.is_none());
    assert_eq!(engine.changelog().lease_count(), 0);

    match &page3.entries[1] {
        ListEntry::Changed { record: Some(record), kind, .. } => {
            assert_eq!(*kind, ChangeKind::Upserted);
            assert_eq!(record.attributes["rank"], 100);
        }
        other => panic!("unexpected entry {other:?}"),
    }
}

#[test]
fn deletions_bypass_the_filter() {
    let (collection, engine, _) = setup(5);
    collection.delete("c2");

    let page = engine
        .list(&request(Filter::new().field_eq("team", "odd"), 10))
        .unwrap();
    assert_eq!(page.record_ids(), ["c1", "c3", "c5", "c2"]);
    assert!(!page.has_more);
    match page.entries.last() {
        Some(ListEntry::Changed { kind, record, .. }) => {
            assert_eq!(*kind, ChangeKind::Deleted);
            assert!(record.is_none());
        }
        other => panic!("unexpected entry {other:?}"),
    }
}

#[test]
fn released_lease_expires_the_cursor() {
    let (_, engine, _) = setup(5);
    let req = request(Filter::new(), 2);
    let cursor = engine.list(&req).unwrap().next_cursor.unwrap();

    let fp = req.filter.view_fingerprint(&req.ordering).unwrap();
    let lease = engine.codec().decode(&cursor, &fp).unwrap().lease_id.unwrap();
    assert!(engine.changelog().release(&lease));

    let err = engine.list(&req.with_cursor(cursor)).unwrap_err();
    assert_eq!(err.error_code(), "CURSOR_EXPIRED");
}

#[test]
fn compaction_during_iteration_keeps_every_record() {
    let (collection, engine, clock) = setup(5);
    let req = request(Filter::new(), 2);
    let page1 = engine.list(&req).unwrap();

    clock.advance(chrono::Duration::seconds(1));
    collection.touch("c3");
    collection.touch("c3");
    collection.touch("c1");
    // Only c1's first event sits at or below the reader's position.
    assert_eq!(engine.changelog().compact(clock.now()), 1);

    let mut seen: HashSet<String> = page1.record_ids().into_iter().collect();
    let rest = drain(&engine, &req.clone().with_cursor(page1.next_cursor.unwrap()));
    seen.extend(rest.iter().flat_map(|p| p.record_ids()));
    let expected: HashSet<String> = (1..=5).map(|i| format!("c{i}")).collect();
    assert_eq!(seen, expected);

    // With no readers left, a fresh walk sees one event per live record.
    engine.changelog().compact(clock.now());
    let fresh: Vec<String> = drain(&engine, &request(Filter::new(), 100))
        .iter()
        .flat_map(|p| p.record_ids())
        .collect();
    assert_eq!(fresh.len(), 5);
    assert_eq!(fresh.into_iter().collect::<HashSet<_>>(), expected);
}

#[test]
fn old_deletions_are_forgotten_after_retention() {
    let (collection, engine, clock) = setup(2);
    collection.delete("c1");

    clock.advance(chrono::Duration::hours(25));
    engine.changelog().compact(clock.now());

    let page = engine.list(&request(Filter::new(), 10)).unwrap();
    assert_eq!(page.record_ids(), ["c2"]);
}

#[test]
fn request_can_override_configured_strategy() {
    let (_, engine, _) = setup(3);
    let page = engine
        .list(&request(Filter::new(), 10).with_strategy(VolatileStrategy::Snapshot))
        .unwrap();
    assert_eq!(page.strategy, ListingStrategy::Snapshot);
    assert_eq!(page.record_ids(), ["c3", "c2", "c1"]);
}
