//! Volatile orderings served from frozen view snapshots.

use std::collections::HashSet;
use std::sync::Arc;

use steadfast_core::config::{SteadfastConfig, VolatileStrategy};
use steadfast_core::errors::{PaginationError, SnapshotError, SteadfastErrorCode};
use steadfast_core::models::{Filter, Ordering};
use steadfast_core::traits::{Clock, Evictable, ManualClock};
use steadfast_pagination::{ChangeLog, ListRequest, ListingStrategy, PaginationEngine};
use steadfast_storage::MemoryCollection;
use test_fixtures::{manual_clock, seeded_collection};

fn setup(count: usize, config: &SteadfastConfig) -> (Arc<MemoryCollection>, PaginationEngine, Arc<ManualClock>) {
    let clock = manual_clock();
    let changelog = Arc::new(ChangeLog::new(clock.clone(), &config.changelog, &config.cursor));
    let collection = Arc::new(seeded_collection(count, clock.clone(), Some(changelog.clone())));
    let engine = PaginationEngine::new(collection.clone(), changelog, clock.clone(), config);
    (collection, engine, clock)
}

fn by_modified(limit: usize) -> ListRequest {
    ListRequest::new(Filter::new(), Ordering::modified_desc())
        .with_limit(limit)
        .with_strategy(VolatileStrategy::Snapshot)
}

fn snapshot_of(engine: &PaginationEngine, request: &ListRequest, cursor: &str) -> String {
    let fp = request.filter.view_fingerprint(&request.ordering).unwrap();
    engine.codec().decode(cursor, &fp).unwrap().snapshot_id.unwrap()
}

#[test]
fn reordering_mid_iteration_neither_skips_nor_repeats() {
    let (collection, engine, clock) = setup(6, &SteadfastConfig::default());
    let request = by_modified(2);

    let page1 = engine.list(&request).unwrap();
    assert_eq!(page1.strategy, ListingStrategy::Snapshot);
    assert_eq!(page1.record_ids(), ["c6", "c5"]);

    // Both move to the top of the live order.
    clock.advance(chrono::Duration::seconds(5));
    collection.touch("c1");
    collection.touch("c5");

    let page2 = engine
        .list(&request.clone().with_cursor(page1.next_cursor.clone().unwrap()))
        .unwrap();
    assert_eq!(page2.record_ids(), ["c4", "c3"]);
    let page3 = engine
        .list(&request.clone().with_cursor(page2.next_cursor.clone().unwrap()))
        .unwrap();
    assert_eq!(page3.record_ids(), ["c2", "c1"]);
    assert!(!page3.has_more);

    let seen: HashSet<String> = [page1, page2, page3]
        .iter()
        .flat_map(|p| p.record_ids())
        .collect();
    assert_eq!(seen.len(), 6);
}

#[test]
fn snapshot_contents_do_not_change() {
    let (collection, engine, _) = setup(4, &SteadfastConfig::default());
    let request = by_modified(1);
    let cursor = engine.list(&request).unwrap().next_cursor.unwrap();
    let id = snapshot_of(&engine, &request, &cursor);

    let before = engine.snapshots().get(&id).unwrap();
    collection.insert("c9", serde_json::json!({}));
    collection.delete("c2");
    collection.touch("c1");
    let after = engine.snapshots().get(&id).unwrap();

    assert_eq!(before.ordered_record_ids, after.ordered_record_ids);
    assert_eq!(after.ordered_record_ids, ["c4", "c3", "c2", "c1"]);
}

#[test]
fn deleted_records_are_skipped_without_shifting_pages() {
    let (collection, engine, _) = setup(6, &SteadfastConfig::default());
    let request = by_modified(2);
    let page1 = engine.list(&request).unwrap();

    collection.delete("c3");
    let page2 = engine
        .list(&request.clone().with_cursor(page1.next_cursor.clone().unwrap()))
        .unwrap();
    assert_eq!(page2.record_ids(), ["c4"]);
    assert!(page2.has_more);

    let page3 = engine
        .list(&request.with_cursor(page2.next_cursor.clone().unwrap()))
        .unwrap();
    assert_eq!(page3.record_ids(), ["c2", "c1"]);
}

#[test]
fn invalidated_snapshot_expires_the_cursor() {
    let (_, engine, _) = setup(4, &SteadfastConfig::default());
    let request = by_modified(2);
    let cursor = engine.list(&request).unwrap().next_cursor.unwrap();
    assert!(engine.snapshots().invalidate(&snapshot_of(&engine, &request, &cursor)));

    let err = engine.list(&request.with_cursor(cursor)).unwrap_err();
    assert_eq!(err.error_code(), "CURSOR_EXPIRED");
    assert!(!err.is_retryable());
}

#[test]
fn idle_snapshot_is_evicted() {
    let (_, engine, clock) = setup(4, &SteadfastConfig::default());
    let request = by_modified(2);
    let cursor = engine.list(&request).unwrap().next_cursor.unwrap();

    clock.advance(chrono::Duration::minutes(5));
    assert_eq!(engine.snapshots().evict_expired(clock.now()).unwrap(), 0);

    clock.advance(chrono::Duration::minutes(11));
    assert_eq!(engine.snapshots().evict_expired(clock.now()).unwrap(), 1);
    assert!(engine.snapshots().is_empty());

    let err = engine.list(&request.with_cursor(cursor)).unwrap_err();
    assert_eq!(err.error_code(), "CURSOR_EXPIRED");
}

#[test]
fn concurrent_first_pages_share_one_snapshot() {
    let (_, engine, _) = setup(20, &SteadfastConfig::default());
    let request = by_modified(5);
    let (shared, req) = (&engine, &request);

    let cursors: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(move |_| s.spawn(move || shared.list(req).unwrap().next_cursor.unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ids: HashSet<String> = cursors
        .iter()
        .map(|c| snapshot_of(&engine, &request, c))
        .collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(engine.snapshots().len(), 1);
}

#[test]
fn aged_snapshot_is_replaced_for_new_iterations() {
    let (_, engine, clock) = setup(3, &SteadfastConfig::default());
    let request = by_modified(1);
    let first = engine.list(&request).unwrap().next_cursor.unwrap();

    clock.advance(chrono::Duration::minutes(61));
    let second = engine.list(&request).unwrap().next_cursor.unwrap();
    assert_ne!(
        snapshot_of(&engine, &request, &first),
        snapshot_of(&engine, &request, &second)
    );
}

#[test]
fn oversized_view_is_refused() {
    let config = SteadfastConfig::from_toml("[snapshot]\nmax_ids = 3\n").unwrap();
    let (_, engine, _) = setup(5, &config);
    let err = engine.list(&by_modified(2)).unwrap_err();
    assert!(matches!(
        err,
        PaginationError::Snapshot(SnapshotError::TooLarge { count: 5, max: 3 })
    ));
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}
