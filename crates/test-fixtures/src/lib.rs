//! Test helpers shared across the Steadfast crates: fixture loading, an
//! instrumented revision store, and seeded collections on a manual clock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use steadfast_core::errors::StoreError;
use steadfast_core::models::ResourceRevision;
use steadfast_core::traits::{CasOutcome, ChangeSink, ManualClock, RevisionStore};
use steadfast_storage::{MemoryCollection, MemoryRevisionStore};

/// Directory holding the JSON fixtures of this crate.
pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// A manual clock starting at 2024-01-01T00:00:00Z.
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
    ))
}

/// Collection with records `c1..=cN`, one second apart, alternating
/// `team` between `odd` and `even`. The clock ends one second past `cN`.
pub fn seeded_collection(
    count: usize,
    clock: Arc<ManualClock>,
    sink: Option<Arc<dyn ChangeSink>>,
) -> MemoryCollection {
    let mut collection = MemoryCollection::new().with_clock(clock.clone());
    if let Some(sink) = sink {
        collection = collection.with_sink(sink);
    }
    for i in 1..=count {
        let team = if i % 2 == 0 { "even" } else { "odd" };
        collection.insert(&format!("c{i}"), json!({ "team": team, "rank": i }));
        clock.advance(chrono::Duration::seconds(1));
    }
    collection
}

/// `RevisionStore` wrapper that counts calls and can inject latency or
/// unavailability.
pub struct CountingStore {
    inner: MemoryRevisionStore,
    reads: AtomicUsize,
    cas_calls: AtomicUsize,
    cas_delay: Duration,
    unavailable: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::with_cas_delay(Duration::ZERO)
    }

    /// Every compare-and-set sleeps for `delay` first, widening race windows.
    pub fn with_cas_delay(delay: Duration) -> Self {
        Self {
            inner: MemoryRevisionStore::new(),
            reads: AtomicUsize::new(0),
            cas_calls: AtomicUsize::new(0),
            cas_delay: delay,
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryRevisionStore {
        &self.inner
    }

    /// Seed a resource by writing it `revision` times, ending at `payload`.
    pub fn seed(&self, resource_id: &str, revision: u64, payload: Value) {
        for _ in 1..revision {
            self.inner.force_write(resource_id, Value::Null);
        }
        self.inner.force_write(resource_id, payload);
    }

    pub fn cas_calls(&self) -> usize {
        self.cas_calls.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: "injected outage".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CountingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionStore for CountingStore {
    fn read(&self, resource_id: &str) -> Result<Option<ResourceRevision>, StoreError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(resource_id)
    }

    fn compare_and_set(
        &self,
        resource_id: &str,
        expected_revision: u64,
        new_payload: &Value,
    ) -> Result<CasOutcome, StoreError> {
        self.check_available()?;
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        if !self.cas_delay.is_zero() {
            std::thread::sleep(self.cas_delay);
        }
        self.inner
            .compare_and_set(resource_id, expected_revision, new_payload)
    }
}
