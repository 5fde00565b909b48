//! In-memory listable collection that reports every change to a sink.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use steadfast_core::errors::StoreError;
use steadfast_core::models::{ChangeKind, Filter, KeyPosition, Ordering, Record};
use steadfast_core::traits::{ChangeSink, Clock, RecordSource, SystemClock};

/// Records keyed by id behind a `RwLock`.
///
/// The change sink is notified while the write lock is held, so the order
/// of events matches the order writes became visible.
pub struct MemoryCollection {
    records: RwLock<BTreeMap<String, Record>>,
    sink: Option<Arc<dyn ChangeSink>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            sink: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Insert (or overwrite) a record stamped with the current clock.
    pub fn insert(&self, id: &str, attributes: Value) -> Record {
        let now = self.clock.now();
        self.insert_record(Record {
            id: id.to_string(),
            created_at: now,
            modified_at: now,
            attributes,
        })
    }

    /// Insert a fully formed record, keeping its timestamps.
    pub fn insert_record(&self, record: Record) -> Record {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.id.clone(), record.clone());
        self.notify(&record.id, ChangeKind::Upserted, record.modified_at);
        record
    }

    /// Replace a record's attributes and bump `modified_at`.
    /// Returns `None` if the record does not exist.
    pub fn modify(&self, id: &str, attributes: Value) -> Option<Record> {
        let now = self.clock.now();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.get_mut(id)?;
        record.attributes = attributes;
        record.modified_at = now;
        let updated = record.clone();
        self.notify(id, ChangeKind::Upserted, now);
        Some(updated)
    }

    /// Create the record stamped now, or replace its attributes and bump
    /// `modified_at` if it exists. One write lock covers both cases.
    pub fn upsert(&self, id: &str, attributes: Value) -> Record {
        let now = self.clock.now();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .entry(id.to_string())
            .and_modify(|r| {
                r.attributes = attributes.clone();
                r.modified_at = now;
            })
            .or_insert_with(|| Record {
                id: id.to_string(),
                created_at: now,
                modified_at: now,
                attributes,
            })
            .clone();
        self.notify(id, ChangeKind::Upserted, now);
        record
    }

    /// Bump `modified_at` without touching attributes.
    pub fn touch(&self, id: &str) -> Option<Record> {
        let attributes = self.get_record(id)?.attributes;
        self.modify(id, attributes)
    }

    pub fn delete(&self, id: &str) -> bool {
        let now = self.clock.now();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.remove(id).is_none() {
            return false;
        }
        self.notify(id, ChangeKind::Deleted, now);
        true
    }

    pub fn get_record(&self, id: &str) -> Option<Record> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self, id: &str, kind: ChangeKind, at: chrono::DateTime<chrono::Utc>) {
        if let Some(ref sink) = self.sink {
            sink.record_change(id, kind, at);
        }
    }

    fn sorted_matches(&self, filter: &Filter, ordering: &Ordering) -> Vec<Record> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<Record> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| ordering.compare_records(a, b));
        matched
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSource for MemoryCollection {
    fn scan(
        &self,
        filter: &Filter,
        ordering: &Ordering,
        after: Option<&KeyPosition>,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .sorted_matches(filter, ordering)
            .into_iter()
            .filter(|r| match after {
                Some(marker) => ordering.is_after(&r.key_position(ordering.field), marker),
                None => true,
            })
            .take(limit)
            .collect())
    }

    fn matching_ids(
        &self,
        filter: &Filter,
        ordering: &Ordering,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .sorted_matches(filter, ordering)
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    fn fetch(&self, ids: &[String]) -> Result<Vec<Record>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }
}
