//! PaginationEngine: the List operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use steadfast_core::config::{PaginationConfig, SteadfastConfig, VolatileStrategy};
use steadfast_core::errors::{CursorError, PaginationError, SnapshotError, SteadfastErrorCode};
use steadfast_core::models::{ChangeKind, Filter, Fingerprint, KeyPosition, Ordering, Record};
use steadfast_core::tracing::events;
use steadfast_core::traits::{Clock, RecordSource};

use crate::changelog::ChangeLog;
use crate::cursor::{CursorCodec, CursorState, PositionMarker};
use crate::snapshot::SnapshotStore;

/// Input of a List call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub filter: Filter,
    #[serde(default = "default_ordering")]
    pub ordering: Ordering,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Overrides the configured strategy for volatile-key orderings.
    #[serde(default)]
    pub strategy: Option<VolatileStrategy>,
}

fn default_ordering() -> Ordering {
    Ordering::created_desc()
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            ordering: default_ordering(),
            cursor: None,
            limit: None,
            strategy: None,
        }
    }
}

impl ListRequest {
    pub fn new(filter: Filter, ordering: Ordering) -> Self {
        Self {
            filter,
            ordering,
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_strategy(mut self, strategy: VolatileStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// How a listing is iterated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStrategy {
    /// Live scan resuming strictly after the last-seen key.
    Keyset,
    /// Offset into a frozen id sequence.
    Snapshot,
    /// Walk of the change log.
    EventLog,
}

impl ListingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keyset => "keyset",
            Self::Snapshot => "snapshot",
            Self::EventLog => "event_log",
        }
    }
}

/// One item of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListEntry {
    Record(Record),
    /// Event-log entry. `record` is the current state for upserts and
    /// `None` for deletions. A record may be reported more than once.
    Changed {
        event_id: u64,
        record_id: String,
        changed_at: DateTime<Utc>,
        kind: ChangeKind,
        record: Option<Record>,
    },
}

impl ListEntry {
    pub fn record_id(&self) -> &str {
        match self {
            Self::Record(record) => &record.id,
            Self::Changed { record_id, .. } => record_id,
        }
    }
}

/// Output of a List call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub entries: Vec<ListEntry>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub strategy: ListingStrategy,
}

impl ListPage {
    pub fn record_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.record_id().to_string()).collect()
    }

    fn last(entries: Vec<ListEntry>, strategy: ListingStrategy) -> Self {
        Self {
            entries,
            next_cursor: None,
            has_more: false,
            strategy,
        }
    }
}

/// Serves listing pages over a [`RecordSource`].
pub struct PaginationEngine {
    source: Arc<dyn RecordSource>,
    codec: CursorCodec,
    snapshots: Arc<SnapshotStore>,
    changelog: Arc<ChangeLog>,
    clock: Arc<dyn Clock>,
    config: PaginationConfig,
}

impl PaginationEngine {
    /// `changelog` must be the sink the source reports its changes to.
    pub fn new(
        source: Arc<dyn RecordSource>,
        changelog: Arc<ChangeLog>,
        clock: Arc<dyn Clock>,
        config: &SteadfastConfig,
    ) -> Self {
        Self {
            source,
            codec: CursorCodec::new(&config.cursor, clock.clone()),
            snapshots: Arc::new(SnapshotStore::new(clock.clone(), &config.snapshot)),
            changelog,
            clock,
            config: config.pagination.clone(),
        }
    }

    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    pub fn changelog(&self) -> &Arc<ChangeLog> {
        &self.changelog
    }

    pub fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    /// Strategy a request will be served with.
    pub fn strategy_for(&self, request: &ListRequest) -> ListingStrategy {
        if request.ordering.field.is_stable() {
            return ListingStrategy::Keyset;
        }
        match request
            .strategy
            .unwrap_or_else(|| self.config.effective_volatile_strategy())
        {
            VolatileStrategy::Snapshot => ListingStrategy::Snapshot,
            VolatileStrategy::EventLog => ListingStrategy::EventLog,
        }
    }

    pub fn list(&self, request: &ListRequest) -> Result<ListPage, PaginationError> {
        let limit = self.effective_limit(request.limit)?;
        let strategy = self.strategy_for(request);
        let span = steadfast_core::list_span!(strategy.name(), limit);
        let _entered = span.enter();

        let fingerprint = request
            .filter
            .view_fingerprint(&request.ordering)
            .map_err(|e| validation("filter", e.to_string()))?;

        let cursor = match request.cursor {
            Some(ref token) => Some(self.codec.decode(token, &fingerprint).map_err(rejected)?),
            None => None,
        };

        match strategy {
            ListingStrategy::Keyset => self.list_keyset(request, &fingerprint, cursor, limit),
            ListingStrategy::Snapshot => self.list_snapshot(request, &fingerprint, cursor, limit),
            ListingStrategy::EventLog => self.list_event_log(request, &fingerprint, cursor, limit),
        }
    }

    fn effective_limit(&self, requested: Option<usize>) -> Result<usize, PaginationError> {
        match requested {
            Some(0) => Err(validation("limit", "must be greater than 0")),
            Some(n) => Ok(n.min(self.config.effective_max_limit())),
            None => Ok(self.config.effective_default_limit()),
        }
    }

    fn list_keyset(
        &self,
        request: &ListRequest,
        fingerprint: &Fingerprint,
        cursor: Option<CursorState>,
        limit: usize,
    ) -> Result<ListPage, PaginationError> {
        let after: Option<KeyPosition> = match cursor.map(|c| c.position) {
            None => None,
            Some(PositionMarker::After { position }) => Some(position),
            Some(_) => return Err(mismatch(ListingStrategy::Keyset)),
        };

        let mut records = self.source.scan(
            &request.filter,
            &request.ordering,
            after.as_ref(),
            limit.saturating_add(1),
        )?;
        let has_more = records.len() > limit;
        records.truncate(limit);

        let next_cursor = match records.last() {
            Some(last) if has_more => {
                let position = last.key_position(request.ordering.field);
                Some(self.issue(CursorState::new(
                    fingerprint.clone(),
                    PositionMarker::After { position },
                    self.clock.now(),
                ))?)
            }
            _ => None,
        };

        let entries = records.into_iter().map(ListEntry::Record).collect();
        Ok(ListPage {
            entries,
            has_more: next_cursor.is_some(),
            next_cursor,
            strategy: ListingStrategy::Keyset,
        })
    }

    fn list_snapshot(
        &self,
        request: &ListRequest,
        fingerprint: &Fingerprint,
        cursor: Option<CursorState>,
        limit: usize,
    ) -> Result<ListPage, PaginationError> {
        let (snapshot_id, offset) = match cursor {
            None => {
                let snapshot = self.snapshots.get_or_create(fingerprint, request.ordering, || {
                    self.source.matching_ids(&request.filter, &request.ordering)
                })?;
                (snapshot.snapshot_id.clone(), 0)
            }
            Some(CursorState {
                position: PositionMarker::Offset { offset },
                snapshot_id: Some(snapshot_id),
                ..
            }) => (snapshot_id, offset),
            Some(_) => return Err(mismatch(ListingStrategy::Snapshot)),
        };

        let offset = usize::try_from(offset)
            .map_err(|_| rejected(CursorError::malformed("offset out of range")))?;
        let (ids, total) = match self.snapshots.page(&snapshot_id, offset, limit) {
            Ok(page) => page,
            Err(SnapshotError::Expired { snapshot_id }) => {
                return Err(rejected(CursorError::expired(format!(
                    "snapshot {snapshot_id} is no longer available"
                ))))
            }
            Err(e) => return Err(e.into()),
        };

        let next_offset = offset + ids.len();
        let entries: Vec<ListEntry> = self
            .source
            .fetch(&ids)?
            .into_iter()
            .map(ListEntry::Record)
            .collect();

        if next_offset >= total {
            return Ok(ListPage::last(entries, ListingStrategy::Snapshot));
        }
        let state = CursorState::new(
            fingerprint.clone(),
            PositionMarker::Offset {
                offset: next_offset as u64,
            },
            self.clock.now(),
        )
        .with_snapshot(snapshot_id);
        Ok(ListPage {
            entries,
            next_cursor: Some(self.issue(state)?),
            has_more: true,
            strategy: ListingStrategy::Snapshot,
        })
    }

    fn list_event_log(
        &self,
        request: &ListRequest,
        fingerprint: &Fingerprint,
        cursor: Option<CursorState>,
        limit: usize,
    ) -> Result<ListPage, PaginationError> {
        let (mut position, lease_id) = match cursor {
            None => (0, None),
            Some(CursorState {
                position: PositionMarker::Event { after_event },
                lease_id,
                ..
            }) => (after_event, lease_id),
            Some(_) => return Err(mismatch(ListingStrategy::EventLog)),
        };
        if let Some(ref lease) = lease_id {
            if !self.changelog.lease_alive(lease) {
                return Err(rejected(CursorError::expired("change log lease has lapsed")));
            }
        }

        let mut entries = Vec::with_capacity(limit);
        while entries.len() < limit {
            let batch = self.changelog.read_after(position, limit - entries.len());
            if batch.is_empty() {
                break;
            }
            let upserted: Vec<String> = batch
                .iter()
                .filter(|e| e.kind == ChangeKind::Upserted)
                .map(|e| e.record_id.clone())
                .collect();
            let current = self.source.fetch(&upserted)?;

            for event in batch {
                position = event.event_id;
                let record = match event.kind {
                    ChangeKind::Deleted => None,
                    ChangeKind::Upserted => {
                        match current.iter().find(|r| r.id == event.record_id) {
                            Some(r) if request.filter.matches(r) => Some(r.clone()),
                            // Filtered out, or deleted since (a later event reports it).
                            _ => continue,
                        }
                    }
                };
                entries.push(ListEntry::Changed {
                    event_id: event.event_id,
                    record_id: event.record_id,
                    changed_at: event.changed_at,
                    kind: event.kind,
                    record,
                });
            }
        }

        if position >= self.changelog.head() {
            if let Some(ref lease) = lease_id {
                self.changelog.release(lease);
            }
            return Ok(ListPage::last(entries, ListingStrategy::EventLog));
        }

        let lease = match lease_id {
            Some(lease) if self.changelog.renew(&lease, position) => lease,
            _ => self.changelog.pin(position),
        };
        let state = CursorState::new(
            fingerprint.clone(),
            PositionMarker::Event {
                after_event: position,
            },
            self.clock.now(),
        )
        .with_lease(lease);
        Ok(ListPage {
            entries,
            next_cursor: Some(self.issue(state)?),
            has_more: true,
            strategy: ListingStrategy::EventLog,
        })
    }

    fn issue(&self, state: CursorState) -> Result<String, PaginationError> {
        Ok(self.codec.encode(&state)?)
    }
}

fn validation(field: &str, message: impl Into<String>) -> PaginationError {
    PaginationError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

fn rejected(err: CursorError) -> PaginationError {
    events::cursor_rejected(err.error_code(), &err.to_string());
    PaginationError::Cursor(err)
}

fn mismatch(strategy: ListingStrategy) -> PaginationError {
    rejected(CursorError::StrategyMismatch {
        strategy: strategy.name().to_string(),
    })
}
