//! Gateway facade and its builder.

use std::sync::Arc;

use steadfast_core::config::SteadfastConfig;
use steadfast_core::errors::GatewayError;
use steadfast_core::traits::{
    ChangeSink, Clock, Evictable, RebaseStrategy, RecordSource, RevisionStore, SystemClock,
};
use steadfast_mutation::{MutateOutcome, MutateRequest, MutationEngine};
use steadfast_pagination::{ChangeLog, ListPage, ListRequest, PaginationEngine};
use steadfast_storage::{MemoryCollection, MemoryRevisionStore, MirroredRevisionStore};

use crate::envelope::ErrorEnvelope;
use crate::eviction::{self, EvictionWorker, SweepReport};
use crate::metrics::GatewayMetrics;

/// Builder for [`Gateway`]. Anything not supplied falls back to an
/// in-memory reference collaborator and the system clock.
///
/// Without a record source, listings are served from a built-in collection
/// that mirrors every committed mutation.
pub struct GatewayBuilder {
    config: SteadfastConfig,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn RevisionStore>>,
    source: Option<(Arc<dyn RecordSource>, Arc<ChangeLog>)>,
}

impl GatewayBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn revision_store(mut self, store: Arc<dyn RevisionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Serve listings from `source`. It must report its changes to
    /// `changelog` for event-log listings to see them.
    pub fn record_source(
        mut self,
        source: Arc<dyn RecordSource>,
        changelog: Arc<ChangeLog>,
    ) -> Self {
        self.source = Some((source, changelog));
        self
    }

    pub fn build(self) -> Result<Gateway, GatewayError> {
        SteadfastConfig::validate(&self.config)?;
        let config = self.config;
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let store: Arc<dyn RevisionStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryRevisionStore::new()),
        };

        let (store, source, changelog, collection) = match self.source {
            Some((source, changelog)) => (store, source, changelog, None),
            None => {
                let changelog = Arc::new(ChangeLog::new(
                    clock.clone(),
                    &config.changelog,
                    &config.cursor,
                ));
                let sink: Arc<dyn ChangeSink> = changelog.clone();
                let collection = Arc::new(
                    MemoryCollection::new()
                        .with_clock(clock.clone())
                        .with_sink(sink),
                );
                let mirrored: Arc<dyn RevisionStore> =
                    Arc::new(MirroredRevisionStore::new(store, collection.clone()));
                let source: Arc<dyn RecordSource> = collection.clone();
                (mirrored, source, changelog, Some(collection))
            }
        };

        let mutation = MutationEngine::new(store, clock.clone(), &config);
        let pagination = PaginationEngine::new(source, changelog, clock.clone(), &config);
        let idempotency: Arc<dyn Evictable> = mutation.idempotency().clone();
        let snapshots: Arc<dyn Evictable> = pagination.snapshots().clone();
        let log: Arc<dyn Evictable> = pagination.changelog().clone();
        let targets = vec![idempotency, snapshots, log];

        tracing::info!(
            volatile_strategy = config.pagination.effective_volatile_strategy().name(),
            record_ttl_secs = config.idempotency.effective_record_ttl().as_secs(),
            "gateway ready"
        );

        Ok(Gateway {
            mutation,
            pagination,
            collection,
            metrics: Arc::new(GatewayMetrics::new()),
            clock,
            targets,
            config,
        })
    }
}

/// Entry point for Mutate and List.
pub struct Gateway {
    mutation: MutationEngine,
    pagination: PaginationEngine,
    collection: Option<Arc<MemoryCollection>>,
    metrics: Arc<GatewayMetrics>,
    clock: Arc<dyn Clock>,
    targets: Vec<Arc<dyn Evictable>>,
    config: SteadfastConfig,
}

impl Gateway {
    pub fn builder(config: SteadfastConfig) -> GatewayBuilder {
        GatewayBuilder {
            config,
            clock: None,
            store: None,
            source: None,
        }
    }

    /// Apply `request` at most once per (user, resource, token).
    pub fn mutate<U: RebaseStrategy>(
        &self,
        request: &MutateRequest<U>,
    ) -> Result<MutateOutcome, GatewayError> {
        let result = self.mutation.mutate(request);
        self.metrics.record_mutation(&result);
        Ok(result?)
    }

    pub fn list(&self, request: &ListRequest) -> Result<ListPage, GatewayError> {
        self.pagination.list(request).map_err(|e| {
            self.metrics.record_list_error(&e);
            GatewayError::from(e)
        })
    }

    pub fn mutate_envelope<U: RebaseStrategy>(
        &self,
        request: &MutateRequest<U>,
    ) -> Result<MutateOutcome, ErrorEnvelope> {
        self.mutate(request).map_err(ErrorEnvelope::from)
    }

    pub fn list_envelope(&self, request: &ListRequest) -> Result<ListPage, ErrorEnvelope> {
        self.list(request).map_err(ErrorEnvelope::from)
    }

    /// Start the background eviction thread at the configured interval.
    pub fn start_eviction(&self) -> std::io::Result<EvictionWorker> {
        EvictionWorker::spawn(
            self.targets.clone(),
            self.clock.clone(),
            self.metrics.clone(),
            self.config.eviction.effective_interval(),
        )
    }

    /// Run one eviction sweep on the calling thread.
    pub fn evict_now(&self) -> SweepReport {
        eviction::sweep_once(&self.targets, self.clock.as_ref(), &self.metrics)
    }

    /// The built-in collection, when no record source was supplied.
    pub fn collection(&self) -> Option<&Arc<MemoryCollection>> {
        self.collection.as_ref()
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SteadfastConfig {
        &self.config
    }

    pub fn mutation_engine(&self) -> &MutationEngine {
        &self.mutation
    }

    pub fn pagination_engine(&self) -> &PaginationEngine {
        &self.pagination
    }
}
