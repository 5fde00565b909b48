//! # steadfast-gateway
//!
//! The request surface of Steadfast. [`Gateway`] wires a revision store and a
//! record source to the mutation and pagination engines, counts outcomes in
//! [`GatewayMetrics`], renders failures as [`ErrorEnvelope`]s, and runs the
//! background [`EvictionWorker`].

pub mod envelope;
pub mod eviction;
pub mod gateway;
pub mod metrics;

pub use envelope::ErrorEnvelope;
pub use eviction::{EvictionWorker, SweepReport};
pub use gateway::{Gateway, GatewayBuilder};
pub use metrics::{GatewayMetrics, MetricsSnapshot};

// Request and response types callers need alongside the facade.
pub use steadfast_mutation::{MutateOutcome, MutateRequest, Update};
pub use steadfast_pagination::{ListEntry, ListPage, ListRequest, ListingStrategy};
