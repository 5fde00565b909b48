//! Observability for Steadfast.
//! `tracing` with `EnvFilter`, per-target log levels, structured events.

pub mod events;
pub mod setup;
pub mod spans;

pub use setup::{init_tracing, init_tracing_json};
