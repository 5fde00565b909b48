//! # steadfast-core
//!
//! Foundation crate for the Steadfast gateway.
//! Defines the models, errors, config, collaborator traits, and sync primitives
//! shared by the mutation and pagination engines.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod sync;
pub mod tracing;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::SteadfastConfig;
pub use errors::{GatewayError, SteadfastErrorCode};
pub use models::{Fingerprint, ResourceRevision, ScopeKey};
