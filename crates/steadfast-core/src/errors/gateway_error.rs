//! Aggregate error for the gateway surface.

use super::error_code::SteadfastErrorCode;
use super::{ConfigError, MutationError, PaginationError};

/// Errors returned by the gateway facade.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Mutation(#[from] MutationError),

    #[error("{0}")]
    Pagination(#[from] PaginationError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SteadfastErrorCode for GatewayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Mutation(e) => e.error_code(),
            Self::Pagination(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Mutation(e) => e.is_retryable(),
            Self::Pagination(e) => e.is_retryable(),
            Self::Config(_) => false,
        }
    }
}
