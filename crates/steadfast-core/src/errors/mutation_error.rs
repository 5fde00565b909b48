//! Errors surfaced by the Mutate operation.

use super::error_code::{self, SteadfastErrorCode};
use super::{StoreError, UpdateError};

/// Errors that can occur while executing a mutation request.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// Malformed input, rejected before the idempotency store is touched.
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// The idempotency token was already used for a different request.
    #[error("idempotency token {token} reused for a different request on {resource_id}")]
    TokenReuseMismatch { token: String, resource_id: String },

    /// Revision mismatch the resolver could not rebase.
    #[error("conflict on {resource_id}: expected revision {expected_revision}, found {actual_revision}")]
    Conflict {
        resource_id: String,
        expected_revision: u64,
        actual_revision: u64,
    },

    /// Waiting on a concurrent attempt with the same scope exceeded its bound.
    #[error("timed out after {waited_ms}ms waiting for a concurrent attempt on {resource_id}")]
    Timeout { resource_id: String, waited_ms: u64 },

    #[error("invalid update: {0}")]
    InvalidUpdate(#[from] UpdateError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl MutationError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl SteadfastErrorCode for MutationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => error_code::VALIDATION_ERROR,
            Self::TokenReuseMismatch { .. } => error_code::TOKEN_REUSE_MISMATCH,
            Self::Conflict { .. } => error_code::CONFLICT,
            Self::Timeout { .. } => error_code::TIMEOUT,
            Self::InvalidUpdate(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
