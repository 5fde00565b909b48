//! Errors raised by external collaborators (revision store, record source).

use super::error_code::{self, SteadfastErrorCode};

/// Storage-layer errors reported by a `RevisionStore` or `RecordSource`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {message}")]
    Backend { message: String },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("corrupt payload for {resource_id}: {message}")]
    CorruptPayload {
        resource_id: String,
        message: String,
    },
}

impl SteadfastErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => error_code::STORE_UNAVAILABLE,
            _ => error_code::STORE_ERROR,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
