//! Errors surfaced by the List operation.

use super::error_code::{self, SteadfastErrorCode};
use super::{CursorError, SnapshotError, StoreError};

/// Errors that can occur while serving a listing page.
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("cursor rejected: {0}")]
    Cursor(#[from] CursorError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SteadfastErrorCode for PaginationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => error_code::VALIDATION_ERROR,
            Self::Cursor(e) => e.error_code(),
            Self::Snapshot(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Snapshot(e) => e.is_retryable(),
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
