//! Snapshot store errors.

use super::error_code::{self, SteadfastErrorCode};
use super::StoreError;

/// Errors raised by the snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot was evicted (idle TTL or explicit invalidation).
    #[error("snapshot {snapshot_id} has expired")]
    Expired { snapshot_id: String },

    /// A concurrent materialization of the same view did not finish in time.
    #[error("snapshot materialization timed out after {waited_ms}ms")]
    CreationTimeout { waited_ms: u64 },

    /// The concurrent materialization this request waited on failed.
    #[error("snapshot materialization failed: {reason}")]
    CreationFailed { reason: String },

    #[error("view has {count} records, above the snapshot limit of {max}")]
    TooLarge { count: usize, max: usize },

    #[error("store error during materialization: {0}")]
    Store(#[from] StoreError),
}

impl SteadfastErrorCode for SnapshotError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Expired { .. } => error_code::CURSOR_EXPIRED,
            Self::CreationTimeout { .. } => error_code::TIMEOUT,
            Self::CreationFailed { .. } => error_code::STORE_UNAVAILABLE,
            Self::TooLarge { .. } => error_code::VALIDATION_ERROR,
            Self::Store(e) => e.error_code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::CreationTimeout { .. } | Self::CreationFailed { .. } => true,
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
