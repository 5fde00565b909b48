//! Cursor decode failures.

use super::error_code::{self, SteadfastErrorCode};

/// Why a presented cursor could not be used.
///
/// Every variant except `Expired` maps to `CURSOR_INVALID`; in all cases the
/// caller must restart pagination from a first-page request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("cursor is malformed: {reason}")]
    Malformed { reason: String },

    #[error("cursor integrity check failed")]
    TagMismatch,

    #[error("cursor format version {version} is not supported")]
    UnsupportedVersion { version: u8 },

    #[error("cursor was issued for different filter parameters")]
    FilterMismatch,

    #[error("cursor position does not fit the {strategy} listing strategy")]
    StrategyMismatch { strategy: String },

    #[error("cursor expired: {reason}")]
    Expired { reason: String },
}

impl CursorError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub fn expired(reason: impl Into<String>) -> Self {
        Self::Expired {
            reason: reason.into(),
        }
    }
}

impl SteadfastErrorCode for CursorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Expired { .. } => error_code::CURSOR_EXPIRED,
            _ => error_code::CURSOR_INVALID,
        }
    }
}
