//! Errors raised while applying an update payload to a resource state.

use super::error_code::{self, SteadfastErrorCode};

/// An update could not be applied to the current resource state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error("resource state is not an object; field updates need an object")]
    NotAnObject,

    #[error("field {field} is not numeric")]
    NotNumeric { field: String },

    #[error("field {field} is not an array")]
    NotAnArray { field: String },

    #[error("increment of {field} overflows")]
    Overflow { field: String },

    #[error("update is empty: {reason}")]
    Empty { reason: String },
}

impl SteadfastErrorCode for UpdateError {
    fn error_code(&self) -> &'static str {
        error_code::INVALID_UPDATE
    }
}
