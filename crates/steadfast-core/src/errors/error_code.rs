//! SteadfastErrorCode trait for the structured error surface.

/// Every error enum implements this to expose a stable code string and a
/// retry classification to callers.
pub trait SteadfastErrorCode {
    /// Returns the stable error code string (e.g., "CONFLICT").
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry the identical request unchanged.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Returns the formatted error string: `[ERROR_CODE] message`.
    fn tagged_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

// Error code constants for the request surface.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const TOKEN_REUSE_MISMATCH: &str = "TOKEN_REUSE_MISMATCH";
pub const CONFLICT: &str = "CONFLICT";
pub const INVALID_UPDATE: &str = "INVALID_UPDATE";
pub const CURSOR_INVALID: &str = "CURSOR_INVALID";
pub const CURSOR_EXPIRED: &str = "CURSOR_EXPIRED";
pub const TIMEOUT: &str = "TIMEOUT";
pub const STORE_ERROR: &str = "STORE_ERROR";
pub const STORE_UNAVAILABLE: &str = "STORE_UNAVAILABLE";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
