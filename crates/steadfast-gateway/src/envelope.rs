//! ErrorEnvelope: the stable, structured shape every failure is reported in.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use steadfast_core::errors::{
    CursorError, GatewayError, MutationError, PaginationError, SnapshotError, SteadfastErrorCode,
};

/// Serializable error report handed to callers.
///
/// `code` is one of the stable constants in
/// [`steadfast_core::errors::error_code`]; `details` carries the fields a
/// caller needs to act on the error (revisions for conflicts, the wait for
/// timeouts) and is `null` when there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl From<&GatewayError> for ErrorEnvelope {
    fn from(err: &GatewayError) -> Self {
        let details = match err {
            GatewayError::Mutation(e) => mutation_details(e),
            GatewayError::Pagination(e) => pagination_details(e),
            GatewayError::Config(_) => Value::Null,
        };
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            details,
        }
    }
}

impl From<GatewayError> for ErrorEnvelope {
    fn from(err: GatewayError) -> Self {
        Self::from(&err)
    }
}

fn mutation_details(err: &MutationError) -> Value {
    match err {
        MutationError::Validation { field, .. } => json!({ "field": field }),
        MutationError::TokenReuseMismatch { token, resource_id } => {
            json!({ "resource_id": resource_id, "idempotency_token": token })
        }
        MutationError::Conflict {
            resource_id,
            expected_revision,
            actual_revision,
        } => json!({
            "resource_id": resource_id,
            "expected_revision": expected_revision,
            "actual_revision": actual_revision,
        }),
        MutationError::Timeout {
            resource_id,
            waited_ms,
        } => json!({ "resource_id": resource_id, "waited_ms": waited_ms }),
        MutationError::InvalidUpdate(_) | MutationError::Store(_) => Value::Null,
    }
}

fn pagination_details(err: &PaginationError) -> Value {
    match err {
        PaginationError::Validation { field, .. } => json!({ "field": field }),
        PaginationError::Cursor(CursorError::StrategyMismatch { strategy }) => {
            json!({ "strategy": strategy })
        }
        PaginationError::Cursor(CursorError::UnsupportedVersion { version }) => {
            json!({ "version": version })
        }
        PaginationError::Snapshot(SnapshotError::TooLarge { count, max }) => {
            json!({ "count": count, "max": max })
        }
        PaginationError::Snapshot(SnapshotError::CreationTimeout { waited_ms }) => {
            json!({ "waited_ms": waited_ms })
        }
        _ => Value::Null,
    }
}
