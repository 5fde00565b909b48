use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Fingerprint, ScopeKey};

/// How a mutation reached its committed revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    /// Applied directly on the revision the client expected.
    Applied,
    /// Reapplied on a newer revision because the update commutes with what
    /// happened in between.
    Rebased,
}

/// The response snapshot of a successful mutation.
///
/// Stored verbatim in the idempotency record and replayed to every retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationReceipt {
    pub resource_id: String,
    pub revision: u64,
    pub state: Value,
    pub resolution: ResolutionKind,
    pub committed_at: DateTime<Utc>,
}

/// Persisted outcome of a completed mutation attempt.
///
/// Never mutated after creation; destroyed by TTL eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub scope_key: ScopeKey,
    pub request_fingerprint: Fingerprint,
    pub resulting_revision: u64,
    pub response_snapshot: MutationReceipt,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
