use std::fmt;

use serde::{Deserialize, Serialize};

/// Uniqueness scope of an idempotency token: (user, resource, token).
///
/// Tokens are never compared globally, so two users (or two resources)
/// reusing the same token value never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey {
    pub user_id: String,
    pub resource_id: String,
    pub token: String,
}

impl ScopeKey {
    pub fn new(
        user_id: impl Into<String>,
        resource_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            resource_id: resource_id.into(),
            token: token.into(),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.resource_id, self.token)
    }
}
