//! MutationEngine: the Mutate operation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use steadfast_core::config::SteadfastConfig;
use steadfast_core::constants::MAX_TOKEN_LEN;
use steadfast_core::errors::MutationError;
use steadfast_core::models::{Fingerprint, MutationReceipt, ResolutionKind, ScopeKey};
use steadfast_core::tracing::events;
use steadfast_core::traits::{CasOutcome, Clock, RebaseStrategy, RevisionStore};

use crate::conflict::{ConflictResolver, Resolution};
use crate::idempotency::{Admission, IdempotencyStore};
use crate::journal::{JournalEntry, RevisionJournal};
use crate::update::Update;

/// Input of a Mutate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutateRequest<U = Update> {
    pub user_id: String,
    pub resource_id: String,
    pub idempotency_token: String,
    /// Revision the client based its update on. `None` is an unconditional
    /// write; `Some(0)` means "create, must not exist yet".
    #[serde(default)]
    pub expected_revision: Option<u64>,
    pub update: U,
}

impl<U: RebaseStrategy> MutateRequest<U> {
    pub fn new(
        user_id: impl Into<String>,
        resource_id: impl Into<String>,
        idempotency_token: impl Into<String>,
        expected_revision: Option<u64>,
        update: U,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            resource_id: resource_id.into(),
            idempotency_token: idempotency_token.into(),
            expected_revision,
            update,
        }
    }

    pub fn scope_key(&self) -> ScopeKey {
        ScopeKey::new(&self.user_id, &self.resource_id, &self.idempotency_token)
    }

    /// Fingerprint of the request content that must match across retries:
    /// the expected revision and the update. Identity fields are already in
    /// the scope key.
    pub fn fingerprint(&self) -> Result<Fingerprint, MutationError> {
        #[derive(Serialize)]
        struct Content<'a, U> {
            expected_revision: Option<u64>,
            update: &'a U,
        }

        Fingerprint::of(&Content {
            expected_revision: self.expected_revision,
            update: &self.update,
        })
        .map_err(|e| MutationError::validation("update", e.to_string()))
    }

    fn validate(&self) -> Result<(), MutationError> {
        let required = [
            ("user_id", &self.user_id),
            ("resource_id", &self.resource_id),
            ("idempotency_token", &self.idempotency_token),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(MutationError::validation(field, "must not be empty"));
            }
        }
        if self.idempotency_token.len() > MAX_TOKEN_LEN {
            return Err(MutationError::validation(
                "idempotency_token",
                format!("must be at most {MAX_TOKEN_LEN} bytes"),
            ));
        }
        Ok(())
    }
}

/// Result of a successful Mutate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutateOutcome {
    pub receipt: MutationReceipt,
    /// True when the receipt was replayed from a prior identical attempt.
    pub replayed: bool,
}

/// Executes mutations exactly once per scope key.
pub struct MutationEngine {
    store: Arc<dyn RevisionStore>,
    idempotency: Arc<IdempotencyStore>,
    journal: Arc<RevisionJournal>,
    resolver: ConflictResolver,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl MutationEngine {
    pub fn new(
        store: Arc<dyn RevisionStore>,
        clock: Arc<dyn Clock>,
        config: &SteadfastConfig,
    ) -> Self {
        let idempotency = Arc::new(IdempotencyStore::new(clock.clone(), &config.idempotency));
        let journal = Arc::new(RevisionJournal::new(config.conflict.effective_journal_depth()));
        let max_attempts = config.conflict.effective_max_rebase_attempts().max(1);
        let resolver = ConflictResolver::new(
            store.clone(),
            journal.clone(),
            clock.clone(),
            max_attempts,
        );
        Self {
            store,
            idempotency,
            journal,
            resolver,
            clock,
            max_attempts,
        }
    }

    pub fn idempotency(&self) -> &Arc<IdempotencyStore> {
        &self.idempotency
    }

    pub fn journal(&self) -> &Arc<RevisionJournal> {
        &self.journal
    }

    pub fn mutate<U: RebaseStrategy>(
        &self,
        request: &MutateRequest<U>,
    ) -> Result<MutateOutcome, MutationError> {
        request.validate()?;
        let scope = request.scope_key();
        let span = steadfast_core::mutation_span!(scope);
        let _entered = span.enter();

        let fingerprint = request.fingerprint()?;
        let admission = match self.idempotency.record_or_fetch(&scope, &fingerprint) {
            Ok(admission) => admission,
            Err(err) => {
                if let MutationError::Timeout { waited_ms, .. } = &err {
                    events::mutation_wait_timeout(&scope, *waited_ms);
                }
                return Err(err);
            }
        };

        match admission {
            Admission::DuplicateSame(record) => {
                events::mutation_replayed(&scope, record.resulting_revision);
                Ok(MutateOutcome {
                    receipt: record.response_snapshot,
                    replayed: true,
                })
            }
            Admission::DuplicateConflict => {
                events::token_reuse_detected(&scope);
                Err(MutationError::TokenReuseMismatch {
                    token: scope.token.clone(),
                    resource_id: scope.resource_id.clone(),
                })
            }
            Admission::Fresh(pending) => {
                // An error drops `pending`, which abandons the slot.
                let receipt = self.execute(&scope, &fingerprint, request)?;
                events::mutation_applied(&scope, receipt.revision);
                pending.complete(receipt.clone());
                Ok(MutateOutcome {
                    receipt,
                    replayed: false,
                })
            }
        }
    }

    fn execute<U: RebaseStrategy>(
        &self,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
        request: &MutateRequest<U>,
    ) -> Result<MutationReceipt, MutationError> {
        match request.expected_revision {
            Some(expected) => {
                self.execute_conditional(scope, fingerprint, expected, &request.update)
            }
            None => self.execute_unconditional(scope, fingerprint, &request.update),
        }
    }

    fn execute_conditional<U: RebaseStrategy>(
        &self,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
        expected: u64,
        update: &U,
    ) -> Result<MutationReceipt, MutationError> {
        let current = self.store.read_or_absent(&scope.resource_id)?;
        if current.revision_number != expected {
            return self.settle(scope, fingerprint, expected, current.revision_number, update);
        }

        let payload = update.apply(&current.payload)?;
        match self
            .store
            .compare_and_set(&scope.resource_id, expected, &payload)?
        {
            CasOutcome::Committed { revision } => Ok(self.committed(
                scope,
                fingerprint,
                revision,
                payload,
                update,
                ResolutionKind::Applied,
            )),
            CasOutcome::StaleRevision { current } => {
                self.settle(scope, fingerprint, expected, current, update)
            }
        }
    }

    /// Last writer wins, with a bounded number of CAS races.
    fn execute_unconditional<U: RebaseStrategy>(
        &self,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
        update: &U,
    ) -> Result<MutationReceipt, MutationError> {
        let mut based_on = 0;
        let mut latest = 0;
        for _ in 0..self.max_attempts {
            let current = self.store.read_or_absent(&scope.resource_id)?;
            based_on = current.revision_number;
            let payload = update.apply(&current.payload)?;
            match self
                .store
                .compare_and_set(&scope.resource_id, based_on, &payload)?
            {
                CasOutcome::Committed { revision } => {
                    return Ok(self.committed(
                        scope,
                        fingerprint,
                        revision,
                        payload,
                        update,
                        ResolutionKind::Applied,
                    ))
                }
                CasOutcome::StaleRevision { current } => latest = current,
            }
        }
        events::conflict_detected(&scope.resource_id, based_on, latest, "write contention");
        Err(MutationError::Conflict {
            resource_id: scope.resource_id.clone(),
            expected_revision: based_on,
            actual_revision: latest,
        })
    }

    fn settle<U: RebaseStrategy>(
        &self,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
        expected: u64,
        actual: u64,
        update: &U,
    ) -> Result<MutationReceipt, MutationError> {
        match self
            .resolver
            .resolve(expected, actual, scope, fingerprint, update)?
        {
            Resolution::Accepted(receipt) => Ok(receipt),
            Resolution::Rebased { revision, payload } => Ok(MutationReceipt {
                resource_id: scope.resource_id.clone(),
                revision,
                state: payload,
                resolution: ResolutionKind::Rebased,
                committed_at: self.clock.now(),
            }),
            Resolution::Conflict { expected, actual } => Err(MutationError::Conflict {
                resource_id: scope.resource_id.clone(),
                expected_revision: expected,
                actual_revision: actual,
            }),
        }
    }

    fn committed<U: RebaseStrategy>(
        &self,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
        revision: u64,
        payload: serde_json::Value,
        update: &U,
        resolution: ResolutionKind,
    ) -> MutationReceipt {
        self.journal.record(
            &scope.resource_id,
            JournalEntry {
                revision,
                summary: update.summary(),
                scope: scope.clone(),
                fingerprint: fingerprint.clone(),
            },
        );
        MutationReceipt {
            resource_id: scope.resource_id.clone(),
            revision,
            state: payload,
            resolution,
            committed_at: self.clock.now(),
        }
    }
}
