//! ConflictResolver: retry vs rebase vs conflict.
//!
//! Decision order on a revision mismatch:
//! 1. the journal shows the current revision was committed by this same
//!    request (scope key and fingerprint) → accepted, no re-execution;
//! 2. every revision since the expected one is journaled and commutes with
//!    the update → rebase onto the current state;
//! 3. otherwise → conflict.

use std::sync::Arc;

use serde_json::Value;

use steadfast_core::errors::MutationError;
use steadfast_core::models::{Fingerprint, MutationReceipt, ResolutionKind, ScopeKey};
use steadfast_core::tracing::events;
use steadfast_core::traits::{CasOutcome, Clock, RebaseStrategy, RevisionStore};

use crate::journal::{JournalEntry, RevisionJournal};

/// Outcome of resolving a revision mismatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The mismatch is this scope's own earlier success.
    Accepted(MutationReceipt),
    /// The update was reapplied on a newer revision and committed.
    Rebased { revision: u64, payload: Value },
    /// Not provably safe to merge; nothing was written.
    Conflict { expected: u64, actual: u64 },
}

pub struct ConflictResolver {
    store: Arc<dyn RevisionStore>,
    journal: Arc<RevisionJournal>,
    clock: Arc<dyn Clock>,
    max_rebase_attempts: u32,
}

impl ConflictResolver {
    pub fn new(
        store: Arc<dyn RevisionStore>,
        journal: Arc<RevisionJournal>,
        clock: Arc<dyn Clock>,
        max_rebase_attempts: u32,
    ) -> Self {
        Self {
            store,
            journal,
            clock,
            max_rebase_attempts: max_rebase_attempts.max(1),
        }
    }

    pub fn resolve<U: RebaseStrategy>(
        &self,
        expected: u64,
        actual: u64,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
        update: &U,
    ) -> Result<Resolution, MutationError> {
        let resource_id = scope.resource_id.as_str();

        if let Some(receipt) = self.already_applied(scope, fingerprint, actual)? {
            return Ok(Resolution::Accepted(receipt));
        }

        if expected > actual {
            events::conflict_detected(resource_id, expected, actual, "expected revision is ahead");
            return Ok(Resolution::Conflict { expected, actual });
        }

        let mut observed = actual;
        for _ in 0..self.max_rebase_attempts {
            let current = self.store.read_or_absent(resource_id)?;
            if current.revision_number < expected {
                events::conflict_detected(
                    resource_id,
                    expected,
                    current.revision_number,
                    "revision went backwards",
                );
                return Ok(Resolution::Conflict {
                    expected,
                    actual: current.revision_number,
                });
            }
            observed = current.revision_number;

            let Some(changes) =
                self.journal
                    .changes_between(resource_id, expected, current.revision_number)
            else {
                events::conflict_detected(resource_id, expected, observed, "unjournaled revisions");
                return Ok(Resolution::Conflict {
                    expected,
                    actual: observed,
                });
            };
            if !changes.iter().all(|c| update.commutes_with(&c.summary)) {
                events::conflict_detected(resource_id, expected, observed, "non-commuting update");
                return Ok(Resolution::Conflict {
                    expected,
                    actual: observed,
                });
            }

            let payload = update.apply(&current.payload)?;
            match self
                .store
                .compare_and_set(resource_id, current.revision_number, &payload)?
            {
                CasOutcome::Committed { revision } => {
                    self.journal.record(
                        resource_id,
                        JournalEntry {
                            revision,
                            summary: update.summary(),
                            scope: scope.clone(),
                            fingerprint: fingerprint.clone(),
                        },
                    );
                    events::mutation_rebased(resource_id, expected, current.revision_number, revision);
                    return Ok(Resolution::Rebased { revision, payload });
                }
                CasOutcome::StaleRevision { current } => observed = current,
            }
        }

        events::conflict_detected(resource_id, expected, observed, "rebase attempts exhausted");
        Ok(Resolution::Conflict {
            expected,
            actual: observed,
        })
    }

    /// Step 1: is `actual` this request's own committed write?
    ///
    /// While an attempt runs its idempotency slot is pending, so only the
    /// journal can answer. A token reused with different content after its
    /// record expired does not match and falls through to rebase or conflict.
    fn already_applied(
        &self,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
        actual: u64,
    ) -> Result<Option<MutationReceipt>, MutationError> {
        if !self
            .journal
            .committed_by(&scope.resource_id, actual, scope, fingerprint)
        {
            return Ok(None);
        }
        let current = self.store.read_or_absent(&scope.resource_id)?;
        if current.revision_number != actual {
            return Ok(None);
        }
        Ok(Some(MutationReceipt {
            resource_id: current.resource_id,
            revision: current.revision_number,
            state: current.payload,
            resolution: ResolutionKind::Applied,
            committed_at: self.clock.now(),
        }))
    }
}
