//! Bounded per-resource history of the revisions this gateway committed.

use std::collections::VecDeque;

use dashmap::DashMap;

use steadfast_core::models::{ChangeSummary, Fingerprint, ScopeKey};

/// What produced one committed revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub revision: u64,
    pub summary: ChangeSummary,
    pub scope: ScopeKey,
    /// Fingerprint of the request that committed this revision.
    pub fingerprint: Fingerprint,
}

/// Revision history keyed by resource id, newest at the back.
///
/// Only writes that went through the gateway are recorded, so a revision
/// missing from the journal means "unknown writer" and blocks any rebase
/// across it.
pub struct RevisionJournal {
    entries: DashMap<String, VecDeque<JournalEntry>>,
    depth: usize,
}

impl RevisionJournal {
    pub fn new(depth: usize) -> Self {
        Self {
            entries: DashMap::new(),
            depth: depth.max(1),
        }
    }

    /// Record a committed revision. Concurrent commits may report out of
    /// order, so the entry is inserted at its sorted position.
    pub fn record(&self, resource_id: &str, entry: JournalEntry) {
        let mut history = self.entries.entry(resource_id.to_string()).or_default();
        let at = history
            .iter()
            .rposition(|e| e.revision < entry.revision)
            .map_or(0, |i| i + 1);
        if history.get(at).is_some_and(|e| e.revision == entry.revision) {
            return;
        }
        history.insert(at, entry);
        while history.len() > self.depth {
            history.pop_front();
        }
    }

    /// Every entry with `from_exclusive < revision <= to_inclusive`, in
    /// order, or `None` if any revision in that range is unaccounted for.
    pub fn changes_between(
        &self,
        resource_id: &str,
        from_exclusive: u64,
        to_inclusive: u64,
    ) -> Option<Vec<JournalEntry>> {
        if to_inclusive <= from_exclusive {
            return Some(Vec::new());
        }
        let history = self.entries.get(resource_id)?;
        let changes: Vec<JournalEntry> = history
            .iter()
            .filter(|e| e.revision > from_exclusive && e.revision <= to_inclusive)
            .cloned()
            .collect();
        let expected = (to_inclusive - from_exclusive) as usize;
        (changes.len() == expected).then_some(changes)
    }

    /// True when `revision` was committed by this exact request: same scope
    /// key and same request fingerprint.
    pub fn committed_by(
        &self,
        resource_id: &str,
        revision: u64,
        scope: &ScopeKey,
        fingerprint: &Fingerprint,
    ) -> bool {
        self.entries.get(resource_id).is_some_and(|history| {
            history
                .iter()
                .rev()
                .find(|e| e.revision == revision)
                .is_some_and(|e| e.scope == *scope && e.fingerprint == *fingerprint)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steadfast_core::models::{TouchedFields, UpdateKind};

    fn entry(revision: u64) -> JournalEntry {
        JournalEntry {
            revision,
            summary: ChangeSummary::new(UpdateKind::Increment, TouchedFields::single("n")),
            scope: ScopeKey::new("u", "r", format!("t{revision}")),
            fingerprint: Fingerprint::from_hex(format!("f{revision}")),
        }
    }

    #[test]
    fn gap_makes_range_unprovable() {
        let journal = RevisionJournal::new(8);
        journal.record("r", entry(1));
        journal.record("r", entry(3));
        assert!(journal.changes_between("r", 0, 1).is_some());
        assert!(journal.changes_between("r", 0, 3).is_none());
        assert_eq!(journal.changes_between("r", 2, 2), Some(Vec::new()));
    }

    #[test]
    fn out_of_order_records_are_sorted() {
        let journal = RevisionJournal::new(8);
        journal.record("r", entry(2));
        journal.record("r", entry(1));
        journal.record("r", entry(3));
        let revisions: Vec<u64> = journal
            .changes_between("r", 0, 3)
            .unwrap()
            .iter()
            .map(|e| e.revision)
            .collect();
        assert_eq!(revisions, [1, 2, 3]);
    }

    #[test]
    fn depth_bounds_history() {
        let journal = RevisionJournal::new(2);
        for rev in 1..=4 {
            journal.record("r", entry(rev));
        }
        assert!(journal.changes_between("r", 2, 4).is_some());
        assert!(journal.changes_between("r", 1, 4).is_none());
        let scope = ScopeKey::new("u", "r", "t4");
        assert!(journal.committed_by("r", 4, &scope, &Fingerprint::from_hex("f4")));
        assert!(!journal.committed_by("r", 1, &ScopeKey::new("u", "r", "t1"), &Fingerprint::from_hex("f1")));
    }

    #[test]
    fn same_token_with_other_content_is_not_the_committer() {
        let journal = RevisionJournal::new(8);
        journal.record("r", entry(1));
        let scope = ScopeKey::new("u", "r", "t1");
        assert!(journal.committed_by("r", 1, &scope, &Fingerprint::from_hex("f1")));
        assert!(!journal.committed_by("r", 1, &scope, &Fingerprint::from_hex("other")));
    }
}
