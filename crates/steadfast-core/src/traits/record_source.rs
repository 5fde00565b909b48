use crate::errors::StoreError;
use crate::models::{Filter, KeyPosition, Ordering, Record};

/// Read access to a listable, concurrently mutated collection.
pub trait RecordSource: Send + Sync {
    /// Up to `limit` matching records in listing order, strictly after
    /// `after` when given.
    fn scan(
        &self,
        filter: &Filter,
        ordering: &Ordering,
        after: Option<&KeyPosition>,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError>;

    /// Every matching record id in listing order, as of now.
    fn matching_ids(&self, filter: &Filter, ordering: &Ordering)
        -> Result<Vec<String>, StoreError>;

    /// Records for `ids`, in the given order. Ids that no longer exist are skipped.
    fn fetch(&self, ids: &[String]) -> Result<Vec<Record>, StoreError>;
}
