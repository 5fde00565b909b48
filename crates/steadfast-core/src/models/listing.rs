//! Records, filters, and orderings for paginated listings.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Fingerprint;

/// A listable record held by the external data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Value,
}

impl Record {
    pub fn sort_value(&self, field: SortField) -> SortValue {
        match field {
            SortField::CreatedAt => SortValue::Timestamp(self.created_at.timestamp_micros()),
            SortField::ModifiedAt => SortValue::Timestamp(self.modified_at.timestamp_micros()),
            SortField::Id => SortValue::Text(self.id.clone()),
        }
    }

    /// Keyset position of this record under `field`; the id breaks ties.
    pub fn key_position(&self, field: SortField) -> KeyPosition {
        KeyPosition {
            value: self.sort_value(field),
            id: self.id.clone(),
        }
    }
}

/// Field a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    ModifiedAt,
    Id,
}

impl SortField {
    /// Stable keys never change once a record exists, so a value marker is
    /// enough to resume iteration. `modified_at` moves on every write.
    pub fn is_stable(&self) -> bool {
        !matches!(self, Self::ModifiedAt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort specification of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ordering {
    pub field: SortField,
    pub direction: Direction,
}

impl Ordering {
    pub fn new(field: SortField, direction: Direction) -> Self {
        Self { field, direction }
    }

    pub fn created_desc() -> Self {
        Self::new(SortField::CreatedAt, Direction::Desc)
    }

    pub fn created_asc() -> Self {
        Self::new(SortField::CreatedAt, Direction::Asc)
    }

    pub fn modified_desc() -> Self {
        Self::new(SortField::ModifiedAt, Direction::Desc)
    }

    /// Compare two positions in listing order.
    pub fn compare(&self, a: &KeyPosition, b: &KeyPosition) -> CmpOrdering {
        let natural = a.value.cmp(&b.value).then_with(|| a.id.cmp(&b.id));
        match self.direction {
            Direction::Asc => natural,
            Direction::Desc => natural.reverse(),
        }
    }

    /// Compare two records in listing order.
    pub fn compare_records(&self, a: &Record, b: &Record) -> CmpOrdering {
        self.compare(&a.key_position(self.field), &b.key_position(self.field))
    }

    /// True when `position` comes strictly after `marker` in listing order.
    pub fn is_after(&self, position: &KeyPosition, marker: &KeyPosition) -> bool {
        self.compare(position, marker) == CmpOrdering::Greater
    }
}

/// Sort key value. A given field always produces the same variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortValue {
    Timestamp(i64),
    Text(String),
}

/// Keyset marker: last-seen sort value plus id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPosition {
    pub value: SortValue,
    pub id: String,
}

/// Record filter: attribute equality plus an optional id prefix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub equals: BTreeMap<String, Value>,
    pub id_prefix: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `attributes[field] == value`.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty() && self.id_prefix.is_none()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(ref prefix) = self.id_prefix {
            if !record.id.starts_with(prefix.as_str()) {
                return false;
            }
        }
        self.equals
            .iter()
            .all(|(field, expected)| record.attributes.get(field) == Some(expected))
    }

    /// Fingerprint of the request parameters a cursor is bound to:
    /// this filter plus the ordering. Page size is not part of it.
    pub fn view_fingerprint(&self, ordering: &Ordering) -> Result<Fingerprint, serde_json::Error> {
        Fingerprint::of(&json!({ "filter": self, "ordering": ordering }))
    }
}
