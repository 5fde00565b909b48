//! Descriptions of committed changes, used to decide whether a late update
//! commutes with what happened since the revision it was based on.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Kind of update that produced a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Replace,
    Merge,
    Increment,
    SetAdd,
    SetRemove,
}

/// Which top-level fields of the resource state an update touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchedFields {
    All,
    Fields(BTreeSet<String>),
}

impl TouchedFields {
    pub fn single(field: &str) -> Self {
        Self::Fields(BTreeSet::from([field.to_string()]))
    }

    pub fn overlaps(&self, other: &TouchedFields) -> bool {
        match (self, other) {
            (Self::All, _) | (_, Self::All) => true,
            (Self::Fields(a), Self::Fields(b)) => a.iter().any(|f| b.contains(f)),
        }
    }
}

/// Summary of one committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub kind: UpdateKind,
    pub touched: TouchedFields,
}

impl ChangeSummary {
    pub fn new(kind: UpdateKind, touched: TouchedFields) -> Self {
        Self { kind, touched }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_overlaps_everything() {
        let some = TouchedFields::single("count");
        assert!(TouchedFields::All.overlaps(&some));
        assert!(some.overlaps(&TouchedFields::All));
    }

    #[test]
    fn disjoint_fields_do_not_overlap() {
        let a = TouchedFields::single("count");
        let b = TouchedFields::Fields(BTreeSet::from(["tags".to_string(), "name".to_string()]));
        assert!(!a.overlaps(&b));
    }
}
