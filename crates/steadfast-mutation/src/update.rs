//! Update payloads and their rebase rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use steadfast_core::errors::UpdateError;
use steadfast_core::models::{ChangeSummary, TouchedFields, UpdateKind};
use steadfast_core::traits::RebaseStrategy;

/// A mutation to apply to a resource's JSON state.
///
/// Field-level variants treat the state as an object; a never-written
/// resource (`null`) starts as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Update {
    /// Overwrite the whole state.
    Replace { value: Value },
    /// Shallow patch: each field is set, a `null` value removes the field.
    Merge { fields: Map<String, Value> },
    /// Add `by` to an integer field; a missing field counts as 0.
    Increment { field: String, by: i64 },
    /// Insert members into an array field treated as a set.
    AddToSet { field: String, members: Vec<Value> },
    /// Remove members from an array field treated as a set.
    RemoveFromSet { field: String, members: Vec<Value> },
}

impl Update {
    pub fn replace(value: Value) -> Self {
        Self::Replace { value }
    }

    pub fn increment(field: impl Into<String>, by: i64) -> Self {
        Self::Increment {
            field: field.into(),
            by,
        }
    }

    pub fn add_to_set(field: impl Into<String>, members: Vec<Value>) -> Self {
        Self::AddToSet {
            field: field.into(),
            members,
        }
    }

    pub fn remove_from_set(field: impl Into<String>, members: Vec<Value>) -> Self {
        Self::RemoveFromSet {
            field: field.into(),
            members,
        }
    }

    /// Build a merge from `(field, value)` pairs.
    pub fn merge<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Merge {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    fn kind(&self) -> UpdateKind {
        match self {
            Self::Replace { .. } => UpdateKind::Replace,
            Self::Merge { .. } => UpdateKind::Merge,
            Self::Increment { .. } => UpdateKind::Increment,
            Self::AddToSet { .. } => UpdateKind::SetAdd,
            Self::RemoveFromSet { .. } => UpdateKind::SetRemove,
        }
    }
}

impl RebaseStrategy for Update {
    fn apply(&self, base: &Value) -> Result<Value, UpdateError> {
        let mut state = match self {
            Self::Replace { value } => return Ok(value.clone()),
            _ => as_object(base)?,
        };
        match self {
            Self::Replace { .. } => {}
            Self::Merge { fields } => {
                if fields.is_empty() {
                    return Err(UpdateError::Empty {
                        reason: "merge has no fields".to_string(),
                    });
                }
                for (field, value) in fields {
                    if value.is_null() {
                        state.remove(field);
                    } else {
                        state.insert(field.clone(), value.clone());
                    }
                }
            }
            Self::Increment { field, by } => {
                let current = match state.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(v) => v.as_i64().ok_or_else(|| UpdateError::NotNumeric {
                        field: field.clone(),
                    })?,
                };
                let next = current
                    .checked_add(*by)
                    .ok_or_else(|| UpdateError::Overflow {
                        field: field.clone(),
                    })?;
                state.insert(field.clone(), Value::from(next));
            }
            Self::AddToSet { field, members } => {
                let mut set = as_array(&state, field)?;
                for member in members {
                    if !set.contains(member) {
                        set.push(member.clone());
                    }
                }
                state.insert(field.clone(), Value::Array(set));
            }
            Self::RemoveFromSet { field, members } => {
                let mut set = as_array(&state, field)?;
                set.retain(|m| !members.contains(m));
                state.insert(field.clone(), Value::Array(set));
            }
        }
        Ok(Value::Object(state))
    }

    fn summary(&self) -> ChangeSummary {
        let touched = match self {
            Self::Replace { .. } => TouchedFields::All,
            Self::Merge { fields } => TouchedFields::Fields(fields.keys().cloned().collect()),
            Self::Increment { field, .. }
            | Self::AddToSet { field, .. }
            | Self::RemoveFromSet { field, .. } => TouchedFields::single(field),
        };
        ChangeSummary::new(self.kind(), touched)
    }

    fn commutes_with(&self, prior: &ChangeSummary) -> bool {
        let mine = self.summary();
        if mine.kind == UpdateKind::Replace || prior.kind == UpdateKind::Replace {
            return false;
        }
        if !mine.touched.overlaps(&prior.touched) {
            return true;
        }
        matches!(
            (mine.kind, prior.kind),
            (UpdateKind::Increment, UpdateKind::Increment)
                | (UpdateKind::SetAdd, UpdateKind::SetAdd)
                | (UpdateKind::SetRemove, UpdateKind::SetRemove)
        )
    }
}

fn as_object(base: &Value) -> Result<Map<String, Value>, UpdateError> {
    match base {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(UpdateError::NotAnObject),
    }
}

fn as_array(state: &Map<String, Value>, field: &str) -> Result<Vec<Value>, UpdateError> {
    match state.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(UpdateError::NotAnArray {
            field: field.to_string(),
        }),
    }
}
