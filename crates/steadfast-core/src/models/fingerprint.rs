//! Content fingerprints for requests and listing parameters.
//!
//! A fingerprint is the BLAKE3 digest of the canonical JSON form of a value:
//! object keys sorted at every depth, no insignificant whitespace. Two values
//! that serialize to equal JSON modulo key order share a fingerprint.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Hex-encoded BLAKE3 digest of a canonicalized value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint any serializable value.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let canonical = canonicalize(serde_json::to_value(value)?);
        let bytes = serde_json::to_vec(&canonical)?;
        Ok(Self(blake3::hash(&bytes).to_hex().to_string()))
    }

    /// Wrap an already-computed hex digest (e.g., one read back from a cursor).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_fingerprint() {
        let a = json!({"b": 1, "a": {"y": 2, "x": [1, {"q": 1, "p": 2}]}});
        let b = json!({"a": {"x": [1, {"p": 2, "q": 1}], "y": 2}, "b": 1});
        assert_eq!(Fingerprint::of(&a).unwrap(), Fingerprint::of(&b).unwrap());
    }

    #[test]
    fn different_content_differs() {
        let a = json!({"op": "increment", "by": 1});
        let b = json!({"op": "increment", "by": 2});
        assert_ne!(Fingerprint::of(&a).unwrap(), Fingerprint::of(&b).unwrap());
    }

    #[test]
    fn array_order_matters() {
        let a = json!([1, 2]);
        let b = json!([2, 1]);
        assert_ne!(Fingerprint::of(&a).unwrap(), Fingerprint::of(&b).unwrap());
    }
}
