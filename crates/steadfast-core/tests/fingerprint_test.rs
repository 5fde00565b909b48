//! Fingerprint stability across key order and filter construction order.

use proptest::prelude::*;
use serde_json::{Map, Value};

use steadfast_core::models::{Filter, Fingerprint, Ordering};

fn object(pairs: &[(String, i64)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(*v)))
        .collect();
    Value::Object(map)
}

proptest! {
    #[test]
    fn insertion_order_does_not_matter(
        pairs in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8)
    ) {
        let forward: Vec<(String, i64)> = pairs.into_iter().collect();
        let mut backward = forward.clone();
        backward.reverse();

        let a = Fingerprint::of(&serde_json::json!({ "outer": object(&forward), "n": 1 })).unwrap();
        let b = Fingerprint::of(&serde_json::json!({ "n": 1, "outer": object(&backward) })).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.as_str().len(), 64);
        prop_assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn filter_build_order_does_not_matter(
        fields in prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,4}", 1..6)
    ) {
        let forward = fields
            .iter()
            .fold(Filter::new(), |f, (k, v)| f.field_eq(k.clone(), v.clone()));
        let backward = fields
            .iter()
            .rev()
            .fold(Filter::new(), |f, (k, v)| f.field_eq(k.clone(), v.clone()));

        let ordering = Ordering::modified_desc();
        prop_assert_eq!(
            forward.view_fingerprint(&ordering).unwrap(),
            backward.view_fingerprint(&ordering).unwrap()
        );
    }
}

#[test]
fn fingerprint_survives_serde() {
    let fp = Fingerprint::of(&serde_json::json!({"op": "replace"})).unwrap();
    let wire = serde_json::to_string(&fp).unwrap();
    assert_eq!(wire, format!("\"{}\"", fp.as_str()));
    let back: Fingerprint = serde_json::from_str(&wire).unwrap();
    assert_eq!(back, fp);
}
