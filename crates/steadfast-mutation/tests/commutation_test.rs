//! Rebase rules: fixture matrix plus a property check that any pair the
//! rules call commuting really yields the same state in either order.

use proptest::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};

use steadfast_core::traits::RebaseStrategy;
use steadfast_mutation::Update;

#[derive(Deserialize)]
struct Case {
    name: String,
    prior: Update,
    update: Update,
    commutes: bool,
}

#[test]
fn commutation_matrix() {
    let cases: Vec<Case> = test_fixtures::load_fixture("commutation.json");
    assert!(!cases.is_empty());
    for case in cases {
        assert_eq!(
            case.update.commutes_with(&case.prior.summary()),
            case.commutes,
            "{}",
            case.name
        );
    }
}

/// Sort arrays so set-valued fields compare as sets.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        Value::Array(mut items) => {
            items.sort_by_key(|v| v.to_string());
            Value::Array(items)
        }
        other => other,
    }
}

fn arb_update() -> impl Strategy<Value = Update> {
    let field = prop::sample::select(vec!["n", "s", "title"]);
    let member = prop::sample::select(vec!["a", "b", "c"]).prop_map(|m| json!(m));
    prop_oneof![
        (field.clone(), -5i64..5).prop_map(|(f, by)| Update::increment(f, by)),
        (field.clone(), prop::collection::vec(member.clone(), 1..3))
            .prop_map(|(f, m)| Update::add_to_set(f, m)),
        (field.clone(), prop::collection::vec(member, 1..3))
            .prop_map(|(f, m)| Update::remove_from_set(f, m)),
        (field, "[a-z]{1,3}").prop_map(|(f, v)| Update::merge([(f, json!(v))])),
        Just(Update::replace(json!({"n": 0}))),
    ]
}

proptest! {
    #[test]
    fn commuting_pairs_reach_the_same_state(a in arb_update(), b in arb_update()) {
        let base = json!({"n": 1, "s": ["a"], "title": "t"});
        prop_assume!(b.commutes_with(&a.summary()));

        let ab = a.apply(&base).and_then(|v| b.apply(&v));
        let ba = b.apply(&base).and_then(|v| a.apply(&v));
        prop_assert_eq!(ab.is_ok(), ba.is_ok());
        if let (Ok(x), Ok(y)) = (ab, ba) {
            prop_assert_eq!(normalize(x), normalize(y));
        }
    }

    #[test]
    fn commutation_is_symmetric(a in arb_update(), b in arb_update()) {
        prop_assert_eq!(b.commutes_with(&a.summary()), a.commutes_with(&b.summary()));
    }
}
