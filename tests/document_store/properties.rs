//! Property-based tests for config parsing, filter round trips and scoring

use super::{entry, memory_store};
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;
use refinire_rag_strata::config::parse_bool;
use refinire_rag_strata::{
    distance_to_score, ComparisonOp, DistanceMetric, FilterExpr, Operand, Scalar,
};
use serde_json::json;

// =============================================================================
// Generators
// =============================================================================

/// Randomly re-case every character
fn arb_casing(word: &'static str) -> impl Strategy<Value = String> {
    prop_vec(any::<bool>(), word.len()).prop_map(move |upper| {
        word.chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

fn arb_field() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,7}"
}

fn arb_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<bool>().prop_map(Scalar::Bool),
        (-1000i64..1000).prop_map(Scalar::Int),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Scalar::String),
    ]
}

fn arb_leaf() -> impl Strategy<Value = FilterExpr> {
    let scalar_ops = prop_oneof![
        Just(ComparisonOp::Eq),
        Just(ComparisonOp::Ne),
        Just(ComparisonOp::Gt),
        Just(ComparisonOp::Gte),
        Just(ComparisonOp::Lt),
        Just(ComparisonOp::Lte),
    ];
    let list_ops = prop_oneof![Just(ComparisonOp::In), Just(ComparisonOp::Nin)];

    prop_oneof![
        (arb_field(), arb_scalar()).prop_map(|(field, value)| FilterExpr::Literal { field, value }),
        (arb_field(), scalar_ops, arb_scalar()).prop_map(|(field, op, v)| {
            FilterExpr::Operator {
                field,
                op,
                operand: Operand::Scalar(v),
            }
        }),
        (arb_field(), list_ops, prop_vec(arb_scalar(), 1..4)).prop_map(|(field, op, vs)| {
            FilterExpr::Operator {
                field,
                op,
                operand: Operand::List(vs),
            }
        }),
    ]
}

fn arb_filter() -> impl Strategy<Value = FilterExpr> {
    arb_leaf().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop_vec(inner.clone(), 1..4).prop_map(FilterExpr::and),
            prop_vec(inner.clone(), 1..4).prop_map(FilterExpr::or),
            inner.prop_map(FilterExpr::not),
        ]
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_truthy_words_parse_true(
        word in prop_oneof![arb_casing("true"), arb_casing("yes"), arb_casing("on")]
    ) {
        prop_assert_eq!(parse_bool("flag", &word).unwrap(), true);
        prop_assert_eq!(parse_bool("flag", &format!("  {word} ")).unwrap(), true);
    }

    #[test]
    fn prop_falsy_words_parse_false(
        word in prop_oneof![arb_casing("false"), arb_casing("no"), arb_casing("off")]
    ) {
        prop_assert_eq!(parse_bool("flag", &word).unwrap(), false);
    }

    #[test]
    fn prop_other_words_are_rejected(word in "[a-z]{2,8}") {
        prop_assume!(!["true", "false", "yes", "no", "on", "off"].contains(&word.as_str()));
        prop_assert!(parse_bool("flag", &word).is_err());
    }

    #[test]
    fn prop_filter_json_round_trip(expr in arb_filter()) {
        let parsed = FilterExpr::parse(&expr.to_json()).unwrap();
        prop_assert_eq!(parsed, Some(expr));
    }

    #[test]
    fn prop_scores_stay_in_unit_interval(distance in -1.0e6f32..1.0e6) {
        for metric in DistanceMetric::ALL {
            let score = distance_to_score(metric, distance);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_range_count_matches_manual_count(
        values in prop_vec(-50i64..50, 1..30),
        pivot in -60i64..60,
    ) {
        let store = memory_store();
        let entries = values
            .iter()
            .enumerate()
            .map(|(i, v)| entry(&format!("d{i}"), &[1.0, i as f32], json!({"n": v})))
            .collect();
        store.add_vectors(entries).unwrap();

        let expected_gte = values.iter().filter(|v| **v >= pivot).count();
        let expected_ne = values.iter().filter(|v| **v != pivot).count();
        prop_assert_eq!(
            store.count_vectors(Some(&json!({"n": {"$gte": pivot}}))).unwrap(),
            expected_gte
        );
        prop_assert_eq!(
            store.count_vectors(Some(&json!({"n": {"$ne": pivot}}))).unwrap(),
            expected_ne
        );
        prop_assert_eq!(
            store.count_vectors(Some(&json!({"$not": {"n": {"$gte": pivot}}}))).unwrap(),
            values.len() - expected_gte
        );
    }
}
