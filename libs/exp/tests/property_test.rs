//! Property-based tests using QuickCheck

use std::collections::HashMap;

use quickcheck::{QuickCheck, TestResult};
use cinnabar_exp::{factory, params, parse, Expression, Value};

fn reparses(expr: &Expression) -> bool {
    match parse(&expr.to_string()) {
        Ok(reparsed) => reparsed == *expr,
        Err(_) => false,
    }
}

/// Property: integer literals keep value and kind through the text form
#[test]
fn prop_integer_round_trip() {
    fn prop(i: i32, l: i64) -> bool {
        let int = factory::match_exp("a", i).unwrap();
        let long = factory::match_exp("a", l).unwrap();
        reparses(&int) && reparses(&long)
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(i32, i64) -> bool);
}

/// Property: finite doubles round-trip exactly
#[test]
fn prop_double_round_trip() {
    fn prop(d: f64) -> TestResult {
        if !d.is_finite() {
            return TestResult::discard();
        }
        TestResult::from_bool(reparses(&factory::match_exp("a", d).unwrap()))
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(f64) -> TestResult);
}

/// Property: any string literal survives escaping
#[test]
fn prop_string_round_trip() {
    fn prop(s: String) -> TestResult {
        if s.chars().any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t')) {
            return TestResult::discard();
        }
        TestResult::from_bool(reparses(&factory::match_exp("a", s).unwrap()))
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: pruning a conjunction of bound and unbound comparisons keeps
/// exactly the bound ones
#[test]
fn prop_pruning_keeps_bound_operands() {
    fn prop(bound: Vec<bool>) -> TestResult {
        if bound.is_empty() || bound.len() > 8 {
            return TestResult::discard();
        }
        let text = (0..bound.len())
            .map(|i| format!("f{} = $p{}", i, i))
            .collect::<Vec<_>>()
            .join(" and ");
        let values: HashMap<String, Value> = bound
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| (format!("p{}", i), Value::Int(i as i32)))
            .collect();

        let result = params(&parse(&text).unwrap(), &values, true).unwrap();
        let expected = (0..bound.len())
            .filter(|i| bound[*i])
            .map(|i| format!("f{} = {}", i, i))
            .collect::<Vec<_>>()
            .join(" and ");
        TestResult::from_bool(match result {
            Some(expr) => expr.to_string() == expected,
            None => expected.is_empty(),
        })
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<bool>) -> TestResult);
}
