use std::collections::HashSet;

use expression_tree::{
    ArithOp, CompareOp, Context, EvalError, Expression, Value, boolean, field, reference, value,
};
use serde_json::json;

fn eval(expr: &Expression) -> Result<Value, EvalError> {
    expr.evaluate_value(&Context::new())
}

fn eval_in(expr: &Expression, doc: serde_json::Value) -> Result<Value, EvalError> {
    expr.evaluate_value(&Context::try_from(doc).unwrap())
}

fn truthy(expr: &Expression) -> bool {
    eval(expr).unwrap() == Value::Boolean(true)
}

// ========================================================================
// Construction
// ========================================================================

#[test]
fn test_builders_construct_nodes() {
    let expr = field("age", "obj").greater_than(18);

    assert_eq!(
        expr,
        Expression::Compare {
            op: CompareOp::Greater,
            left: Box::new(field("age", "obj")),
            right: Box::new(Expression::Value(Value::Integer(18))),
        }
    );
}

#[test]
fn test_not_equals_wraps_equal() {
    assert_eq!(value(1).not_equals(2), !value(1).equals(2));
    assert!(matches!(value(1).not_equals(2), Expression::Not(_)));
}

#[test]
fn test_contains_swaps_operands() {
    assert_eq!(value(vec![1, 2]).contains(1), value(1).is_in(vec![1, 2]));
}

#[test]
fn test_and_or_build_two_clause_nodes() {
    let a = value(true);
    let b = value(false);
    let c = value(true);

    let chained = a.clone() & b.clone() & c.clone();
    assert_eq!(
        chained,
        Expression::And(vec![Expression::And(vec![a.clone(), b.clone()]), c.clone()])
    );

    let either = a.clone() | b.clone();
    assert_eq!(either, Expression::Or(vec![a, b]));
}

#[test]
fn test_building_does_not_evaluate() {
    // Would fail if evaluated: no context has "missing"
    let expr = reference("missing").greater_than(1) & !field("x", "nothing");
    assert!(matches!(expr, Expression::And(_)));
}

#[test]
fn test_structural_equality_and_hash() {
    let mut seen = HashSet::new();
    seen.insert(field("age", "obj").greater_than(18));
    seen.insert(field("age", "obj").greater_than(18));
    seen.insert(field("age", "obj").greater_than(21));
    seen.insert(value(json!({"b": 1, "a": [0.0, -0.0]})));
    seen.insert(value(json!({"a": [-0.0, 0.0], "b": 1})));

    assert_eq!(seen.len(), 3);
    assert!(seen.contains(&field("age", "obj").greater_than(21)));
}

// ========================================================================
// Comparisons
// ========================================================================

#[test]
fn test_comparisons_match_operand_ordering() {
    let cases = [(1, 2), (2, 2), (3, 2)];
    for (a, b) in cases {
        assert_eq!(truthy(&value(a).greater_than(b)), a > b);
        assert_eq!(truthy(&value(a).greater_equal(b)), a >= b);
        assert_eq!(truthy(&value(a).less_than(b)), a < b);
        assert_eq!(truthy(&value(a).less_equal(b)), a <= b);
        assert_eq!(truthy(&value(a).equals(b)), a == b);
        assert_eq!(truthy(&value(a).not_equals(b)), a != b);
    }
}

#[test]
fn test_mixed_numeric_comparison() {
    assert!(truthy(&value(2).greater_than(1.5)));
    assert!(truthy(&value(1).equals(1.0)));
    assert!(!truthy(&value(f64::NAN).less_than(1)));
    assert!(!truthy(&value(f64::NAN).greater_equal(1)));
}

#[test]
fn test_mixed_numeric_comparison_is_exact() {
    // 2^53 + 1 has no f64 form; it must not equal its nearest float
    let big = 9_007_199_254_740_993_i64;
    assert!(!truthy(&value(big).equals(9_007_199_254_740_992.0)));
    assert!(truthy(&value(big).greater_than(9_007_199_254_740_992.0)));
    assert!(truthy(&value(9_007_199_254_740_992.0).less_than(big)));
    assert!(truthy(&value(9_007_199_254_740_992_i64).equals(9_007_199_254_740_992.0)));

    assert!(truthy(&value(i64::MAX).less_than(9_223_372_036_854_775_808.0)));
    assert!(truthy(&value(i64::MIN).equals(-9_223_372_036_854_775_808.0)));
    assert!(truthy(&value(-2).greater_than(-2.5)));
    assert!(truthy(&value(2).less_than(2.5)));
    assert!(!truthy(&value(3).equals(f64::INFINITY)));
    assert!(truthy(&value(vec![big]).not_equals(vec![9_007_199_254_740_992.0])));
}

#[test]
fn test_string_and_array_ordering() {
    assert!(truthy(&value("apple").less_than("banana")));
    assert!(truthy(&value(vec![1, 2]).less_than(vec![1, 3])));
    assert!(truthy(&value(vec![1, 2]).less_than(vec![1, 2, 0])));
}

#[test]
fn test_incomparable_types_fail() {
    let err = eval(&value(1).greater_than("a")).unwrap_err();
    assert!(matches!(err, EvalError::TypeError(_)));
}

#[test]
fn test_equality_across_types_is_false() {
    assert!(!truthy(&value(1).equals("1")));
    assert!(truthy(&value(Value::Null).equals(Value::Null)));
}

#[test]
fn test_field_comparison_scenario() {
    let expr = field("age", "obj").greater_than(value(18));
    assert_eq!(eval_in(&expr, json!({"obj": {"age": 20}})).unwrap(), Value::Boolean(true));
    assert_eq!(eval_in(&expr, json!({"obj": {"age": 16}})).unwrap(), Value::Boolean(false));
}

// ========================================================================
// In
// ========================================================================

#[test]
fn test_in_array() {
    assert!(truthy(&value(2).is_in(vec![1, 2, 3])));
    assert!(!truthy(&value(5).is_in(vec![1, 2, 3])));
    assert!(truthy(&value(2.0).is_in(vec![1, 2, 3])));
}

#[test]
fn test_in_string_and_object() {
    assert!(truthy(&value("ell").is_in("hello")));
    assert!(truthy(&value("a").is_in(value(json!({"a": 1})))));
    assert!(!truthy(&value("b").is_in(value(json!({"a": 1})))));
}

#[test]
fn test_in_non_container_fails() {
    assert!(matches!(eval(&value(1).is_in(5)), Err(EvalError::TypeError(_))));
}

#[test]
fn test_in_context_list() {
    let expr = reference("role").is_in(reference("allowed"));
    let result = eval_in(&expr, json!({"role": "admin", "allowed": ["admin", "owner"]}));
    assert_eq!(result.unwrap(), Value::Boolean(true));
}

// ========================================================================
// Boolean logic
// ========================================================================

#[test]
fn test_vacuous_and_or() {
    assert!(truthy(&Expression::all(vec![])));
    assert!(!truthy(&Expression::any(vec![])));
}

#[test]
fn test_and_or_results() {
    assert!(truthy(&(value(true) & value(1))));
    assert!(!truthy(&(value(true) & value(0))));
    assert!(truthy(&(value(false) | value("x"))));
    assert!(!truthy(&(value(false) | value(""))));
}

#[test]
fn test_and_short_circuits() {
    // The second clause would fail with a lookup error
    let expr = value(false) & reference("missing");
    assert_eq!(eval(&expr).unwrap(), Value::Boolean(false));

    let expr = value(true) & reference("missing");
    assert!(matches!(eval(&expr), Err(EvalError::ContextLookup(_))));
}

#[test]
fn test_or_short_circuits() {
    let expr = value(true) | reference("missing");
    assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));
}

#[test]
fn test_double_negation_normalizes() {
    for v in [json!(0), json!(3), json!(""), json!("x"), json!([]), json!(null)] {
        let inner = value(v.clone());
        let expected = Value::from(v).is_truthy();
        assert_eq!(eval(&!!inner.clone()).unwrap(), Value::Boolean(expected));
        assert_eq!(eval(&boolean(inner)).unwrap(), Value::Boolean(expected));
    }
}

#[test]
fn test_errors_propagate_through_not() {
    assert!(matches!(
        eval(&!reference("missing")),
        Err(EvalError::ContextLookup(_))
    ));
}

// ========================================================================
// Arithmetic
// ========================================================================

#[test]
fn test_integer_arithmetic() {
    assert_eq!(eval(&value(7).plus(3)).unwrap(), Value::Integer(10));
    assert_eq!(eval(&value(7).minus(3)).unwrap(), Value::Integer(4));
    assert_eq!(eval(&value(7).times(3)).unwrap(), Value::Integer(21));
    assert_eq!(eval(&value(6).divided_by(3)).unwrap(), Value::Integer(2));
    assert_eq!(eval(&value(7).divided_by(2)).unwrap(), Value::Float(3.5));
    assert_eq!(eval(&value(7).modulo(3)).unwrap(), Value::Integer(1));
}

#[test]
fn test_mixed_arithmetic_keeps_whole_results_integral() {
    assert_eq!(eval(&value(100).times(1.1)).unwrap(), Value::Integer(110));
    assert_eq!(eval(&value(1).plus(0.5)).unwrap(), Value::Float(1.5));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(
        eval(&value("foo").plus("bar")).unwrap(),
        Value::String("foobar".into())
    );
}

#[test]
fn test_arithmetic_errors() {
    assert_eq!(eval(&value(1).divided_by(0)).unwrap_err(), EvalError::DivisionByZero);
    assert_eq!(eval(&value(1.0).modulo(0.0)).unwrap_err(), EvalError::DivisionByZero);
    assert_eq!(
        eval(&value(i64::MAX).plus(1)).unwrap_err(),
        EvalError::Overflow(ArithOp::Add)
    );
    assert!(matches!(eval(&value("a").minus(1)), Err(EvalError::TypeError(_))));
}

#[test]
fn test_modulo_by_minus_one_is_zero() {
    assert_eq!(eval(&value(i64::MIN).modulo(-1)).unwrap(), Value::Integer(0));
    assert_eq!(eval(&value(7).modulo(-1)).unwrap(), Value::Integer(0));
    assert_eq!(
        eval(&value(i64::MIN).divided_by(-1)).unwrap_err(),
        EvalError::Overflow(ArithOp::Divide)
    );
}

// ========================================================================
// Matches
// ========================================================================

#[cfg(feature = "regex")]
#[test]
fn test_matches() {
    assert!(truthy(&value("order-1234").matches(r"^order-\d+$")));
    assert!(!truthy(&value("invoice-1").matches(r"^order-\d+$")));
    assert!(matches!(
        eval(&value("x").matches("(")),
        Err(EvalError::InvalidPattern { .. })
    ));
    assert!(matches!(eval(&value(1).matches("1")), Err(EvalError::TypeError(_))));
}
