use expression_tree::{Context, EvalError, Value, attribute, field, reference, value};
use serde_json::json;

fn context(doc: serde_json::Value) -> Context {
    Context::try_from(doc).unwrap()
}

// ========================================================================
// Value
// ========================================================================

#[test]
fn test_value_ignores_context() {
    let expr = value(42);

    assert_eq!(expr.evaluate_value(&Context::new()).unwrap(), Value::Integer(42));
    assert_eq!(
        expr.evaluate_value(&context(json!({"x": 1, "y": [1, 2]}))).unwrap(),
        Value::Integer(42)
    );
}

#[test]
fn test_value_wraps_collections() {
    let expr = value(vec![1, 2, 3]);
    assert_eq!(
        expr.evaluate_value(&Context::new()).unwrap(),
        Value::Array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
    );
}

// ========================================================================
// Field
// ========================================================================

#[test]
fn test_field_reads_mapping_entry() {
    let ctx = context(json!({"obj": {"age": 20}}));
    assert_eq!(field("age", "obj").evaluate_value(&ctx).unwrap(), Value::Integer(20));
}

#[test]
fn test_field_missing_subject_is_null() {
    let ctx = context(json!({"other": {"age": 20}}));
    assert_eq!(field("age", "obj").evaluate_value(&ctx).unwrap(), Value::Null);
}

#[test]
fn test_field_falsy_subject_is_null() {
    // Present but falsy subjects are treated as absent
    for subject in [json!({}), json!(0), json!(""), json!([]), json!(null), json!(false)] {
        let ctx = context(json!({"obj": subject}));
        assert_eq!(field("age", "obj").evaluate_value(&ctx).unwrap(), Value::Null);
    }
}

#[test]
fn test_field_missing_entry_fails() {
    let ctx = context(json!({"obj": {"name": "alice"}}));
    let err = field("age", "obj").evaluate_value(&ctx).unwrap_err();
    assert!(matches!(err, EvalError::ContextLookup(_)));
}

#[test]
fn test_field_indexes_arrays() {
    let ctx = context(json!({"items": ["first", "second", "third"]}));

    assert_eq!(
        field("1", "items").evaluate_value(&ctx).unwrap(),
        Value::String("second".into())
    );
    assert_eq!(
        field("-1", "items").evaluate_value(&ctx).unwrap(),
        Value::String("third".into())
    );
    assert!(matches!(
        field("5", "items").evaluate_value(&ctx),
        Err(EvalError::ContextLookup(_))
    ));
    assert!(matches!(
        field("name", "items").evaluate_value(&ctx),
        Err(EvalError::TypeError(_))
    ));
}

#[test]
fn test_field_out_of_range_indices_fail() {
    let ctx = context(json!({"items": [1, 2, 3]}));

    for index in ["-4", "-9223372036854775808", "9223372036854775807"] {
        assert!(matches!(
            field(index, "items").evaluate_value(&ctx),
            Err(EvalError::ContextLookup(_))
        ));
    }
    assert_eq!(field("-3", "items").evaluate_value(&ctx).unwrap(), Value::Integer(1));
}

// ========================================================================
// Attribute
// ========================================================================

#[test]
fn test_attribute_reads_member() {
    let ctx = context(json!({"user": {"name": "alice"}}));
    assert_eq!(
        attribute("name", "user").evaluate_value(&ctx).unwrap(),
        Value::String("alice".into())
    );
}

#[test]
fn test_attribute_missing_subject_is_null() {
    assert_eq!(
        attribute("name", "user").evaluate_value(&Context::new()).unwrap(),
        Value::Null
    );
}

#[test]
fn test_attribute_missing_member_fails() {
    let ctx = context(json!({"user": {"name": "alice"}}));
    let err = attribute("email", "user").evaluate_value(&ctx).unwrap_err();
    assert_eq!(err, EvalError::ContextLookup("user.email".into()));
}

#[test]
fn test_attribute_on_scalar_subject_fails() {
    let ctx = context(json!({"user": 7}));
    assert!(matches!(
        attribute("name", "user").evaluate_value(&ctx),
        Err(EvalError::ContextLookup(_))
    ));
}

// ========================================================================
// Reference
// ========================================================================

#[test]
fn test_reference_without_path() {
    let ctx = context(json!({"limit": 10}));
    assert_eq!(reference("limit").evaluate_value(&ctx).unwrap(), Value::Integer(10));
}

#[test]
fn test_reference_dotted_path() {
    let ctx = context(json!({"user": {"address": {"city": "Oslo"}}}));
    assert_eq!(
        reference("user.address.city").evaluate_value(&ctx).unwrap(),
        Value::String("Oslo".into())
    );
}

#[test]
fn test_reference_missing_root_fails() {
    let err = reference("user.name").evaluate_value(&Context::new()).unwrap_err();
    assert_eq!(err, EvalError::ContextLookup("user".into()));
}

#[test]
fn test_reference_missing_segment_reports_path() {
    let ctx = context(json!({"user": {"address": {}}}));
    let err = reference("user.address.city").evaluate_value(&ctx).unwrap_err();
    assert_eq!(err, EvalError::ContextLookup("user.address.city".into()));

    let err = reference("user.profile.city").evaluate_value(&ctx).unwrap_err();
    assert_eq!(err, EvalError::ContextLookup("user.profile".into()));
}

#[test]
fn test_reference_does_not_tolerate_falsy_root() {
    // Unlike Attribute/Field, a falsy root is still a value
    let ctx = context(json!({"count": 0}));
    assert_eq!(reference("count").evaluate_value(&ctx).unwrap(), Value::Integer(0));
}

// ========================================================================
// Context
// ========================================================================

#[test]
fn test_context_requires_object() {
    assert!(matches!(Context::try_from(json!([1, 2])), Err(EvalError::TypeError(_))));
}

#[test]
fn test_context_extended_shadows_without_mutating() {
    let outer = Context::new().with("x", 1).with("y", 2);
    let inner = outer.extended(vec![("x".to_string(), Value::Integer(10))]);

    assert_eq!(inner.get("x"), Some(&Value::Integer(10)));
    assert_eq!(inner.get("y"), Some(&Value::Integer(2)));
    assert_eq!(outer.get("x"), Some(&Value::Integer(1)));
}
