//! Tests for the rule condition expression language.
use katachi::error::ExprError;
use katachi::expr::{EvalContext, ExprEngine, Expression, PathRoot, is_truthy, parse};
use serde_json::{Value, json};

fn eval(source: &str, data: &Value) -> Result<Value, String> {
    let expr = parse(source).map_err(|e| e.to_string())?;
    let null = Value::Null;
    let engine = ExprEngine::new(EvalContext {
        user: &null,
        ctx: &null,
        data,
        item_data: None,
    });
    engine.evaluate(&expr).map_err(|e| e.to_string())
}

#[test]
fn test_parse_path() {
    let expr = parse("data.field2.iv").expect("valid path");
    assert_eq!(
        expr,
        Expression::Path(
            PathRoot::Data,
            vec!["field2".to_string(), "iv".to_string()]
        )
    );
}

#[test]
fn test_parse_rejects_unknown_root() {
    let err = parse("window.alert").unwrap_err();
    assert_eq!(err, ExprError::UnknownRoot("window".to_string()));
}

#[test]
fn test_parse_rejects_trailing_input() {
    assert!(matches!(
        parse("data.a == 1 data.b"),
        Err(ExprError::TrailingInput(_))
    ));
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(parse("this is not ((").is_err());
    assert!(parse("data.a ==").is_err());
    assert!(parse("#!?").is_err());
}

#[test]
fn test_numeric_comparison() {
    let data = json!({ "n": { "iv": 120 } });
    assert_eq!(eval("data.n.iv > 100", &data), Ok(Value::Bool(true)));
    assert_eq!(eval("data.n.iv <= 100", &data), Ok(Value::Bool(false)));
    assert_eq!(eval("data.n.iv == 120", &data), Ok(Value::Bool(true)));
}

#[test]
fn test_string_comparison_is_lexicographic() {
    let data = json!({ "s": "2020-01-01T00:00:00Z" });
    assert_eq!(
        eval("data.s > '2019-12-31T00:00:00Z'", &data),
        Ok(Value::Bool(true))
    );
    assert_eq!(eval("data.s == \"2020-01-01T00:00:00Z\"", &data), Ok(Value::Bool(true)));
}

#[test]
fn test_ordering_on_mixed_types_errors() {
    let data = json!({ "s": "abc" });
    assert!(eval("data.s > 5", &data).is_err());
    assert!(eval("data.missing > 5", &data).is_err());
}

#[test]
fn test_missing_members_resolve_to_null() {
    let data = json!({});
    assert_eq!(eval("data.a.b.c == null", &data), Ok(Value::Bool(true)));
    assert_eq!(eval("itemData.x == null", &data), Ok(Value::Bool(true)));
}

#[test]
fn test_logical_connectives_short_circuit() {
    let data = json!({ "a": 1 });
    // The right side would error on its own; short-circuiting skips it.
    assert_eq!(
        eval("data.a == 1 || data.a > 'x'", &data),
        Ok(Value::Bool(true))
    );
    assert_eq!(
        eval("data.a == 2 && data.a > 'x'", &data),
        Ok(Value::Bool(false))
    );
}

#[test]
fn test_negation_and_truthiness() {
    let data = json!({ "flag": false, "name": "", "list": [] });
    assert_eq!(eval("!data.flag", &data), Ok(Value::Bool(true)));
    assert_eq!(eval("!data.name", &data), Ok(Value::Bool(true)));
    // Arrays are truthy even when empty.
    assert_eq!(eval("!data.list", &data), Ok(Value::Bool(false)));

    assert!(is_truthy(&json!(1)));
    assert!(!is_truthy(&json!(0)));
    assert!(!is_truthy(&Value::Null));
}

#[test]
fn test_number_equality_ignores_representation() {
    let data = json!({ "n": 1 });
    assert_eq!(eval("data.n == 1.0", &data), Ok(Value::Bool(true)));
}

#[test]
fn test_item_data_root() {
    let expr = parse("itemData.count > 5").expect("valid");
    let null = Value::Null;
    let data = json!({});
    let item = json!({ "count": 7 });
    let engine = ExprEngine::new(EvalContext {
        user: &null,
        ctx: &null,
        data: &data,
        item_data: Some(&item),
    });
    assert_eq!(engine.evaluate(&expr), Ok(Value::Bool(true)));
}
