//! Tests for rule compilation, path matching and fail-closed behavior.
mod common;
use common::*;
use katachi::prelude::*;
use serde_json::{Value, json};

fn rule_set(rules: Vec<FieldRule>) -> CompiledRules {
    let mut schema = Schema::new("rules", "Rules");
    schema.field_rules = rules;
    CompiledRules::compile(&schema)
}

fn matched_fields(rules: &CompiledRules, path: &str, tags: &[String]) -> Vec<String> {
    rules
        .rules_for(path, tags)
        .map(|r| r.rule.field.clone())
        .collect()
}

#[test]
fn test_simplify_path_removes_second_segment() {
    assert_eq!(simplify_path("field4.iv.nested42"), Some("field4.nested42".to_string()));
    assert_eq!(simplify_path("field1.en"), Some("field1".to_string()));
    assert_eq!(simplify_path("field1"), None);
}

#[test]
fn test_rule_matches_exact_and_simplified_path() {
    let rules = rule_set(vec![
        FieldRule::new(RuleAction::Hide, "field4.nested42", "data.x == 1"),
        FieldRule::new(RuleAction::Hide, "other.nested42", "data.x == 1"),
    ]);

    // The partition segment is elided when matching.
    assert_eq!(
        matched_fields(&rules, "field4.iv.nested42", &[]),
        vec!["field4.nested42"]
    );
    assert_eq!(
        matched_fields(&rules, "field4.en.nested42", &[]),
        vec!["field4.nested42"]
    );
    assert_eq!(
        matched_fields(&rules, "field4.nested42", &[]),
        vec!["field4.nested42"]
    );
    assert!(matched_fields(&rules, "field4.iv.other", &[]).is_empty());
}

#[test]
fn test_tag_rules_match_tagged_fields() {
    let rules = rule_set(vec![FieldRule::new(
        RuleAction::Disable,
        "tag:admin-only",
        "data.x == 1",
    )]);

    let tags = vec!["admin-only".to_string()];
    assert_eq!(matched_fields(&rules, "anything.iv", &tags).len(), 1);
    assert!(matched_fields(&rules, "anything.iv", &[]).is_empty());
}

#[test]
fn test_rules_keep_declaration_order() {
    let rules = rule_set(vec![
        FieldRule::new(RuleAction::Hide, "f.iv", "data.x == 1"),
        FieldRule::new(RuleAction::Require, "f", "data.x == 1"),
        FieldRule::new(RuleAction::Disable, "f.iv", "data.x == 1"),
    ]);
    let actions: Vec<RuleAction> = rules
        .rules_for("f.iv", &[])
        .map(|r| r.action())
        .collect();
    assert_eq!(
        actions,
        vec![RuleAction::Hide, RuleAction::Require, RuleAction::Disable]
    );
}

#[test]
fn test_compile_failure_is_inert() {
    let context = RuleContext::default();
    let data = json!({ "x": 1 });

    // Unparseable condition: never matches, never panics.
    let rule = CompiledRule::new(
        FieldRule::new(RuleAction::Hide, "f", "this is ((( not valid"),
        false,
    );
    assert!(!rule.eval(&context, &data, None));
}

#[test]
fn test_eval_failure_is_inert() {
    let context = RuleContext::default();

    // Ordering against a string value errors, which resolves to false.
    let rule = CompiledRule::new(
        FieldRule::new(RuleAction::Hide, "f", "data.x > 100"),
        false,
    );
    assert!(!rule.eval(&context, &json!({ "x": "not a number" }), None));
    assert!(!rule.eval(&context, &Value::Null, None));

    // The same rule against numeric data evaluates normally.
    assert!(rule.eval(&context, &json!({ "x": 120 }), None));
    assert!(!rule.eval(&context, &json!({ "x": 99 }), None));
}

#[test]
fn test_rule_context_user_and_ctx() {
    let context = RuleContext {
        user: json!({ "role": "editor" }),
        ctx: json!({ "status": "Draft" }),
    };
    let rule = CompiledRule::new(
        FieldRule::new(
            RuleAction::Disable,
            "f",
            "user.role == 'editor' && ctx.status == 'Draft'",
        ),
        false,
    );
    assert!(rule.eval(&context, &Value::Null, None));
}

#[test]
fn test_component_scope_reroots_parent_rules() {
    let parent = rule_set(vec![
        FieldRule::new(RuleAction::Hide, "field5.inner", "data.x == 1"),
        FieldRule::new(RuleAction::Hide, "unrelated.other", "data.x == 1"),
        FieldRule::new(RuleAction::Disable, "tag:admin-only", "data.x == 1"),
    ]);

    let scoped = parent.scoped_to_component("field5.iv", &component_a());

    // Component-own rule first, then the re-rooted parent rule.
    let on_inner = matched_fields(&scoped, "inner", &[]);
    assert_eq!(on_inner, vec!["inner", "inner"]);

    // Unrelated parent rules are not carried; tag rules are.
    assert!(matched_fields(&scoped, "other", &[]).is_empty());
    let tags = vec!["admin-only".to_string()];
    assert_eq!(matched_fields(&scoped, "whatever", &tags).len(), 1);
}

#[test]
fn test_component_scope_reroots_partitionless_prefix() {
    let parent = rule_set(vec![FieldRule::new(
        RuleAction::Hide,
        "field5.iv.inner",
        "data.x == 1",
    )]);
    let scoped = parent.scoped_to_component("field5.iv", &component_a());
    assert!(matched_fields(&scoped, "inner", &[]).contains(&"inner".to_string()));
}

#[test]
fn test_item_data_binding_for_component_rules() {
    let scoped = CompiledRules::default().scoped_to_component("field5.iv", &component_a());
    let rule = scoped
        .rules_for("inner", &[])
        .next()
        .expect("component rule present")
        .clone();

    let context = RuleContext::default();
    let root = json!({});
    // `data.count` resolves against the item's local object.
    assert!(rule.eval(&context, &root, Some(&json!({ "count": 7 }))));
    assert!(!rule.eval(&context, &root, Some(&json!({ "count": 3 }))));
    // Without an item scope it falls back to the root data.
    assert!(rule.eval(&context, &json!({ "count": 7 }), None));
}
