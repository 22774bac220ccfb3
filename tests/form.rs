//! Tests for the form tree: partitions, defaults, arrays, components
//! and the derived-state pass.
mod common;
use chrono::{TimeZone, Utc};
use common::*;
use katachi::form::defaults;
use katachi::prelude::*;
use serde_json::json;

#[test]
fn test_required_field_exempts_optional_partition() {
    let form = build_form();

    // `field3` is required; `de` is optional, `en` is the master.
    let en = form.control("field3.en").expect("en control");
    let de = form.control("field3.de").expect("de control");

    assert!(en.is_required());
    assert!(!de.is_required());

    assert!(!en.is_valid());
    assert_eq!(en.errors(), vec![ValidationIssue::Required]);
    assert!(de.is_valid());
}

#[test]
fn test_translation_status_rounding() {
    let mut schema = Schema::new("translated", "Translated");
    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        let mut field = string_field(id, name);
        field.is_localizable = true;
        schema.fields.push(field);
    }

    let data = json!({
        "a": { "en": "hello" },
        "b": { "en": "world", "de": "welt" },
    });

    let status = content_translation_status(&data, &schema, &languages());
    assert_eq!(status["en"], 67);
    assert_eq!(status["de"], 33);
}

#[test]
fn test_translation_status_without_localizable_fields() {
    let mut schema = Schema::new("plain", "Plain");
    schema.fields.push(string_field(1, "a"));

    let status = content_translation_status(&json!({}), &schema, &languages());
    assert_eq!(status["en"], 100);
    assert_eq!(status["de"], 100);
}

#[test]
fn test_calculated_datetime_defaults() {
    let now = Utc.with_ymd_and_hms(2017, 10, 12, 16, 30, 10).unwrap();

    let mut field = FieldSchema::new(1, "when", FieldType::DateTime);
    field.properties.calculated_default_value = Some(CalculatedDefault::Today);
    assert_eq!(
        defaults::value_for(&field, INVARIANT, now),
        Some(json!("2017-10-12T00:00:00Z"))
    );

    field.properties.calculated_default_value = Some(CalculatedDefault::Now);
    assert_eq!(
        defaults::value_for(&field, INVARIANT, now),
        Some(json!("2017-10-12T16:30:10Z"))
    );
}

#[test]
fn test_calculated_null_default_for_arrays() {
    let now = Utc::now();

    let mut field = FieldSchema::new(1, "list", FieldType::Array { fields: vec![] });
    assert_eq!(defaults::value_for(&field, INVARIANT, now), Some(json!([])));

    field.properties.calculated_default_value = Some(CalculatedDefault::Null);
    assert_eq!(defaults::value_for(&field, INVARIANT, now), None);
}

#[test]
fn test_default_values_override_per_partition() {
    let now = Utc::now();

    let mut field = string_field(1, "title");
    field.properties.default_value = Some(json!("fallback"));
    field.properties.default_values = Some(
        [("de".to_string(), json!("hallo"))]
            .into_iter()
            .collect(),
    );

    assert_eq!(defaults::value_for(&field, "de", now), Some(json!("hallo")));
    assert_eq!(defaults::value_for(&field, "en", now), Some(json!("fallback")));
}

#[test]
fn test_array_add_and_remove_items() {
    let mut form = build_form();
    form.load(
        &json!({
            "field4": { "iv": [
                { "nested42": "first", "nested43": true },
                { "nested42": "second", "nested43": false },
            ] }
        }),
        true,
    );

    let array = |form: &ContentFormTree| {
        form.resolve("field4.iv")
            .and_then(FieldNode::as_array)
            .map(|a| a.len())
            .expect("array node")
    };
    assert_eq!(array(&form), 2);

    // A fresh item keeps the disabled nested field's schema default.
    assert!(form.add_array_item("field4.iv"));
    assert_eq!(array(&form), 3);
    let added = form.control("field4.iv.2.nested42").expect("nested control");
    assert_eq!(added.value(), Some(&json!("banana")));
    assert!(added.is_disabled());

    // Removal preserves the order of the remaining items.
    assert!(form.remove_array_item("field4.iv", 0));
    assert_eq!(array(&form), 2);
    assert_eq!(
        form.control("field4.iv.0.nested42").unwrap().value(),
        Some(&json!("second"))
    );
    assert_eq!(
        form.control("field4.iv.1.nested42").unwrap().value(),
        Some(&json!("banana"))
    );

    assert!(!form.remove_array_item("field4.iv", 99));
}

#[test]
fn test_array_empty_versus_unset() {
    let mut form = build_form();

    form.set_value("field4.iv", Some(json!([])));
    let node = form.resolve("field4.iv").expect("array node");
    assert_eq!(node.as_array().unwrap().len(), 0);
    assert_eq!(node.value(), Some(json!([])));

    form.set_value("field4.iv", None);
    let node = form.resolve("field4.iv").expect("array node");
    assert_eq!(node.as_array().unwrap().len(), 0);
    assert_eq!(node.value(), None);
}

#[test]
fn test_array_copy_and_move() {
    let mut form = build_form();
    form.load(
        &json!({
            "field4": { "iv": [
                { "nested42": "a" },
                { "nested42": "b" },
            ] }
        }),
        true,
    );

    assert!(form.add_array_copy("field4.iv", 0));
    assert_eq!(
        form.control("field4.iv.2.nested42").unwrap().value(),
        Some(&json!("a"))
    );

    // [a, b, a'] -> move first to the end -> [b, a', a]
    assert!(form.move_array_item("field4.iv", 0, 2));
    assert_eq!(
        form.control("field4.iv.0.nested42").unwrap().value(),
        Some(&json!("b"))
    );
    assert_eq!(
        form.control("field4.iv.2.nested42").unwrap().value(),
        Some(&json!("a"))
    );

    assert!(form.sort_array_items("field4.iv", &[2, 1, 0]));
    assert_eq!(
        form.control("field4.iv.0.nested42").unwrap().value(),
        Some(&json!("a"))
    );
    assert!(!form.sort_array_items("field4.iv", &[0, 0, 1]));
}

#[test]
fn test_component_schema_swap() {
    let mut form = build_form();

    form.set_value(
        "field5.iv",
        Some(json!({ "schemaId": "component-a", "inner": "x" })),
    );
    let component = form
        .resolve("field5.iv")
        .and_then(FieldNode::as_component)
        .expect("component node");
    assert_eq!(component.schema_id(), Some("component-a"));
    assert!(component.field_node("inner").is_some());
    assert_eq!(
        form.control("field5.iv.inner").unwrap().value(),
        Some(&json!("x"))
    );

    // Swapping the discriminator fully replaces the child-field set.
    form.set_value("field5.iv", Some(json!({ "schemaId": "component-b" })));
    let component = form
        .resolve("field5.iv")
        .and_then(FieldNode::as_component)
        .expect("component node");
    assert_eq!(component.schema_id(), Some("component-b"));
    assert!(component.field_node("inner").is_none());
    assert!(component.field_node("other").is_some());

    // An unknown discriminator yields an empty object, no error.
    form.set_value("field5.iv", Some(json!({ "schemaId": "deleted" })));
    let node = form.resolve("field5.iv").expect("component node");
    assert_eq!(node.value(), Some(json!({})));
    assert!(node.as_component().unwrap().fields.is_empty());
}

#[test]
fn test_hide_rule_propagates_into_partitions() {
    let mut form = build_form();

    form.load(&json!({ "field2": { "iv": 120 } }), true);
    assert!(form.field("field1").unwrap().is_hidden());
    for (_, node) in form.field("field1").unwrap().partitions() {
        assert!(node.is_hidden());
    }

    // A live edit flips it back after the pass runs.
    form.set_value("field2.iv", Some(json!(99)));
    form.flush();
    assert!(!form.field("field1").unwrap().is_hidden());
    for (_, node) in form.field("field1").unwrap().partitions() {
        assert!(!node.is_hidden());
    }
}

#[test]
fn test_hidden_flip_emits_events_once() {
    let mut form = build_form();
    form.drain_events();

    form.set_value("field2.iv", Some(json!(120)));
    form.flush();
    let hides: Vec<FormEvent> = form
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, FormEvent::HiddenChanged { hidden: true, .. }))
        .collect();
    assert!(
        hides
            .iter()
            .any(|e| matches!(e, FormEvent::HiddenChanged { path, .. } if path == "field1"))
    );

    // A second pass with unchanged data emits nothing new.
    form.flush();
    assert!(form.drain_events().is_empty());
}

#[test]
fn test_sections_split_at_separators_and_aggregate_hidden() {
    let mut form = build_form();

    let sections = form.sections();
    assert_eq!(sections.len(), 2);
    let names: Vec<&str> = sections[0].fields.iter().map(String::as_str).collect();
    assert_eq!(names, ["field1", "field2", "field3", "field4", "field5"]);
    let names: Vec<&str> = sections[1].fields.iter().map(String::as_str).collect();
    assert_eq!(names, ["field6"]);
    assert!(!sections[0].hidden);

    // A section hides only when every member field is hidden; hiding
    // one of five is not enough.
    form.load(&json!({ "field2": { "iv": 120 } }), true);
    assert!(!form.sections()[0].hidden);
}

#[test]
fn test_has_changed_and_submit_lifecycle() {
    let mut form = build_form();
    assert!(!form.has_changed());

    form.set_value("field1.en", Some(json!("hello")));
    assert!(form.has_changed());

    form.submit();
    assert!(form.is_submitting());
    form.submit_failed();
    assert!(!form.is_submitting());
    assert!(form.has_changed());

    form.submit();
    form.submit_completed();
    assert!(!form.has_changed());
}

#[test]
fn test_load_initial_rebaselines_snapshot() {
    let mut form = build_form();
    form.set_value("field1.en", Some(json!("draft")));
    assert!(form.has_changed());

    form.load(&json!({ "field1": { "en": "saved" } }), true);
    assert!(!form.has_changed());

    form.load(&json!({ "field1": { "en": "other" } }), false);
    assert!(form.has_changed());
}

#[test]
fn test_flattened_value_shape() {
    let mut form = build_form();
    form.set_value("field1.en", Some(json!("hello")));
    form.set_value("field2.iv", Some(json!(7)));

    let value = form.value();
    assert_eq!(value["field1"], json!({ "en": "hello" }));
    assert_eq!(value["field2"], json!({ "iv": 7 }));
    // UI separators never appear in the wire value.
    assert!(value.get("separator").is_none());
}

#[test]
fn test_disable_rule_and_context_swap() {
    let mut schema = Schema::new("ctx-schema", "Ctx");
    schema.fields.push(string_field(1, "locked"));
    schema.field_rules.push(FieldRule::new(
        RuleAction::Disable,
        "locked",
        "user.role == 'viewer'",
    ));

    let mut form = ContentFormTree::new(
        languages(),
        schema,
        [],
        RuleContext::default(),
        FormOptions::default(),
    );
    assert!(!form.control("locked.iv").unwrap().is_disabled());

    // Swapping the context re-runs the pass without touching values.
    form.set_context(RuleContext {
        user: json!({ "role": "viewer" }),
        ctx: json!(null),
    });
    assert!(form.control("locked.iv").unwrap().is_disabled());
}

#[test]
fn test_field_display_per_variant() {
    use std::time::Duration;

    assert_eq!(
        field_display(&string_field(1, "s"), Some(&json!("hello")), None),
        "hello"
    );
    assert_eq!(
        field_display(
            &FieldSchema::new(2, "b", FieldType::Boolean),
            Some(&json!(true)),
            None
        ),
        "Yes"
    );
    assert_eq!(
        field_display(
            &FieldSchema::new(3, "n", FieldType::Number),
            Some(&json!(42.0)),
            None
        ),
        "42"
    );
    assert_eq!(
        field_display(
            &FieldSchema::new(4, "list", FieldType::Array { fields: vec![] }),
            Some(&json!([{}, {}])),
            None
        ),
        "2 Items"
    );

    // Only reference-like fields consult the resolver.
    let mut resolver = ResolverQueue::new(Duration::from_millis(0));
    resolver.fulfill([("id1".to_string(), json!({ "name": "Asset One" }))]);
    let refs = FieldSchema::new(5, "refs", FieldType::References);
    assert_eq!(
        field_display(&refs, Some(&json!(["id1", "id2"])), Some(&resolver)),
        "Asset One, id2"
    );
}

#[test]
fn test_require_rule_rebuilds_validators() {
    let mut schema = Schema::new("req-schema", "Req");
    schema.fields.push(string_field(1, "a"));
    schema.fields.push(FieldSchema::new(2, "b", FieldType::Number));
    schema.field_rules.push(FieldRule::new(
        RuleAction::Require,
        "a",
        "data.b.iv > 10",
    ));

    let mut form = ContentFormTree::new(
        languages(),
        schema,
        [],
        RuleContext::default(),
        FormOptions::default(),
    );
    assert!(form.control("a.iv").unwrap().is_valid());

    form.set_value("b.iv", Some(json!(11)));
    form.flush();
    let control = form.control("a.iv").unwrap();
    assert!(control.is_required());
    assert_eq!(control.errors(), vec![ValidationIssue::Required]);

    form.set_value("b.iv", Some(json!(5)));
    form.flush();
    assert!(form.control("a.iv").unwrap().is_valid());
}
