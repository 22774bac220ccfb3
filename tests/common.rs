//! Common test utilities for building schemas, languages and content.
use katachi::prelude::*;
use serde_json::json;

/// `en` is the master language, `de` is optional.
#[allow(dead_code)]
pub fn languages() -> Vec<Language> {
    vec![Language::master("en"), Language::optional("de")]
}

#[allow(dead_code)]
pub fn string_field(id: u64, name: &str) -> FieldSchema {
    FieldSchema::new(id, name, FieldType::String)
}

/// Component with a string field `inner` and a number field `count`,
/// plus one rule referencing a sibling by unqualified name.
#[allow(dead_code)]
pub fn component_a() -> Schema {
    let mut schema = Schema::new("component-a", "Component A");
    schema.fields.push(string_field(11, "inner"));
    schema
        .fields
        .push(FieldSchema::new(12, "count", FieldType::Number));
    schema
        .field_rules
        .push(FieldRule::new(RuleAction::Hide, "inner", "data.count > 5"));
    schema
}

#[allow(dead_code)]
pub fn component_b() -> Schema {
    let mut schema = Schema::new("component-b", "Component B");
    schema
        .fields
        .push(FieldSchema::new(21, "other", FieldType::Number));
    schema
}

/// The shared test schema:
///
/// - `field1`: localizable string, hidden while `field2.iv > 100`
/// - `field2`: invariant number
/// - `field3`: required localizable string
/// - `field4`: invariant array with a disabled nested string
///   (default `"banana"`) and a nested boolean
/// - `field5`: component (A or B), `field5.inner` hidden while
///   `field2.iv > 100`
/// - a UI separator
/// - `field6`: components list (A or B)
#[allow(dead_code)]
pub fn test_schema() -> Schema {
    let mut schema = Schema::new("my-schema", "My Schema");

    let mut field1 = string_field(1, "field1");
    field1.is_localizable = true;
    schema.fields.push(field1);

    schema
        .fields
        .push(FieldSchema::new(2, "field2", FieldType::Number));

    let mut field3 = string_field(3, "field3");
    field3.is_localizable = true;
    field3.properties.is_required = true;
    schema.fields.push(field3);

    let mut nested42 = string_field(42, "nested42");
    nested42.is_disabled = true;
    nested42.properties.default_value = Some(json!("banana"));
    let nested43 = FieldSchema::new(43, "nested43", FieldType::Boolean);
    schema.fields.push(FieldSchema::new(
        4,
        "field4",
        FieldType::Array {
            fields: vec![nested42, nested43],
        },
    ));

    schema.fields.push(FieldSchema::new(
        5,
        "field5",
        FieldType::Component {
            schema_ids: vec!["component-a".to_string(), "component-b".to_string()],
        },
    ));

    schema
        .fields
        .push(FieldSchema::new(90, "separator", FieldType::Ui));

    schema.fields.push(FieldSchema::new(
        6,
        "field6",
        FieldType::Components {
            schema_ids: vec!["component-a".to_string(), "component-b".to_string()],
        },
    ));

    schema.field_rules.push(FieldRule::new(
        RuleAction::Hide,
        "field1",
        "data.field2.iv > 100",
    ));
    schema.field_rules.push(FieldRule::new(
        RuleAction::Hide,
        "field5.inner",
        "data.field2.iv > 100",
    ));

    schema
}

#[allow(dead_code)]
pub fn build_form() -> ContentFormTree {
    ContentFormTree::new(
        languages(),
        test_schema(),
        [component_a(), component_b()],
        RuleContext::default(),
        FormOptions::default(),
    )
}
