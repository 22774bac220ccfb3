use serde_json::Value;

use crate::resolver::ResolverQueue;
use crate::schema::{FieldSchema, FieldType};

/// Formats a field value for list views and summaries.
///
/// Behavior is deliberately per-variant, not unified: only Assets and
/// References consult resolved reference display values; every other
/// variant formats the raw value.
pub fn field_display(
    field: &FieldSchema,
    value: Option<&Value>,
    resolver: Option<&ResolverQueue>,
) -> String {
    let Some(value) = value else {
        return String::new();
    };
    if value.is_null() {
        return String::new();
    }

    match &field.field_type {
        FieldType::String | FieldType::RichText | FieldType::DateTime => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        FieldType::Number => match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
                _ => n.to_string(),
            },
            other => other.to_string(),
        },
        FieldType::Boolean => match value.as_bool() {
            Some(true) => "Yes".to_string(),
            Some(false) => "No".to_string(),
            None => value.to_string(),
        },
        FieldType::Geolocation => {
            match (
                value.get("latitude").and_then(Value::as_f64),
                value.get("longitude").and_then(Value::as_f64),
            ) {
                (Some(latitude), Some(longitude)) => format!("{}, {}", latitude, longitude),
                _ => String::new(),
            }
        }
        FieldType::Json => "<Json />".to_string(),
        FieldType::Tags => match value {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        },
        FieldType::Assets | FieldType::References => match value {
            Value::Array(ids) => ids
                .iter()
                .filter_map(Value::as_str)
                .map(|id| reference_display(id, resolver))
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        },
        FieldType::Array { .. } => count_display(value, "Item", "Items"),
        FieldType::Component { .. } => match value.get("schemaId").and_then(Value::as_str) {
            Some(id) => format!("{{ {} }}", id),
            None => "{ }".to_string(),
        },
        FieldType::Components { .. } => count_display(value, "Component", "Components"),
        FieldType::Ui => String::new(),
    }
}

/// The resolved item's display name when the resolver has it; the raw
/// id otherwise.
fn reference_display(id: &str, resolver: Option<&ResolverQueue>) -> String {
    resolver
        .and_then(|r| r.get(id))
        .and_then(|item| {
            item.get("name")
                .or_else(|| item.get("fileName"))
                .and_then(Value::as_str)
        })
        .unwrap_or(id)
        .to_string()
}

fn count_display(value: &Value, singular: &str, plural: &str) -> String {
    match value {
        Value::Array(items) if items.len() == 1 => format!("1 {}", singular),
        Value::Array(items) => format!("{} {}", items.len(), plural),
        _ => String::new(),
    }
}
