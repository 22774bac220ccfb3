use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::schema::{CalculatedDefault, FieldSchema, FieldType};

/// Resolves the default value for one field at one partition.
///
/// `None` means the value is absent (undefined on the wire), which is
/// distinct from an explicit `null` default. `now` is the evaluation
/// instant for the calculated DateTime variants; callers inject it so
/// resolution stays pure.
pub fn value_for(field: &FieldSchema, partition_key: &str, now: DateTime<Utc>) -> Option<Value> {
    let properties = &field.properties;

    if let Some(overrides) = &properties.default_values {
        if let Some(value) = overrides.get(partition_key) {
            return Some(value.clone());
        }
    }

    match (&field.field_type, properties.calculated_default_value) {
        (FieldType::DateTime, Some(CalculatedDefault::Today)) => {
            return Some(json!(format!("{}T00:00:00Z", now.format("%Y-%m-%d"))));
        }
        (FieldType::DateTime, Some(CalculatedDefault::Now)) => {
            return Some(json!(now.format("%Y-%m-%dT%H:%M:%SZ").to_string()));
        }
        (FieldType::Array { .. } | FieldType::Components { .. }, Some(CalculatedDefault::Null)) => {
            return None;
        }
        _ => {}
    }

    if let Some(value) = &properties.default_value {
        return Some(value.clone());
    }

    match &field.field_type {
        FieldType::String
        | FieldType::RichText
        | FieldType::Number
        | FieldType::Boolean
        | FieldType::DateTime
        | FieldType::Geolocation
        | FieldType::Json
        | FieldType::Tags
        | FieldType::Assets
        | FieldType::References
        | FieldType::Component { .. }
        | FieldType::Ui => None,
        FieldType::Array { .. } | FieldType::Components { .. } => Some(json!([])),
    }
}
