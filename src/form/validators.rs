use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::schema::{FieldSchema, FieldType};

/// A user-facing validation finding for one control.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("Field is required")]
    Required,

    #[error("Must have at least {min} characters")]
    MinLength { min: usize },

    #[error("Must not have more than {max} characters")]
    MaxLength { max: usize },

    #[error("Must have at least {min} items")]
    MinItems { min: usize },

    #[error("Must not have more than {max} items")]
    MaxItems { max: usize },

    #[error("Must be at least {min}")]
    MinValue { min: String },

    #[error("Must not be greater than {max}")]
    MaxValue { max: String },

    #[error("{0}")]
    Pattern(String),

    #[error("Not an allowed value")]
    NotAllowed,

    #[error("Values must not contain duplicates")]
    DuplicateValues,

    #[error("Field '{field}' must be unique across items")]
    DuplicateFields { field: String },

    #[error("{0}")]
    Custom(String),
}

/// An externally supplied check, e.g. remote uniqueness.
pub type CustomCheck = Arc<dyn Fn(Option<&Value>) -> Option<ValidationIssue> + Send + Sync>;

/// One structural validator attached to a control.
#[derive(Clone)]
pub enum Validator {
    Required,
    MinLength(usize),
    MaxLength(usize),
    MinItems(usize),
    MaxItems(usize),
    MinValue(Value),
    MaxValue(Value),
    /// `regex` is `None` when the schema pattern failed to compile; the
    /// validator is then inert (construction never fails).
    Pattern {
        regex: Option<Arc<Regex>>,
        message: Option<String>,
    },
    AllowedValues {
        values: Vec<Value>,
        allow_null: bool,
    },
    AllowedItemValues {
        values: Vec<Value>,
    },
    UniqueItems,
    UniqueItemFields {
        fields: Vec<String>,
    },
    Custom(CustomCheck),
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Required => write!(f, "Required"),
            Validator::MinLength(min) => write!(f, "MinLength({min})"),
            Validator::MaxLength(max) => write!(f, "MaxLength({max})"),
            Validator::MinItems(min) => write!(f, "MinItems({min})"),
            Validator::MaxItems(max) => write!(f, "MaxItems({max})"),
            Validator::MinValue(min) => write!(f, "MinValue({min})"),
            Validator::MaxValue(max) => write!(f, "MaxValue({max})"),
            Validator::Pattern { regex, .. } => match regex {
                Some(r) => write!(f, "Pattern({})", r.as_str()),
                None => write!(f, "Pattern(<invalid>)"),
            },
            Validator::AllowedValues { values, allow_null } => {
                write!(f, "AllowedValues({values:?}, allow_null: {allow_null})")
            }
            Validator::AllowedItemValues { values } => {
                write!(f, "AllowedItemValues({values:?})")
            }
            Validator::UniqueItems => write!(f, "UniqueItems"),
            Validator::UniqueItemFields { fields } => write!(f, "UniqueItemFields({fields:?})"),
            Validator::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

impl Validator {
    /// Checks one value. Structural validators skip absent/empty values;
    /// only `Required` fires on them.
    pub fn check(&self, value: Option<&Value>) -> Option<ValidationIssue> {
        match self {
            Validator::Required => is_empty(value).then_some(ValidationIssue::Required),
            Validator::MinLength(min) => match value {
                Some(Value::String(s)) if !s.is_empty() && s.chars().count() < *min => {
                    Some(ValidationIssue::MinLength { min: *min })
                }
                _ => None,
            },
            Validator::MaxLength(max) => match value {
                Some(Value::String(s)) if s.chars().count() > *max => {
                    Some(ValidationIssue::MaxLength { max: *max })
                }
                _ => None,
            },
            Validator::MinItems(min) => match value {
                Some(Value::Array(items)) if !items.is_empty() && items.len() < *min => {
                    Some(ValidationIssue::MinItems { min: *min })
                }
                _ => None,
            },
            Validator::MaxItems(max) => match value {
                Some(Value::Array(items)) if items.len() > *max => {
                    Some(ValidationIssue::MaxItems { max: *max })
                }
                _ => None,
            },
            Validator::MinValue(min) => {
                let value = value?;
                if is_empty(Some(value)) {
                    return None;
                }
                match compare(value, min) {
                    Some(std::cmp::Ordering::Less) => Some(ValidationIssue::MinValue {
                        min: format_bound(min),
                    }),
                    _ => None,
                }
            }
            Validator::MaxValue(max) => {
                let value = value?;
                if is_empty(Some(value)) {
                    return None;
                }
                match compare(value, max) {
                    Some(std::cmp::Ordering::Greater) => Some(ValidationIssue::MaxValue {
                        max: format_bound(max),
                    }),
                    _ => None,
                }
            }
            Validator::Pattern { regex, message } => {
                let Some(regex) = regex else { return None };
                match value {
                    Some(Value::String(s)) if !s.is_empty() && !regex.is_match(s) => {
                        let message = message
                            .clone()
                            .unwrap_or_else(|| "Does not match the expected pattern".to_string());
                        Some(ValidationIssue::Pattern(message))
                    }
                    _ => None,
                }
            }
            Validator::AllowedValues { values, allow_null } => match value {
                None => None,
                Some(Value::Null) => (!*allow_null).then_some(ValidationIssue::NotAllowed),
                Some(v) => (!values.contains(v)).then_some(ValidationIssue::NotAllowed),
            },
            Validator::AllowedItemValues { values } => match value {
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|item| !values.contains(item))
                    .then_some(ValidationIssue::NotAllowed),
                _ => None,
            },
            Validator::UniqueItems => match value {
                Some(Value::Array(items)) => {
                    for (i, item) in items.iter().enumerate() {
                        if items[i + 1..].contains(item) {
                            return Some(ValidationIssue::DuplicateValues);
                        }
                    }
                    None
                }
                _ => None,
            },
            Validator::UniqueItemFields { fields } => match value {
                Some(Value::Array(items)) => {
                    for field in fields {
                        let mut seen: Vec<&Value> = Vec::new();
                        for item in items {
                            let Some(v) = item.get(field) else { continue };
                            if v.is_null() {
                                continue;
                            }
                            if seen.contains(&v) {
                                return Some(ValidationIssue::DuplicateFields {
                                    field: field.clone(),
                                });
                            }
                            seen.push(v);
                        }
                    }
                    None
                }
                _ => None,
            },
            Validator::Custom(check) => check(value),
        }
    }
}

fn format_bound(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Runs every validator against a value, collecting all findings.
pub fn validate(value: Option<&Value>, validators: &[Validator]) -> Vec<ValidationIssue> {
    validators
        .iter()
        .filter_map(|v| v.check(value))
        .collect()
}

/// Builds the validator list for one field at one partition.
///
/// Each type contributes its structural validators; the required
/// validator is appended last, only when the field is currently
/// required and the partition is not optional. The remote check (when
/// configured) applies to leaf value fields only.
pub fn for_field(
    field: &FieldSchema,
    is_required: bool,
    partition_optional: bool,
    remote: Option<&CustomCheck>,
) -> Vec<Validator> {
    let properties = &field.properties;
    let mut validators = Vec::new();

    let allowed = |allow_null: bool| {
        properties.allowed_values.clone().map(|values| Validator::AllowedValues {
            values,
            allow_null,
        })
    };

    match &field.field_type {
        FieldType::String | FieldType::RichText => {
            if let Some(min) = properties.min_length {
                validators.push(Validator::MinLength(min));
            }
            if let Some(max) = properties.max_length {
                validators.push(Validator::MaxLength(max));
            }
            if let Some(pattern) = &properties.pattern {
                validators.push(Validator::Pattern {
                    regex: Regex::new(&format!("^(?:{pattern})$")).ok().map(Arc::new),
                    message: properties.pattern_message.clone(),
                });
            }
            // Null stays allowed while the field is not required.
            validators.extend(allowed(!is_required));
        }
        FieldType::Number => {
            if let Some(min) = &properties.min_value {
                validators.push(Validator::MinValue(min.clone()));
            }
            if let Some(max) = &properties.max_value {
                validators.push(Validator::MaxValue(max.clone()));
            }
            validators.extend(allowed(!is_required));
        }
        FieldType::Boolean | FieldType::Geolocation | FieldType::Json => {}
        FieldType::DateTime => {
            if let Some(min) = &properties.min_value {
                validators.push(Validator::MinValue(min.clone()));
            }
            if let Some(max) = &properties.max_value {
                validators.push(Validator::MaxValue(max.clone()));
            }
        }
        FieldType::Tags => {
            if let Some(min) = properties.min_items {
                validators.push(Validator::MinItems(min));
            }
            if let Some(max) = properties.max_items {
                validators.push(Validator::MaxItems(max));
            }
            if let Some(values) = properties.allowed_values.clone() {
                validators.push(Validator::AllowedItemValues { values });
            }
        }
        FieldType::Assets => {
            if let Some(min) = properties.min_items {
                validators.push(Validator::MinItems(min));
            }
            if let Some(max) = properties.max_items {
                validators.push(Validator::MaxItems(max));
            }
        }
        FieldType::References => {
            if let Some(min) = properties.min_items {
                validators.push(Validator::MinItems(min));
            }
            if let Some(max) = properties.max_items {
                validators.push(Validator::MaxItems(max));
            }
            validators.push(Validator::UniqueItems);
        }
        FieldType::Array { .. } | FieldType::Components { .. } => {
            if let Some(min) = properties.min_items {
                validators.push(Validator::MinItems(min));
            }
            if let Some(max) = properties.max_items {
                validators.push(Validator::MaxItems(max));
            }
            if let Some(fields) = properties.unique_fields.clone() {
                validators.push(Validator::UniqueItemFields { fields });
            }
        }
        FieldType::Component { .. } => {}
        FieldType::Ui => return validators,
    }

    if is_required && !partition_optional {
        validators.push(Validator::Required);
    }

    if let Some(remote) = remote {
        if !matches!(
            field.field_type,
            FieldType::Array { .. }
                | FieldType::Component { .. }
                | FieldType::Components { .. }
                | FieldType::Ui
        ) {
            validators.push(Validator::Custom(remote.clone()));
        }
    }

    validators
}
