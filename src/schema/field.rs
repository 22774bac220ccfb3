use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::FieldRule;

/// The closed set of field types a schema can declare.
///
/// Every dispatch over this union (defaults, validators, formatting) is
/// an exhaustive `match`, so adding a variant fails compilation until
/// all sites handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    String,
    RichText,
    Number,
    Boolean,
    DateTime,
    Geolocation,
    Json,
    Tags,
    Assets,
    References,
    /// A list of objects whose shape is given by `fields`.
    Array {
        #[serde(default)]
        fields: Vec<FieldSchema>,
    },
    /// A single nested object discriminated by a component-schema id.
    Component {
        #[serde(default)]
        schema_ids: Vec<String>,
    },
    /// A list of component objects, each discriminated individually.
    Components {
        #[serde(default)]
        schema_ids: Vec<String>,
    },
    /// A presentational separator; never carries data.
    #[serde(rename = "UI")]
    Ui,
}

impl FieldType {
    /// UI fields split the form into sections and are not data fields.
    pub fn is_content(&self) -> bool {
        !matches!(self, FieldType::Ui)
    }
}

/// Calculated default variants. `Today`/`Now` apply to DateTime fields,
/// `Null` to Array/Components (value absent instead of `[]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculatedDefault {
    Today,
    Now,
    Null,
}

/// Declarative constraints and editor hints for one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldProperties {
    pub is_required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    pub pattern: Option<String>,
    pub pattern_message: Option<String>,
    pub allowed_values: Option<Vec<Value>>,
    pub default_value: Option<Value>,
    /// Per-partition overrides, keyed by partition key.
    pub default_values: Option<AHashMap<String, Value>>,
    pub calculated_default_value: Option<CalculatedDefault>,
    /// Uniqueness across these named subfields of array items.
    pub unique_fields: Option<Vec<String>>,
    pub editor: Option<String>,
    pub tags: Vec<String>,
}

/// One field of a content schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub id: u64,
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub properties: FieldProperties,
    #[serde(default)]
    pub is_localizable: bool,
    #[serde(default)]
    pub is_disabled: bool,
}

impl FieldSchema {
    pub fn new(id: u64, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id,
            name: name.into(),
            field_type,
            properties: FieldProperties::default(),
            is_localizable: false,
            is_disabled: false,
        }
    }
}

/// A content schema: ordered fields plus declarative field rules.
/// Component schemas use the same shape, looked up by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    #[serde(default)]
    pub field_rules: Vec<FieldRule>,
}

impl Schema {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: Vec::new(),
            field_rules: Vec::new(),
        }
    }
}

