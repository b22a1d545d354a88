use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Current value of every field in one form being filled in, keyed by field id.
pub type ValueSet = HashMap<String, Value>;

/// One message per failing field, keyed by field id.
pub type ErrorMap = HashMap<String, String>;

/// A saved form. Stored as JSON; field keys keep the camelCase names the
/// builder has always written (`defaultValue`, `minLength`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Form {
    /// Name given at save time
    #[serde(default)]
    pub name: String,

    /// When the form was saved. `None` for a form still being built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Ordered field list (display order)
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Form {
    /// Unsaved form with the given fields.
    pub fn draft(fields: Vec<Field>) -> Self {
        Self {
            name: String::new(),
            created: None,
            fields,
        }
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// The kind of input control a field renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
        }
    }

    /// Select, radio and checkbox render from an option list.
    pub fn has_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }
}

// Unknown type names render as a plain text input
impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "number" => FieldType::Number,
            "textarea" => FieldType::Textarea,
            "select" => FieldType::Select,
            "radio" => FieldType::Radio,
            "checkbox" => FieldType::Checkbox,
            "date" => FieldType::Date,
            _ => FieldType::Text,
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initial value of a field when a form is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Explicit `null`
    Empty,
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
    /// Checkbox groups: option → checked
    Choices(BTreeMap<String, bool>),
}

impl Default for DefaultValue {
    fn default() -> Self {
        DefaultValue::Text(String::new())
    }
}

impl DefaultValue {
    pub fn to_value(&self) -> Value {
        match self {
            DefaultValue::Empty => Value::Null,
            DefaultValue::Flag(b) => Value::Bool(*b),
            DefaultValue::Number(n) => Value::Number(n.clone()),
            DefaultValue::Text(s) => Value::String(s.clone()),
            DefaultValue::Choices(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::Bool(*v)))
                    .collect(),
            ),
        }
    }
}

/// One input definition in a form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Stable id, assigned once and never reused
    pub id: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default_value: DefaultValue,

    /// Comma-separated option list (select, radio, checkbox)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,

    /// Minimum length, kept as entered
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<String>,

    /// Maximum length, kept as entered
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<String>,

    #[serde(default)]
    pub email: bool,

    /// Require a digit and at least 8 characters
    #[serde(default)]
    pub password: bool,

    /// Value is computed from `formula` instead of typed in
    #[serde(default)]
    pub derived: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    /// Comma-separated ids the formula reads. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<String>,
}

impl Field {
    /// A blank field of the given type, as the builder creates it.
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: String::new(),
            required: false,
            default_value: DefaultValue::default(),
            options: None,
            min_length: None,
            max_length: None,
            email: false,
            password: false,
            derived: false,
            formula: None,
            parents: None,
        }
    }

    /// Options split on commas and trimmed. Empty entries are dropped.
    pub fn option_list(&self) -> Vec<String> {
        split_list(self.options.as_deref())
    }

    /// Ids listed in `parents`.
    pub fn parent_ids(&self) -> Vec<String> {
        split_list(self.parents.as_deref())
    }

    /// The formula to evaluate, if this field is derived and has one.
    pub fn active_formula(&self) -> Option<&str> {
        if !self.derived {
            return None;
        }
        self.formula.as_deref().filter(|f| !f.trim().is_empty())
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Length bounds arrive as strings from the builder but hand-written schemas
/// often use plain numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
