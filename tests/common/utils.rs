#![allow(dead_code)]

use form_preview::schema::field_model::{DefaultValue, Field, FieldType, Form, ValueSet};
use serde_json::Value;

pub fn field(id: &str, field_type: FieldType) -> Field {
    let mut f = Field::new(id, field_type);
    f.label = id.to_uppercase();
    f
}

pub fn text_field(id: &str) -> Field {
    field(id, FieldType::Text)
}

pub fn number_with_default(id: &str, default: &str) -> Field {
    let mut f = field(id, FieldType::Number);
    f.default_value = DefaultValue::Text(default.to_string());
    f
}

pub fn derived_field(id: &str, formula: &str) -> Field {
    let mut f = field(id, FieldType::Number);
    f.derived = true;
    f.formula = Some(formula.to_string());
    f
}

pub fn options_field(id: &str, field_type: FieldType, options: &str) -> Field {
    let mut f = field(id, field_type);
    f.options = Some(options.to_string());
    f
}

/// A(default "2"), B(default "3"), Sum = A + B
pub fn calc_form() -> Form {
    Form {
        name: "Calc".into(),
        created: None,
        fields: vec![
            number_with_default("A", "2"),
            number_with_default("B", "3"),
            derived_field("Sum", "Number(values.A)+Number(values.B)"),
        ],
    }
}

pub fn values(pairs: &[(&str, Value)]) -> ValueSet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
