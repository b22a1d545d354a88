use serde_json::Value;

use crate::engine::session::{control_state, ControlState, PreviewSession, SubmitOutcome};
use crate::engine::validate::is_missing;
use crate::schema::field_model::{Field, FieldType};

// ============================================================================
// Console renderer: a form preview as terminal text
// ============================================================================

/// Render every field of a session in display order.
///
/// Produces output like:
/// ```text
/// === Preview: Signup ===
///
/// Email * (text)
///     a@b
///     ! Invalid email
/// Total (number) [read-only]
///     42
/// Plan (radio)
///     ( ) Free
///     (•) Pro
/// ```
pub fn format_preview(session: &PreviewSession) -> String {
    let form = session.form();
    let mut out = String::new();

    let title = if form.name.is_empty() { "(unsaved form)" } else { form.name.as_str() };
    out.push_str(&format!("=== Preview: {} ===\n\n", title));

    if form.fields.is_empty() {
        out.push_str("(no fields)\n");
    }

    for field in &form.fields {
        out.push_str(&field_header(field));
        out.push('\n');

        let value = session.value(&field.id);
        for line in field_body(field, value) {
            out.push_str(&format!("    {}\n", line));
        }

        if let Some(error) = session.error(&field.id) {
            out.push_str(&format!("    ! {}\n", error));
        }
    }

    out
}

/// Summary printed after a submit.
pub fn format_outcome(outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Accepted => "Form valid!\n".to_string(),
        SubmitOutcome::Blocked(errors) => {
            let noun = if errors.len() == 1 { "error" } else { "errors" };
            format!("Submission blocked: {} {}\n", errors.len(), noun)
        }
    }
}

fn field_header(field: &Field) -> String {
    let label = if field.label.is_empty() { field.id.as_str() } else { field.label.as_str() };
    let mut header = label.to_string();
    if field.required {
        header.push_str(" *");
    }
    header.push_str(&format!(" ({})", field.field_type));
    match control_state(field) {
        ControlState::Editable => {}
        ControlState::ReadOnly => header.push_str(" [read-only]"),
        ControlState::Disabled => header.push_str(" [disabled]"),
    }
    header
}

fn field_body(field: &Field, value: Option<&Value>) -> Vec<String> {
    let options = field.option_list();
    match field.field_type {
        FieldType::Select | FieldType::Radio => {
            let chosen = value.and_then(Value::as_str).unwrap_or("");
            options
                .iter()
                .map(|opt| {
                    let mark = if opt == chosen { "(\u{2022})" } else { "( )" };
                    format!("{} {}", mark, opt)
                })
                .collect()
        }
        FieldType::Checkbox => options
            .iter()
            .map(|opt| {
                let checked = value
                    .and_then(Value::as_object)
                    .and_then(|m| m.get(opt))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                format!("[{}] {}", if checked { "x" } else { " " }, opt)
            })
            .collect(),
        _ => vec![display_value(value)],
    }
}

/// Text shown in a simple input. Falsy values show as blank.
pub fn display_value(value: Option<&Value>) -> String {
    if is_missing(value) {
        return String::new();
    }
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
