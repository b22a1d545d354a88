use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::schema::field_model::{ErrorMap, Field, ValueSet};

/// Structural email check: `local@domain.tld`, no whitespace, one `@`.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").unwrap());

const MIN_PASSWORD_LEN: usize = 8;

/// Check every field against its rules.
///
/// Rules run in a fixed order (required, minLength, maxLength, email,
/// password) and each failure overwrites the previous message for that
/// field, so the last failing rule is the one reported. Fields that pass
/// are absent from the result.
pub fn validate(fields: &[Field], values: &ValueSet) -> ErrorMap {
    let mut errors = ErrorMap::new();

    for field in fields {
        let value = values.get(&field.id);

        if field.required && is_missing(value) {
            errors.insert(field.id.clone(), "Required".to_string());
        }

        // Length rules only look at text values
        if let Some(Value::String(text)) = value {
            let len = text.encode_utf16().count() as i64;

            if let Some(raw) = field.min_length.as_deref() {
                if parse_bound(raw).is_some_and(|min| len < min) {
                    errors.insert(field.id.clone(), format!("Min {}", raw));
                }
            }

            if let Some(raw) = field.max_length.as_deref() {
                if parse_bound(raw).is_some_and(|max| len > max) {
                    errors.insert(field.id.clone(), format!("Max {}", raw));
                }
            }
        }

        if is_missing(value) {
            continue;
        }
        let Some(text) = value.and_then(scalar_text) else {
            continue;
        };

        if field.email && !EMAIL_RE.is_match(&text) {
            errors.insert(field.id.clone(), "Invalid email".to_string());
        }

        if field.password && (!DIGIT_RE.is_match(&text) || text.encode_utf16().count() < MIN_PASSWORD_LEN) {
            errors.insert(field.id.clone(), "Weak password".to_string());
        }
    }

    errors
}

/// Whether a value counts as "not filled in".
///
/// Mirrors the falsy check the form has always used, so a numeric `0` or a
/// boolean `false` is missing too. A checkbox group is missing until at
/// least one option is checked.
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => !map.values().any(|v| v == &Value::Bool(true)),
    }
}

/// Parse a length bound the way `parseInt` does: leading whitespace,
/// optional sign, then digits. Anything else disables the rule.
pub fn parse_bound(raw: &str) -> Option<i64> {
    let text = raw.trim_start();
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let n = digits.parse::<i64>().ok()?;
    Some(if negative { -n } else { n })
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}
