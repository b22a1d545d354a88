use chrono::Utc;
use serde::Serialize;

use crate::schema::field_model::{ErrorMap, Form};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    Open,
    Change,
    Submit,
}

/// One line of the session trace (JSONL).
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: i64,
    pub step: u64,
    pub kind: SessionEventKind,

    pub form: String,
    pub schema_fingerprint: String,

    pub field: Option<String>,
    pub derived_fields: usize,

    pub error_count: Option<usize>,
    pub errors: Vec<String>,
    pub accepted: Option<bool>,
}

impl TraceEvent {
    pub fn now(step: u64, kind: SessionEventKind, form: &Form) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            step,
            kind,
            form: form.name.clone(),
            schema_fingerprint: schema_fingerprint(form),
            field: None,
            derived_fields: form.fields.iter().filter(|f| f.active_formula().is_some()).count(),
            error_count: None,
            errors: vec![],
            accepted: None,
        }
    }

    pub fn with_field(mut self, id: impl ToString) -> Self {
        self.field = Some(id.to_string());
        self
    }

    /// Record a validation pass. Errors are listed as `id: message`, sorted.
    pub fn with_errors(mut self, errors: &ErrorMap) -> Self {
        let mut lines: Vec<String> = errors
            .iter()
            .map(|(id, msg)| format!("{}: {}", id, msg))
            .collect();
        lines.sort();
        self.error_count = Some(errors.len());
        self.accepted = Some(errors.is_empty());
        self.errors = lines;
        self
    }
}

/// SHA-1 of the serialized field list. Ties trace lines to one schema
/// version, since forms are rebuilt rather than edited in place.
pub fn schema_fingerprint(form: &Form) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    match serde_json::to_vec(&form.fields) {
        Ok(bytes) => hasher.update(&bytes),
        Err(_) => hasher.update(form.name.as_bytes()),
    }
    format!("{:x}", hasher.finalize())
}
