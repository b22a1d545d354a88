use serde_json::{Map, Value};

use crate::engine::propagate::propagate_with;
use crate::engine::validate::{is_missing, validate};
use crate::error::FormError;
use crate::formula::evaluator::{ExpressionEvaluator, FormulaEvaluator};
use crate::schema::field_model::{ErrorMap, Field, FieldType, Form, ValueSet};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{SessionEventKind, TraceEvent};

/// How a field's control accepts input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Editable,
    /// Derived text-like inputs: shown, focusable, not editable
    ReadOnly,
    /// Derived option inputs (select, radio, checkbox)
    Disabled,
}

pub fn control_state(field: &Field) -> ControlState {
    match (field.derived, field.field_type.has_options()) {
        (false, _) => ControlState::Editable,
        (true, true) => ControlState::Disabled,
        (true, false) => ControlState::ReadOnly,
    }
}

/// Result of pressing submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Blocked(ErrorMap),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted)
    }
}

/// Initial values: each field's default, with falsy defaults replaced by `""`.
pub fn seed_values(fields: &[Field]) -> ValueSet {
    fields
        .iter()
        .map(|f| {
            let value = f.default_value.to_value();
            let value = if is_missing(Some(&value)) {
                Value::String(String::new())
            } else {
                value
            };
            (f.id.clone(), value)
        })
        .collect()
}

/// One form being filled in.
///
/// Owns the value set and the error map. Every edit replaces the value set
/// with the result of a full propagation; every submit replaces the error map.
pub struct PreviewSession {
    form: Form,
    values: ValueSet,
    errors: ErrorMap,
    step: u64,
    evaluator: Box<dyn FormulaEvaluator>,
    tracer: TraceLogger,
}

impl PreviewSession {
    /// Open a form with the built-in formula language and no trace.
    pub fn open(form: Form) -> Self {
        Self::open_with(form, Box::new(ExpressionEvaluator), TraceLogger::disabled())
    }

    pub fn open_with(form: Form, evaluator: Box<dyn FormulaEvaluator>, tracer: TraceLogger) -> Self {
        let seeded = seed_values(&form.fields);
        let values = propagate_with(evaluator.as_ref(), &form.fields, seeded);

        tracer.log(&TraceEvent::now(0, SessionEventKind::Open, &form));
        tracing::debug!(form = %form.name, fields = form.fields.len(), "preview opened");

        Self {
            form,
            values,
            errors: ErrorMap::new(),
            step: 0,
            evaluator,
            tracer,
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn values(&self) -> &ValueSet {
        &self.values
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    /// Errors from the last submit. Empty before the first one.
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn error(&self, id: &str) -> Option<&str> {
        self.errors.get(id).map(String::as_str)
    }

    /// Store a raw value for one field and recompute all derived fields.
    pub fn set_value(&mut self, id: &str, value: Value) -> Result<(), FormError> {
        let field = self.editable_field(id)?;
        let field_id = field.id.clone();

        let mut next = self.values.clone();
        next.insert(field_id.clone(), value);
        self.values = propagate_with(self.evaluator.as_ref(), &self.form.fields, next);

        self.step += 1;
        self.tracer.log(
            &TraceEvent::now(self.step, SessionEventKind::Change, &self.form).with_field(&field_id),
        );
        Ok(())
    }

    pub fn set_text(&mut self, id: &str, text: &str) -> Result<(), FormError> {
        self.set_value(id, Value::String(text.to_string()))
    }

    /// Pick one option of a select or radio field. On a checkbox group
    /// this checks the option.
    pub fn choose(&mut self, id: &str, option: &str) -> Result<(), FormError> {
        self.set_option(id, option, true)
    }

    /// Check or uncheck one option. Select and radio hold a single choice,
    /// so unchecking there clears the value.
    pub fn set_option(&mut self, id: &str, option: &str, checked: bool) -> Result<(), FormError> {
        let field = self.editable_field(id)?;
        let option = option.trim();
        if !field.field_type.has_options() || !field.option_list().iter().any(|o| o == option) {
            return Err(FormError::UnknownOption {
                field: id.to_string(),
                option: option.to_string(),
            });
        }

        if field.field_type != FieldType::Checkbox {
            let value = if checked { option } else { "" };
            return self.set_value(id, Value::String(value.to_string()));
        }

        let mut current = match self.values.get(id) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        current.insert(option.to_string(), Value::Bool(checked));
        self.set_value(id, Value::Object(current))
    }

    /// Validate the current values. Blocks when any field fails.
    pub fn submit(&mut self) -> SubmitOutcome {
        self.errors = validate(&self.form.fields, &self.values);

        self.step += 1;
        self.tracer.log(
            &TraceEvent::now(self.step, SessionEventKind::Submit, &self.form).with_errors(&self.errors),
        );

        if self.errors.is_empty() {
            tracing::info!(form = %self.form.name, "form submitted");
            SubmitOutcome::Accepted
        } else {
            tracing::debug!(form = %self.form.name, errors = self.errors.len(), "submission blocked");
            SubmitOutcome::Blocked(self.errors.clone())
        }
    }

    fn editable_field(&self, id: &str) -> Result<&Field, FormError> {
        let field = self
            .form
            .field(id)
            .ok_or_else(|| FormError::UnknownField(id.to_string()))?;
        if field.derived {
            return Err(FormError::ReadOnlyField(id.to_string()));
        }
        Ok(field)
    }
}
