mod common;

use common::utils::{calc_form, derived_field, field, options_field, text_field};
use form_preview::engine::session::{control_state, seed_values, ControlState, PreviewSession, SubmitOutcome};
use form_preview::error::FormError;
use form_preview::formula::evaluator::ExpressionEvaluator;
use form_preview::schema::field_model::{DefaultValue, FieldType, Form};
use form_preview::trace::logger::TraceLogger;
use serde_json::{json, Value};

fn terms_form() -> Form {
    let mut terms = options_field("terms", FieldType::Checkbox, "Yes,No");
    terms.required = true;
    Form::draft(vec![terms])
}

// =========================================================================
// Opening a form
// =========================================================================

#[test]
fn open_seeds_defaults_and_derives() {
    let session = PreviewSession::open(calc_form());
    assert_eq!(session.value("A"), Some(&json!("2")));
    assert_eq!(session.value("B"), Some(&json!("3")));
    assert_eq!(session.value("Sum"), Some(&json!(5)));
    assert!(session.errors().is_empty());
}

#[test]
fn falsy_defaults_seed_as_blank() {
    let mut flag = field("flag", FieldType::Text);
    flag.default_value = DefaultValue::Flag(false);
    let mut empty = field("empty", FieldType::Text);
    empty.default_value = DefaultValue::Empty;
    let mut choices = options_field("c", FieldType::Checkbox, "a,b");
    choices.default_value = DefaultValue::Choices([("a".to_string(), true)].into_iter().collect());

    let seeded = seed_values(&[flag, empty, choices]);
    assert_eq!(seeded["flag"], json!(""));
    assert_eq!(seeded["empty"], json!(""));
    assert_eq!(seeded["c"], json!({"a": true}));
}

// =========================================================================
// Editing
// =========================================================================

#[test]
fn edit_recomputes_derived_fields() {
    let mut session = PreviewSession::open(calc_form());
    session.set_text("A", "4").unwrap();
    assert_eq!(session.value("Sum"), Some(&json!(7)));
    assert_eq!(session.value("A"), Some(&json!("4")));
    assert_eq!(session.value("B"), Some(&json!("3")));
}

#[test]
fn derived_field_cannot_be_edited() {
    let mut session = PreviewSession::open(calc_form());
    let err = session.set_text("Sum", "100").unwrap_err();
    assert!(matches!(err, FormError::ReadOnlyField(id) if id == "Sum"));
    assert_eq!(session.value("Sum"), Some(&json!(5)));
}

#[test]
fn unknown_field_is_rejected() {
    let mut session = PreviewSession::open(calc_form());
    assert!(matches!(
        session.set_text("Nope", "1"),
        Err(FormError::UnknownField(_))
    ));
}

#[test]
fn checkbox_options_toggle() {
    let mut session = PreviewSession::open(terms_form());
    session.set_option("terms", "Yes", true).unwrap();
    assert_eq!(session.value("terms"), Some(&json!({"Yes": true})));

    session.set_option("terms", "No", true).unwrap();
    session.set_option("terms", "Yes", false).unwrap();
    assert_eq!(session.value("terms"), Some(&json!({"Yes": false, "No": true})));
}

#[test]
fn unknown_option_is_rejected() {
    let mut session = PreviewSession::open(terms_form());
    assert!(matches!(
        session.set_option("terms", "Maybe", true),
        Err(FormError::UnknownOption { .. })
    ));
}

#[test]
fn radio_choice_replaces_value() {
    let form = Form::draft(vec![options_field("plan", FieldType::Radio, "Free, Pro")]);
    let mut session = PreviewSession::open(form);

    session.choose("plan", "Pro").unwrap();
    assert_eq!(session.value("plan"), Some(&json!("Pro")));

    session.choose("plan", "Free").unwrap();
    assert_eq!(session.value("plan"), Some(&json!("Free")));

    session.set_option("plan", "Free", false).unwrap();
    assert_eq!(session.value("plan"), Some(&json!("")));
}

#[test]
fn derived_field_reads_checkbox_map() {
    let form = Form::draft(vec![
        options_field("terms", FieldType::Checkbox, "Yes,No"),
        derived_field("agreed", "values.terms.Yes ? 'agreed' : 'pending'"),
    ]);
    let mut session = PreviewSession::open(form);
    // terms seeds as "" so the member read yields undefined
    assert_eq!(session.value("agreed"), Some(&json!("pending")));

    session.choose("terms", "Yes").unwrap();
    assert_eq!(session.value("agreed"), Some(&json!("agreed")));
}

// =========================================================================
// Submitting
// =========================================================================

#[test]
fn required_checkbox_blocks_until_checked() {
    let mut session = PreviewSession::open(terms_form());

    match session.submit() {
        SubmitOutcome::Blocked(errors) => assert_eq!(errors["terms"], "Required"),
        SubmitOutcome::Accepted => panic!("Expected blocked submission"),
    }
    assert_eq!(session.error("terms"), Some("Required"));

    session.choose("terms", "Yes").unwrap();
    assert!(session.submit().is_accepted());
    assert!(session.errors().is_empty(), "Error map is replaced, not merged");
}

#[test]
fn required_derived_nan_blocks_submit() {
    let mut a = field("A", FieldType::Number);
    a.default_value = DefaultValue::Text("abc".into());
    let mut total = derived_field("Total", "Number(values.A) * 2");
    total.required = true;
    let mut session = PreviewSession::open(Form::draft(vec![a, total]));

    assert_eq!(session.value("Total"), Some(&Value::Null));
    match session.submit() {
        SubmitOutcome::Blocked(errors) => assert_eq!(errors["Total"], "Required"),
        SubmitOutcome::Accepted => panic!("NaN total must not satisfy required"),
    }

    session.set_text("A", "21").unwrap();
    assert_eq!(session.value("Total"), Some(&json!(42)));
    assert!(session.submit().is_accepted());
}

#[test]
fn nested_formula_does_not_break_the_form() {
    let deep = format!("{}1{}", "(".repeat(2_000), ")".repeat(2_000));
    let form = Form::draft(vec![text_field("t"), derived_field("d", &deep)]);
    let mut session = PreviewSession::open(form);

    assert_eq!(session.value("d"), Some(&json!("")));
    session.set_text("t", "x").unwrap();
    assert_eq!(session.value("d"), Some(&json!("")));
}

#[test]
fn errors_only_change_on_submit() {
    let mut email = text_field("email");
    email.email = true;
    let mut session = PreviewSession::open(Form::draft(vec![email]));

    session.set_text("email", "bad").unwrap();
    assert!(session.errors().is_empty());

    assert!(!session.submit().is_accepted());
    session.set_text("email", "a@b.co").unwrap();
    assert_eq!(session.error("email"), Some("Invalid email"));

    assert!(session.submit().is_accepted());
}

// =========================================================================
// Control state
// =========================================================================

#[test]
fn control_state_per_field_kind() {
    let plain = text_field("t");
    let derived_text = derived_field("d", "1");
    let mut derived_select = options_field("s", FieldType::Select, "a,b");
    derived_select.derived = true;

    assert_eq!(control_state(&plain), ControlState::Editable);
    assert_eq!(control_state(&derived_text), ControlState::ReadOnly);
    assert_eq!(control_state(&derived_select), ControlState::Disabled);
}

// =========================================================================
// Trace
// =========================================================================

#[test]
fn session_events_are_traced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");

    let mut session = PreviewSession::open_with(
        calc_form(),
        Box::new(ExpressionEvaluator),
        TraceLogger::open(&path),
    );
    session.set_text("A", "10").unwrap();
    session.submit();

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["kind"], "open");
    assert_eq!(events[0]["derived_fields"], 1);
    assert_eq!(events[1]["kind"], "change");
    assert_eq!(events[1]["field"], "A");
    assert_eq!(events[2]["kind"], "submit");
    assert_eq!(events[2]["accepted"], true);
    assert_eq!(events[0]["schema_fingerprint"], events[2]["schema_fingerprint"]);
}

#[test]
fn unwritable_trace_path_disables_tracing() {
    let dir = tempfile::tempdir().unwrap();
    let logger = TraceLogger::open(dir.path().join("missing").join("trace.jsonl"));
    assert!(!logger.is_enabled());

    // Session still works
    let mut session = PreviewSession::open_with(calc_form(), Box::new(ExpressionEvaluator), logger);
    session.set_text("B", "1").unwrap();
    assert_eq!(session.value("Sum"), Some(&json!(3)));
}
