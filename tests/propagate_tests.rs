mod common;

use common::utils::{calc_form, derived_field, number_with_default, text_field, values};
use form_preview::engine::propagate::{propagate, propagate_with};
use form_preview::engine::session::seed_values;
use form_preview::formula::evaluator::FormulaEvaluator;
use form_preview::formula::formula_model::FormulaError;
use form_preview::schema::field_model::ValueSet;
use serde_json::{json, Value};

// =========================================================================
// Derived values follow their inputs
// =========================================================================

#[test]
fn sum_is_computed_at_open_and_after_change() {
    let form = calc_form();

    let opened = propagate(&form.fields, seed_values(&form.fields));
    assert_eq!(opened["Sum"], json!(5));

    let mut edited = opened.clone();
    edited.insert("A".into(), json!("4"));
    let edited = propagate(&form.fields, edited);
    assert_eq!(edited["Sum"], json!(7));
}

#[test]
fn non_derived_values_are_untouched() {
    let form = calc_form();
    let mut input = seed_values(&form.fields);
    input.insert("A".into(), json!("not a number"));
    input.insert("B".into(), json!({"odd": true}));

    let out = propagate(&form.fields, input.clone());
    assert_eq!(out["A"], input["A"]);
    assert_eq!(out["B"], input["B"]);
}

#[test]
fn repeated_propagation_is_stable() {
    let form = calc_form();
    let once = propagate(&form.fields, seed_values(&form.fields));
    let twice = propagate(&form.fields, once.clone());
    assert_eq!(once, twice);
}

#[test]
fn unknown_reference_yields_empty_string() {
    let fields = vec![
        number_with_default("A", "1"),
        derived_field("Broken", "Number(values.ghost) + Number(values.A)"),
    ];
    let out = propagate(&fields, seed_values(&fields));
    assert_eq!(out["Broken"], json!(""));
}

// =========================================================================
// Single pass in declaration order
// =========================================================================

#[test]
fn earlier_derived_values_are_fresh() {
    let fields = vec![
        number_with_default("A", "2"),
        derived_field("Double", "Number(values.A) * 2"),
        derived_field("Quad", "Number(values.Double) * 2"),
    ];
    let out = propagate(&fields, seed_values(&fields));
    assert_eq!(out["Double"], json!(4));
    assert_eq!(out["Quad"], json!(8));
}

#[test]
fn later_derived_values_are_one_pass_stale() {
    // Quad is declared before Double, so it reads Double's previous value
    let fields = vec![
        number_with_default("A", "2"),
        derived_field("Quad", "Number(values.Double) * 2"),
        derived_field("Double", "Number(values.A) * 2"),
    ];

    let opened = propagate(&fields, seed_values(&fields));
    // Double was seeded with "" (Number("") == 0)
    assert_eq!(opened["Quad"], json!(0));
    assert_eq!(opened["Double"], json!(4));

    let mut edited = opened.clone();
    edited.insert("A".into(), json!("5"));
    let edited = propagate(&fields, edited);
    assert_eq!(edited["Quad"], json!(8), "Quad sees Double from the previous pass");
    assert_eq!(edited["Double"], json!(10));

    let settled = propagate(&fields, edited);
    assert_eq!(settled["Quad"], json!(20));
}

#[test]
fn self_reference_reads_prior_value() {
    let fields = vec![derived_field("Counter", "Number(values.Counter) + 1")];

    let first = propagate(&fields, seed_values(&fields));
    assert_eq!(first["Counter"], json!(1));

    let second = propagate(&fields, first);
    assert_eq!(second["Counter"], json!(2));
}

#[test]
fn derived_without_formula_is_skipped() {
    let mut field = derived_field("Empty", "");
    field.formula = None;
    let fields = vec![field, text_field("note")];

    let input = values(&[("Empty", json!("kept")), ("note", json!("hi"))]);
    let out = propagate(&fields, input.clone());
    assert_eq!(out, input);
}

#[test]
fn formula_on_non_derived_field_is_ignored() {
    let mut field = text_field("plain");
    field.formula = Some("'computed'".into());
    let fields = vec![field];

    let out = propagate(&fields, values(&[("plain", json!("typed"))]));
    assert_eq!(out["plain"], json!("typed"));
}

// =========================================================================
// Evaluator is pluggable
// =========================================================================

struct Recording(std::cell::RefCell<Vec<String>>);

impl FormulaEvaluator for Recording {
    fn evaluate(&self, formula: &str, _values: &ValueSet) -> Result<Value, FormulaError> {
        self.0.borrow_mut().push(formula.to_string());
        Ok(json!("ok"))
    }
}

#[test]
fn each_derived_field_is_evaluated_once_in_order() {
    let fields = vec![
        derived_field("x", "first"),
        text_field("t"),
        derived_field("y", "second"),
    ];
    let recorder = Recording(std::cell::RefCell::new(Vec::new()));

    let out = propagate_with(&recorder, &fields, seed_values(&fields));
    assert_eq!(*recorder.0.borrow(), vec!["first".to_string(), "second".to_string()]);
    assert_eq!(out["x"], json!("ok"));
    assert_eq!(out["t"], json!(""));
}
