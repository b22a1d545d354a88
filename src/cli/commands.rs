use std::path::Path;

use crate::cli::config::Settings;
use crate::engine::session::PreviewSession;
use crate::error::FormError;
use crate::formula::evaluator::ExpressionEvaluator;
use crate::report::console::{format_outcome, format_preview};
use crate::schema::builder::FormBuilder;
use crate::schema::field_model::Form;
use crate::schema::store::{read_form_file, summary_line, FormStore};
use crate::trace::logger::TraceLogger;

// ============================================================================
// forms subcommand
// ============================================================================

pub fn cmd_forms(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = FormStore::new(&settings.store_path);
    let forms = store.load()?;

    if forms.is_empty() {
        println!("No forms saved.");
        return Ok(());
    }

    for form in &forms {
        println!("{}", summary_line(form));
    }
    Ok(())
}

// ============================================================================
// show subcommand
// ============================================================================

pub fn cmd_show(settings: &Settings, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let form = FormStore::new(&settings.store_path).find(name)?;
    let session = open_session(settings, form);
    print!("{}", format_preview(&session));
    Ok(())
}

// ============================================================================
// import subcommand
// ============================================================================

/// Read a form file, rebuild it through the builder and save it.
pub fn cmd_import(
    settings: &Settings,
    file: &str,
    name: Option<&str>,
    verbose: u8,
) -> Result<Form, Box<dyn std::error::Error>> {
    let form = import_form(Path::new(file), name)?;
    let store = FormStore::new(&settings.store_path);
    let forms = store.append(form.clone())?;

    if verbose > 0 {
        eprintln!("Store {} now holds {} forms", settings.store_path, forms.len());
    }
    println!("Saved form '{}' ({} fields)", form.name, form.fields.len());
    Ok(form)
}

/// Build a saved form from a file. Field ids must be unique; the name comes
/// from `name` when given, otherwise from the file.
pub fn import_form(path: &Path, name: Option<&str>) -> Result<Form, FormError> {
    let draft = read_form_file(path)?;
    let mut builder = FormBuilder::new();
    for field in draft.fields {
        builder.push_field(field)?;
    }
    builder.save(name.unwrap_or(&draft.name))
}

// ============================================================================
// preview subcommand
// ============================================================================

/// Fill a saved form and return whether it was accepted (true when not
/// submitting).
pub fn cmd_preview(
    settings: &Settings,
    name: &str,
    set: &[String],
    check: &[String],
    submit: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let form = FormStore::new(&settings.store_path).find(name)?;
    let mut session = open_session(settings, form);

    for raw in set {
        let (id, value) = parse_assignment(raw)?;
        session.set_text(&id, &value)?;
    }
    for raw in check {
        let (id, option) = parse_assignment(raw)?;
        session.choose(&id, &option)?;
    }

    let outcome = submit.then(|| session.submit());
    print!("{}", format_preview(&session));

    match outcome {
        Some(outcome) => {
            print!("\n{}", format_outcome(&outcome));
            Ok(outcome.is_accepted())
        }
        None => Ok(true),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn open_session(settings: &Settings, form: Form) -> PreviewSession {
    let tracer = match &settings.trace_path {
        Some(path) => TraceLogger::open(path),
        None => TraceLogger::disabled(),
    };
    PreviewSession::open_with(form, Box::new(ExpressionEvaluator), tracer)
}

/// Split `id=value`. The value may itself contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), FormError> {
    match raw.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => Ok((id.trim().to_string(), value.to_string())),
        _ => Err(FormError::InvalidAssignment(raw.to_string())),
    }
}
