//! Dynamic form schemas with derived fields.
//!
//! A form is an ordered list of typed fields. Filling one in goes through a
//! [`engine::session::PreviewSession`]: every edit recomputes the derived
//! fields from their formulas, and submit runs the validation rules.

pub mod cli;
pub mod engine;
pub mod error;
pub mod formula;
pub mod report;
pub mod schema;
pub mod trace;

pub use engine::propagate::propagate;
pub use engine::session::{PreviewSession, SubmitOutcome};
pub use engine::validate::validate;
pub use error::FormError;
pub use formula::evaluator::evaluate;
pub use schema::field_model::{ErrorMap, Field, FieldType, Form, ValueSet};
