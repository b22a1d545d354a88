use crate::formula::evaluator::{evaluate_formula, ExpressionEvaluator, FormulaEvaluator};
use crate::schema::field_model::{Field, ValueSet};

/// Recompute every derived field with the default expression language.
pub fn propagate(fields: &[Field], values: ValueSet) -> ValueSet {
    propagate_with(&ExpressionEvaluator, fields, values)
}

/// Recompute every derived field from the current values.
///
/// One pass in declaration order. Each result is written back immediately,
/// so a derived field sees fresh values for derived fields declared *before*
/// it and the previous values for those declared after it. There is no
/// dependency ordering and no cycle detection: a formula reading its own
/// field gets the value from before this pass.
///
/// Non-derived values are returned untouched. Derived fields without a
/// formula are skipped.
pub fn propagate_with(evaluator: &dyn FormulaEvaluator, fields: &[Field], mut values: ValueSet) -> ValueSet {
    for field in fields {
        let Some(formula) = field.active_formula() else {
            continue;
        };
        let result = evaluate_formula(evaluator, formula, &values);
        tracing::debug!(field = %field.id, value = %result, "derived field recomputed");
        values.insert(field.id.clone(), result);
    }
    values
}
