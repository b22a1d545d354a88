use serde_json::{Map, Value};

use crate::formula::formula_model::{BinOp, Expr, FormulaError, Literal, UnaryOp, MAX_DEPTH};
use crate::formula::parser::parse;
use crate::schema::field_model::ValueSet;

/// Backend that turns a formula string plus the current values into a value.
///
/// The propagator only talks to this trait, so the expression language can be
/// replaced without touching propagation or validation.
pub trait FormulaEvaluator {
    fn evaluate(&self, formula: &str, values: &ValueSet) -> Result<Value, FormulaError>;
}

/// Default backend: the built-in expression language.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEvaluator;

impl FormulaEvaluator for ExpressionEvaluator {
    fn evaluate(&self, formula: &str, values: &ValueSet) -> Result<Value, FormulaError> {
        let expr = parse(formula)?;
        let result = eval_expr(&expr, values, 0)?;
        Ok(result.into_value())
    }
}

/// Evaluate a formula, containing every failure as an empty string.
pub fn evaluate_formula(evaluator: &dyn FormulaEvaluator, formula: &str, values: &ValueSet) -> Value {
    match evaluator.evaluate(formula, values) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(formula, error = %e, "formula evaluation failed");
            Value::String(String::new())
        }
    }
}

/// Evaluate with the default expression language.
pub fn evaluate(formula: &str, values: &ValueSet) -> Value {
    evaluate_formula(&ExpressionEvaluator, formula, values)
}

// =========================================================================
// Runtime values
// =========================================================================

/// Runtime value while a formula is being evaluated. Follows JavaScript
/// coercion rules so formulas written against the browser keep working.
#[derive(Debug, Clone, PartialEq)]
enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(Map<String, Value>),
}

impl JsValue {
    /// A stored `null` is how a NaN result is kept, so it reads back as NaN.
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => JsValue::Number(f64::NAN),
            Value::Bool(b) => JsValue::Bool(*b),
            Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => JsValue::Str(s.clone()),
            Value::Array(items) => JsValue::Str(
                items
                    .iter()
                    .map(|item| JsValue::from_value(item).to_js_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Value::Object(map) => JsValue::Object(map.clone()),
        }
    }

    /// Convert a final result into something storable in the value set.
    fn into_value(self) -> Value {
        match self {
            JsValue::Undefined => Value::String(String::new()),
            JsValue::Null => Value::Null,
            JsValue::Bool(b) => Value::Bool(b),
            JsValue::Number(n) => number_to_value(n),
            JsValue::Str(s) => Value::String(s),
            JsValue::Object(map) => Value::Object(map),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::Str(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            JsValue::Number(n) => *n,
            JsValue::Str(s) => string_to_number(s),
            JsValue::Object(_) => f64::NAN,
        }
    }

    fn to_js_string(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Bool(b) => b.to_string(),
            JsValue::Number(n) => number_to_string(*n),
            JsValue::Str(s) => s.clone(),
            JsValue::Object(_) => "[object Object]".to_string(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::Str(_) => "string",
            JsValue::Object(_) => "object",
        }
    }
}

/// NaN is stored as `null` so it stays falsy for the required rule and
/// renders blank.
fn number_to_value(n: f64) -> Value {
    if n.is_nan() {
        return Value::Null;
    }
    if n.is_infinite() {
        return Value::String(if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string());
    }
    // 2^53: integral values below this survive the i64 round trip exactly
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(number_to_string(n)))
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // Exponent form with an explicit sign, as in `1e+21`
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        }
    } else {
        format!("{}", n)
    }
}

/// `n.toFixed(digits)`: rounds the exact binary value, ties away from zero.
fn to_fixed(n: f64, digits: usize) -> String {
    if n.abs() >= 1e21 {
        return number_to_string(n);
    }
    // f64 has at most 1074 fractional digits, so this expansion is exact
    let exact = format!("{:.1100}", n.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(digits))
        .collect();
    if frac_part.as_bytes().get(digits).is_some_and(|d| *d >= b'5') {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, b'1');
                break;
            }
            i -= 1;
            if kept[i] == b'9' {
                kept[i] = b'0';
            } else {
                kept[i] += 1;
                break;
            }
        }
    }

    let int_len = kept.len() - digits;
    let mut out = String::with_capacity(kept.len() + 2);
    if n < 0.0 {
        out.push('-');
    }
    out.extend(kept[..int_len].iter().map(|&b| b as char));
    if digits > 0 {
        out.push('.');
        out.extend(kept[int_len..].iter().map(|&b| b as char));
    }
    out
}

/// `Number("...")`: blank is zero, anything not entirely numeric is NaN.
fn string_to_number(s: &str) -> f64 {
    let text = s.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            return parse_radix(digits, radix);
        }
    }
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

/// Unsigned digits in `radix`; empty or any stray character is NaN.
fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |acc: f64, c| c.to_digit(radix).map(|d| acc * radix as f64 + d as f64))
        .unwrap_or(f64::NAN)
}

/// `parseInt(s)`: optional sign, then as many decimal digits as present.
fn parse_int_prefix(s: &str) -> f64 {
    let text = s.trim_start();
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    digits.parse::<f64>().map(|n| sign * n).unwrap_or(f64::NAN)
}

/// `parseFloat(s)`: the longest leading decimal literal.
fn parse_float_prefix(s: &str) -> f64 {
    let text = s.trim_start();
    for prefix in ["Infinity", "+Infinity"] {
        if text.starts_with(prefix) {
            return f64::INFINITY;
        }
    }
    if text.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }

    let chars: Vec<char> = text.chars().collect();
    let mut end = 0;
    if end < chars.len() && (chars[end] == '+' || chars[end] == '-') {
        end += 1;
    }
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end < chars.len() && chars[end] == '.' {
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < chars.len() && (chars[end] == 'e' || chars[end] == 'E') {
        let mut j = end + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            end = j;
        }
    }

    let literal: String = chars[..end].iter().collect();
    literal.parse::<f64>().unwrap_or(f64::NAN)
}

// =========================================================================
// Tree walk
// =========================================================================

fn eval_expr(expr: &Expr, values: &ValueSet, depth: usize) -> Result<JsValue, FormulaError> {
    if depth > MAX_DEPTH {
        return Err(FormulaError::TooDeep { limit: MAX_DEPTH });
    }
    let next = depth + 1;

    match expr {
        Expr::Literal(literal) => Ok(match literal {
            Literal::Number(n) => JsValue::Number(*n),
            Literal::Str(s) => JsValue::Str(s.clone()),
            Literal::Bool(b) => JsValue::Bool(*b),
            Literal::Null => JsValue::Null,
            Literal::Undefined => JsValue::Undefined,
        }),

        Expr::Ident(name) => match name.as_str() {
            "values" => Ok(JsValue::Object(
                values.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            _ => Err(FormulaError::UnknownName(name.clone())),
        },

        Expr::Member { object, property } => {
            let key = eval_expr(property, values, next)?.to_js_string();

            // Field lookups go straight to the value set
            if matches!(object.as_ref(), Expr::Ident(name) if name == "values") {
                return values
                    .get(&key)
                    .map(JsValue::from_value)
                    .ok_or(FormulaError::UnknownField(key));
            }

            let target = eval_expr(object, values, next)?;
            get_property(&target, &key)
        }

        Expr::Call { callee, args } => call(callee, args, values, next),

        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, values, next)?;
            Ok(match op {
                UnaryOp::Not => JsValue::Bool(!value.truthy()),
                UnaryOp::Neg => JsValue::Number(-value.to_number()),
                UnaryOp::Plus => JsValue::Number(value.to_number()),
            })
        }

        Expr::Binary { op, left, right } => {
            let lhs = eval_expr(left, values, next)?;
            // Short-circuit: the right side is only evaluated when needed
            match op {
                BinOp::Or if lhs.truthy() => return Ok(lhs),
                BinOp::And if !lhs.truthy() => return Ok(lhs),
                BinOp::Or | BinOp::And => return eval_expr(right, values, next),
                _ => {}
            }
            let rhs = eval_expr(right, values, next)?;
            Ok(apply_binary(*op, lhs, rhs))
        }

        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            if eval_expr(condition, values, next)?.truthy() {
                eval_expr(then_expr, values, next)
            } else {
                eval_expr(else_expr, values, next)
            }
        }
    }
}

fn get_property(target: &JsValue, key: &str) -> Result<JsValue, FormulaError> {
    match target {
        JsValue::Undefined | JsValue::Null => Err(FormulaError::Type(format!(
            "Cannot read properties of {} (reading '{}')",
            target.type_name(),
            key
        ))),
        JsValue::Str(s) if key == "length" => Ok(JsValue::Number(s.encode_utf16().count() as f64)),
        JsValue::Object(map) => Ok(map.get(key).map(JsValue::from_value).unwrap_or(JsValue::Undefined)),
        _ => Ok(JsValue::Undefined),
    }
}

fn apply_binary(op: BinOp, lhs: JsValue, rhs: JsValue) -> JsValue {
    match op {
        BinOp::Add => {
            let stringy = |v: &JsValue| matches!(v, JsValue::Str(_) | JsValue::Object(_));
            if stringy(&lhs) || stringy(&rhs) {
                JsValue::Str(format!("{}{}", lhs.to_js_string(), rhs.to_js_string()))
            } else {
                JsValue::Number(lhs.to_number() + rhs.to_number())
            }
        }
        BinOp::Sub => JsValue::Number(lhs.to_number() - rhs.to_number()),
        BinOp::Mul => JsValue::Number(lhs.to_number() * rhs.to_number()),
        BinOp::Div => JsValue::Number(lhs.to_number() / rhs.to_number()),
        BinOp::Mod => JsValue::Number(lhs.to_number() % rhs.to_number()),
        BinOp::StrictEq => JsValue::Bool(strict_equals(&lhs, &rhs)),
        BinOp::StrictNe => JsValue::Bool(!strict_equals(&lhs, &rhs)),
        BinOp::LooseEq => JsValue::Bool(loose_equals(&lhs, &rhs)),
        BinOp::LooseNe => JsValue::Bool(!loose_equals(&lhs, &rhs)),
        BinOp::Lt => JsValue::Bool(compare(&lhs, &rhs, |o| o.is_lt())),
        BinOp::Le => JsValue::Bool(compare(&lhs, &rhs, |o| o.is_le())),
        BinOp::Gt => JsValue::Bool(compare(&lhs, &rhs, |o| o.is_gt())),
        BinOp::Ge => JsValue::Bool(compare(&lhs, &rhs, |o| o.is_ge())),
        // Handled with short-circuiting in eval_expr
        BinOp::Or | BinOp::And => JsValue::Undefined,
    }
}

fn strict_equals(lhs: &JsValue, rhs: &JsValue) -> bool {
    match (lhs, rhs) {
        (JsValue::Number(a), JsValue::Number(b)) => a == b,
        _ => lhs == rhs,
    }
}

fn loose_equals(lhs: &JsValue, rhs: &JsValue) -> bool {
    match (lhs, rhs) {
        (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
        (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => false,
        (JsValue::Str(a), JsValue::Str(b)) => a == b,
        (JsValue::Object(_), JsValue::Object(_)) => lhs == rhs,
        (JsValue::Object(_), _) => loose_equals(&JsValue::Str(lhs.to_js_string()), rhs),
        (_, JsValue::Object(_)) => loose_equals(rhs, lhs),
        _ => lhs.to_number() == rhs.to_number(),
    }
}

fn compare(lhs: &JsValue, rhs: &JsValue, accept: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    if let (JsValue::Str(a), JsValue::Str(b)) = (lhs, rhs) {
        return accept(a.cmp(b));
    }
    // NaN compares false both ways
    lhs.to_number()
        .partial_cmp(&rhs.to_number())
        .is_some_and(accept)
}

// =========================================================================
// Builtins
// =========================================================================

fn call(callee: &Expr, args: &[Expr], values: &ValueSet, depth: usize) -> Result<JsValue, FormulaError> {
    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        evaluated.push(eval_expr(arg, values, depth)?);
    }
    let first = evaluated.first().cloned().unwrap_or(JsValue::Undefined);

    match callee {
        Expr::Ident(name) => match name.as_str() {
            "Number" => Ok(JsValue::Number(if evaluated.is_empty() { 0.0 } else { first.to_number() })),
            "String" => Ok(JsValue::Str(if evaluated.is_empty() {
                String::new()
            } else {
                first.to_js_string()
            })),
            "Boolean" => Ok(JsValue::Bool(first.truthy())),
            "parseInt" => Ok(JsValue::Number(parse_int_prefix(&first.to_js_string()))),
            "parseFloat" => Ok(JsValue::Number(parse_float_prefix(&first.to_js_string()))),
            "isNaN" => Ok(JsValue::Bool(first.to_number().is_nan())),
            "values" => Err(FormulaError::NotCallable(name.clone())),
            _ => Err(FormulaError::UnknownName(name.clone())),
        },

        Expr::Member { object, .. } => {
            let method = callee
                .static_property()
                .ok_or_else(|| FormulaError::NotCallable("computed member".to_string()))?;

            if matches!(object.as_ref(), Expr::Ident(name) if name == "Math") {
                return call_math(method, &evaluated);
            }

            let receiver = eval_expr(object, values, depth)?;
            call_method(&receiver, method, &evaluated)
        }

        _ => Err(FormulaError::NotCallable("expression".to_string())),
    }
}

fn call_math(method: &str, args: &[JsValue]) -> Result<JsValue, FormulaError> {
    let nums: Vec<f64> = args.iter().map(JsValue::to_number).collect();
    let x = nums.first().copied().unwrap_or(f64::NAN);

    let result = match method {
        "min" => {
            if nums.iter().any(|n| n.is_nan()) {
                f64::NAN
            } else {
                nums.iter().copied().fold(f64::INFINITY, f64::min)
            }
        }
        "max" => {
            if nums.iter().any(|n| n.is_nan()) {
                f64::NAN
            } else {
                nums.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
        }
        // Math.round rounds halves toward +Infinity
        "round" => (x + 0.5).floor(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "abs" => x.abs(),
        "sqrt" => x.sqrt(),
        "trunc" => x.trunc(),
        "pow" => x.powf(nums.get(1).copied().unwrap_or(f64::NAN)),
        _ => return Err(FormulaError::NotCallable(format!("Math.{}", method))),
    };
    Ok(JsValue::Number(result))
}

fn call_method(receiver: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, FormulaError> {
    match (receiver, method) {
        (JsValue::Undefined | JsValue::Null, _) => Err(FormulaError::Type(format!(
            "Cannot read properties of {} (reading '{}')",
            receiver.type_name(),
            method
        ))),
        (JsValue::Str(s), "trim") => Ok(JsValue::Str(s.trim().to_string())),
        (JsValue::Str(s), "toUpperCase") => Ok(JsValue::Str(s.to_uppercase())),
        (JsValue::Str(s), "toLowerCase") => Ok(JsValue::Str(s.to_lowercase())),
        (JsValue::Number(n), "toFixed") => {
            let digits = args.first().map(JsValue::to_number).unwrap_or(0.0);
            if !(0.0..=100.0).contains(&digits) {
                return Err(FormulaError::Type("toFixed() digits out of range".to_string()));
            }
            if !n.is_finite() {
                return Ok(JsValue::Str(number_to_string(*n)));
            }
            Ok(JsValue::Str(to_fixed(*n, digits as usize)))
        }
        (_, "toString") => Ok(JsValue::Str(receiver.to_js_string())),
        _ => Err(FormulaError::NotCallable(format!(
            "{}.{}",
            receiver.type_name(),
            method
        ))),
    }
}
