//! Loose value coercions shared by transformations and conditionals.

use serde_json::{Number, Value};

/// String form of a value, as a user would read it: strings verbatim, numbers
/// without a trailing `.0`, arrays comma-joined, objects as compact JSON.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => to_display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => format_f64(f),
        _ => n.to_string(),
    }
}

/// Render a float the way JSON consumers expect: integral values without a
/// fractional part.
pub fn format_f64(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{}", f as i128)
    } else {
        format!("{}", f)
    }
}

/// Numeric value of numbers and numeric strings. Everything else is `None`.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        _ => None,
    }
}

/// Build a JSON number, preferring an integer representation when `f` is
/// integral. Non-finite input has no JSON form and yields `None`.
pub fn number_value(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        let i = f as i64;
        if i as f64 == f {
            return Some(Value::Number(Number::from(i)));
        }
    }
    Number::from_f64(f).map(Value::Number)
}
