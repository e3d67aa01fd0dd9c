//! Numeric transformations. Non-numeric input passes through unchanged.

use serde_json::Value;

use super::coerce::{number_value, to_number};
use super::{CalcOperation, CalculateConfig, NumberFormatConfig};
use crate::error::MappingError;

/// Apply `f` to the numeric form of `value`.
pub fn map_number(value: &Value, f: impl FnOnce(f64) -> f64) -> Value {
    to_number(value)
        .and_then(|n| number_value(f(n)))
        .unwrap_or_else(|| value.clone())
}

/// Round half up (towards positive infinity) to `decimals` places.
pub fn round(value: &Value, decimals: u32) -> Value {
    let factor = 10f64.powi(decimals.min(20) as i32);
    map_number(value, |n| (n * factor + 0.5).floor() / factor)
}

/// Binary arithmetic with the configured right-hand operand.
///
/// Dividing by zero yields `0` rather than an error or infinity.
pub fn calculate(value: &Value, config: &CalculateConfig) -> Result<Value, MappingError> {
    let Some(n) = to_number(value) else {
        return Ok(value.clone());
    };
    let rhs = config.value;
    let result = match config.operation {
        CalcOperation::Add => n + rhs,
        CalcOperation::Subtract => n - rhs,
        CalcOperation::Multiply => n * rhs,
        CalcOperation::Divide if rhs == 0.0 => 0.0,
        CalcOperation::Divide => n / rhs,
        CalcOperation::Modulo => n % rhs,
        CalcOperation::Power => n.powf(rhs),
    };
    number_value(result).ok_or_else(|| MappingError::TransformFailed {
        transform_type: "calculate".to_string(),
        message: format!("{:?} of {} and {} is not a finite number", config.operation, n, rhs),
    })
}

/// Fixed decimals, grouped integer digits, optional prefix and suffix.
pub fn number_format(value: &Value, config: &NumberFormatConfig) -> Value {
    let Some(n) = to_number(value) else {
        return value.clone();
    };
    let fixed = format!("{:.*}", config.decimals.min(20) as usize, n);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let separator = config.thousand_separator.as_deref().unwrap_or(",");
    let grouped = group_digits(int_part, separator);

    let mut out = String::new();
    out.push_str(config.prefix.as_deref().unwrap_or(""));
    out.push_str(sign);
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out.push_str(config.suffix.as_deref().unwrap_or(""));
    Value::String(out)
}

fn group_digits(digits: &str, separator: &str) -> String {
    if separator.is_empty() || digits.len() <= 3 {
        return digits.to_string();
    }
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    let head = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - head) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}
