//! Static validation of transformation configs.
//!
//! Validation is stricter than execution: a config that validates cleanly
//! never hits a config-related failure at runtime, while some configs that
//! fail validation still execute with a documented fallback (dividing by zero
//! yields `0`, for instance).

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::advanced::lookup_table;
use super::{expr, CalcOperation, TransformKind};

/// Highest accepted `decimals` for rounding and number formatting.
pub const MAX_DECIMALS: u32 = 20;

/// Highest accepted `stringify` indent.
pub const MAX_INDENT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransformValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl TransformValidation {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Decode `config` for `type_name` and check it.
pub fn validate_transform(type_name: &str, config: &Value) -> TransformValidation {
    match TransformKind::from_parts(type_name, config.clone()) {
        Ok(kind) => kind.validate(),
        Err(e) => TransformValidation::from_errors(vec![e.to_string()]),
    }
}

impl TransformKind {
    pub fn validate(&self) -> TransformValidation {
        let mut errors = Vec::new();
        match self {
            TransformKind::Uppercase
            | TransformKind::Lowercase
            | TransformKind::Capitalize
            | TransformKind::Trim
            | TransformKind::Ceil
            | TransformKind::Floor
            | TransformKind::ParseJson
            | TransformKind::Concatenate(_)
            | TransformKind::DateAdd(_) => {}
            TransformKind::Substring(c) => {
                if c.start < 0 {
                    errors.push("Start index must be non-negative".to_string());
                }
                if c.length.is_some_and(|l| l < 0) {
                    errors.push("Length must be non-negative".to_string());
                }
            }
            TransformKind::Replace(c) => {
                if c.find.is_empty() {
                    errors.push("Find value is required".to_string());
                } else if c.regex {
                    if let Err(e) = RegexBuilder::new(&c.find).build() {
                        errors.push(format!("Invalid regular expression: {}", e));
                    }
                }
                if let Some(flags) = &c.flags {
                    if let Some(bad) = flags.chars().find(|f| !"gims".contains(*f)) {
                        errors.push(format!("Unsupported regex flag `{}`", bad));
                    }
                }
            }
            TransformKind::Split(c) => {
                if c.delimiter.is_empty() {
                    errors.push("Delimiter is required".to_string());
                }
                if c.index < 0 {
                    errors.push("Index must be non-negative".to_string());
                }
            }
            TransformKind::NumberFormat(c) => {
                if c.decimals > MAX_DECIMALS {
                    errors.push(format!("Decimals must be between 0 and {}", MAX_DECIMALS));
                }
            }
            TransformKind::Round(c) => {
                if c.decimals > MAX_DECIMALS {
                    errors.push(format!("Decimals must be between 0 and {}", MAX_DECIMALS));
                }
            }
            TransformKind::Calculate(c) => {
                if !c.value.is_finite() {
                    errors.push("Operand must be a finite number".to_string());
                }
                if c.value == 0.0
                    && matches!(c.operation, CalcOperation::Divide | CalcOperation::Modulo)
                {
                    errors.push("Cannot divide by zero".to_string());
                }
            }
            TransformKind::DateFormat(c) => {
                if c.output_format.trim().is_empty() {
                    errors.push("Output format is required".to_string());
                }
            }
            TransformKind::Stringify(c) => {
                if c.indent > MAX_INDENT {
                    errors.push(format!("Indent must be between 0 and {}", MAX_INDENT));
                }
            }
            TransformKind::Lookup(c) => match lookup_table(&c.lookup_table) {
                Ok(table) if table.is_empty() => {
                    errors.push("Lookup table must have at least one entry".to_string());
                }
                Ok(_) => {}
                Err(e) => errors.push(e.to_string()),
            },
            TransformKind::Invalid(invalid) => errors.push(invalid.message.clone()),
            TransformKind::Custom(c) => {
                if c.expression.trim().is_empty() {
                    errors.push("Expression is required".to_string());
                } else if let Err(e) = expr::parse(&c.expression) {
                    errors.push(e.to_string());
                }
            }
        }
        TransformValidation::from_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(type_name: &str, config: Value) -> TransformValidation {
        validate_transform(type_name, &config)
    }

    #[test]
    fn configless_types_are_valid() {
        for t in ["uppercase", "lowercase", "capitalize", "trim", "ceil", "floor", "parse_json"] {
            assert!(check(t, json!({})).valid, "{} should validate", t);
        }
    }

    #[test]
    fn unknown_type_is_invalid() {
        let v = check("rot13", json!({}));
        assert!(!v.valid);
        assert!(v.errors[0].contains("rot13"));
    }

    #[test]
    fn divide_by_zero_is_rejected_although_it_executes() {
        let v = check("calculate", json!({"operation": "divide", "value": 0}));
        assert!(!v.valid);
        assert_eq!(v.errors, vec!["Cannot divide by zero".to_string()]);
        assert!(check("calculate", json!({"operation": "multiply", "value": 0})).valid);
    }

    #[test]
    fn substring_and_split_bounds() {
        assert!(!check("substring", json!({"start": -1})).valid);
        assert!(check("substring", json!({"start": 0, "length": 3})).valid);
        assert!(!check("split", json!({"delimiter": ""})).valid);
    }

    #[test]
    fn replace_requires_find_and_valid_regex() {
        assert!(!check("replace", json!({"find": ""})).valid);
        assert!(!check("replace", json!({"find": "(", "regex": true})).valid);
        assert!(!check("replace", json!({"find": "a", "regex": true, "flags": "gx"})).valid);
        assert!(check("replace", json!({"find": "a+", "regex": true, "flags": "gi"})).valid);
    }

    #[test]
    fn decimals_and_indent_limits() {
        assert!(!check("round", json!({"decimals": 21})).valid);
        assert!(check("number_format", json!({"decimals": 20})).valid);
        assert!(!check("stringify", json!({"indent": 11})).valid);
    }

    #[test]
    fn lookup_table_must_be_non_empty_object() {
        assert!(check("lookup", json!({"lookupTable": {"A": 1}})).valid);
        assert!(check("lookup", json!({"lookupTable": "{\"A\": 1}"})).valid);
        assert!(!check("lookup", json!({"lookupTable": {}})).valid);
        assert!(!check("lookup", json!({"lookupTable": [1, 2]})).valid);
    }

    #[test]
    fn custom_expression_must_parse() {
        assert!(check("custom", json!({"expression": "value * 2"})).valid);
        assert!(!check("custom", json!({"expression": ""})).valid);
        assert!(!check("custom", json!({"expression": "fetch('x')"})).valid);
    }

    #[test]
    fn mistyped_config_is_invalid() {
        assert!(!check("round", json!({"decimals": "two"})).valid);
    }
}
