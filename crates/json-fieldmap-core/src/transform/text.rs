//! Text transformations.
//!
//! Strings are transformed directly; numbers and booleans are first rendered
//! with [`to_display_string`]. Null, arrays and objects pass through unchanged
//! except where a transform documents otherwise (`concatenate` joins arrays).

use regex::RegexBuilder;
use serde_json::Value;

use super::coerce::to_display_string;
use super::{ConcatenateConfig, ReplaceConfig, SplitConfig, SubstringConfig};
use crate::error::MappingError;

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(to_display_string(value)),
        _ => None,
    }
}

/// Apply `f` to the text form of `value`, or return `value` if it has none.
pub fn map_text(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match as_text(value) {
        Some(s) => Value::String(f(&s)),
        None => value.clone(),
    }
}

/// Upper-case the first character of every space-separated word and
/// lower-case the rest. Runs of spaces collapse to one.
pub fn capitalize(s: &str) -> String {
    s.split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn substring(value: &Value, config: &SubstringConfig) -> Value {
    map_text(value, |s| {
        let start = config.start.max(0) as usize;
        let chars = s.chars().skip(start);
        match config.length {
            Some(len) => chars.take(len.max(0) as usize).collect(),
            None => chars.collect(),
        }
    })
}

pub fn replace(value: &Value, config: &ReplaceConfig) -> Result<Value, MappingError> {
    let Some(text) = as_text(value) else {
        return Ok(value.clone());
    };
    if config.find.is_empty() {
        return Ok(value.clone());
    }

    if !config.regex {
        return Ok(Value::String(text.replace(&config.find, &config.replace_with)));
    }

    let flags = config.flags.as_deref().unwrap_or("g");
    let re = RegexBuilder::new(&config.find)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| MappingError::TransformFailed {
            transform_type: "replace".to_string(),
            message: format!("invalid pattern `{}`: {}", config.find, e),
        })?;

    let replaced = if flags.contains('g') {
        re.replace_all(&text, config.replace_with.as_str())
    } else {
        re.replace(&text, config.replace_with.as_str())
    };
    Ok(Value::String(replaced.into_owned()))
}

/// Join arrays with the separator (scalars are used as-is), then wrap in the
/// optional prefix and suffix.
pub fn concatenate(value: &Value, config: &ConcatenateConfig) -> Value {
    let body = match value {
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(to_display_string)
            .collect::<Vec<_>>()
            .join(&config.separator),
        Value::Null | Value::Object(_) => return value.clone(),
        other => to_display_string(other),
    };
    Value::String(format!(
        "{}{}{}",
        config.prefix.as_deref().unwrap_or(""),
        body,
        config.suffix.as_deref().unwrap_or("")
    ))
}

/// The `index`-th part of the split text, or `""` when out of range.
pub fn split(value: &Value, config: &SplitConfig) -> Value {
    map_text(value, |s| {
        if config.index < 0 {
            return String::new();
        }
        let index = config.index as usize;
        let part = if config.delimiter.is_empty() {
            s.chars().nth(index).map(String::from)
        } else {
            s.split(config.delimiter.as_str()).nth(index).map(String::from)
        };
        part.unwrap_or_default()
    })
}
