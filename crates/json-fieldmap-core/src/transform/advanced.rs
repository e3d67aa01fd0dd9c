//! JSON (de)serialization and table lookups.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use super::coerce::to_display_string;
use super::{LookupConfig, StringifyConfig};
use crate::error::MappingError;

/// Parse a JSON-encoded string. Non-strings pass through.
pub fn parse_json(value: &Value) -> Result<Value, MappingError> {
    match value {
        Value::String(s) => serde_json::from_str(s).map_err(|e| MappingError::TransformFailed {
            transform_type: "parse_json".to_string(),
            message: e.to_string(),
        }),
        other => Ok(other.clone()),
    }
}

pub fn stringify(value: &Value, config: &StringifyConfig) -> Result<Value, MappingError> {
    if config.indent == 0 {
        return Ok(Value::String(serde_json::to_string(value)?));
    }
    let indent = " ".repeat(config.indent.min(super::validate::MAX_INDENT));
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut ser)?;
    let text = String::from_utf8(buf).map_err(|e| MappingError::TransformFailed {
        transform_type: "stringify".to_string(),
        message: e.to_string(),
    })?;
    Ok(Value::String(text))
}

/// Decode the lookup table, accepting a string-encoded object.
pub fn lookup_table(table: &Value) -> Result<Map<String, Value>, MappingError> {
    let invalid = |message: String| MappingError::InvalidTransformConfig {
        transform_type: "lookup".to_string(),
        message,
    };
    match table {
        Value::Object(map) => Ok(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(invalid("lookupTable string must encode an object".to_string())),
            Err(e) => Err(invalid(format!("lookupTable is not valid JSON: {}", e))),
        },
        Value::Null => Ok(Map::new()),
        _ => Err(invalid("lookupTable must be an object".to_string())),
    }
}

/// Map the value through the table. Misses yield the default value, or the
/// input itself when the default is absent or null.
pub fn lookup(value: &Value, config: &LookupConfig) -> Result<Value, MappingError> {
    let table = lookup_table(&config.lookup_table)?;
    let key = to_display_string(value);
    Ok(match table.get(&key) {
        Some(found) => found.clone(),
        None => config
            .default_value
            .clone()
            .filter(|d| !d.is_null())
            .unwrap_or_else(|| value.clone()),
    })
}
