//! Value transformations applied by field mappings.
//!
//! Each transformation type is one [`TransformKind`] variant carrying its own
//! typed config. Applying a transformation is total: any internal failure is
//! logged and the input value is returned unchanged, so one bad transform never
//! aborts the mapping of an item.
//!
//! On the wire a transformation is `{id, name, type, config}`; the `type`
//! string and the untyped `config` object are decoded together by
//! [`TransformKind::from_parts`]. Configs loaded from JSON go through
//! [`TransformKind::from_parts_or_invalid`] instead, so one undecodable
//! transformation becomes [`TransformKind::Invalid`] rather than rejecting the
//! whole mapping config.

pub mod advanced;
pub mod coerce;
pub mod date;
pub mod expr;
pub mod number;
pub mod text;
pub mod validate;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MappingError;
use crate::model::MappingTransformation;

pub use validate::{validate_transform, TransformValidation};

// ---------------------------------------------------------------------------
// Typed configs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubstringConfig {
    /// Start offset in characters. Negative values are a validation error and
    /// are clamped to 0 at runtime.
    pub start: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplaceConfig {
    pub find: String,
    #[serde(alias = "replace")]
    pub replace_with: String,
    /// Treat `find` as a regular expression.
    pub regex: bool,
    /// Regex flags (`g`, `i`, `m`, `s`). Defaults to `g`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcatenateConfig {
    pub separator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitConfig {
    pub delimiter: String,
    pub index: i64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumberFormatConfig {
    pub decimals: u32,
    /// Inserted between groups of three integer digits. Defaults to `,`;
    /// an empty string disables grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thousand_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl Default for NumberFormatConfig {
    fn default() -> Self {
        Self {
            decimals: 2,
            thousand_separator: None,
            prefix: None,
            suffix: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcOperation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculateConfig {
    pub operation: CalcOperation,
    /// Right-hand operand.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundConfig {
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateFormatConfig {
    /// Hint for parsing the input. `None` or `auto` tries every known format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    pub output_format: String,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            input_format: None,
            output_format: "YYYY-MM-DD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    #[default]
    Days,
    Months,
    Years,
    Hours,
    Minutes,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateAddConfig {
    pub amount: i64,
    pub unit: DateUnit,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StringifyConfig {
    /// Spaces per indentation level; 0 renders compact JSON.
    pub indent: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupConfig {
    /// An object, or a string containing a JSON-encoded object.
    pub lookup_table: Value,
    /// Result for keys missing from the table. Null falls through to the input.
    #[serde(
        default,
        deserialize_with = "crate::model::deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomConfig {
    /// A single expression over the identifier `value`.
    pub expression: String,
}

// ---------------------------------------------------------------------------
// TransformKind
// ---------------------------------------------------------------------------

/// A transformation type together with its config.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformKind {
    Uppercase,
    Lowercase,
    Capitalize,
    Trim,
    Substring(SubstringConfig),
    Replace(ReplaceConfig),
    Concatenate(ConcatenateConfig),
    Split(SplitConfig),
    NumberFormat(NumberFormatConfig),
    Calculate(CalculateConfig),
    Round(RoundConfig),
    Ceil,
    Floor,
    DateFormat(DateFormatConfig),
    DateAdd(DateAddConfig),
    ParseJson,
    Stringify(StringifyConfig),
    Lookup(LookupConfig),
    Custom(CustomConfig),
    /// A wire transformation whose `type` is unknown or whose `config` does
    /// not fit it. Applying it keeps the input; validating it reports why.
    Invalid(InvalidTransform),
}

/// The undecodable parts of a wire transformation, kept verbatim so the config
/// serializes back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidTransform {
    pub type_name: String,
    pub config: Value,
    pub message: String,
}

fn decode<T: DeserializeOwned>(type_name: &str, config: Value) -> Result<T, MappingError> {
    serde_json::from_value(config).map_err(|e| MappingError::InvalidTransformConfig {
        transform_type: type_name.to_string(),
        message: e.to_string(),
    })
}

fn encode<T: Serialize>(config: &T) -> Value {
    // Plain structs of strings and numbers always serialize.
    serde_json::to_value(config).unwrap_or_else(|_| Value::Object(Map::new()))
}

impl TransformKind {
    /// The wire `type` string.
    pub fn type_name(&self) -> &str {
        match self {
            TransformKind::Uppercase => "uppercase",
            TransformKind::Lowercase => "lowercase",
            TransformKind::Capitalize => "capitalize",
            TransformKind::Trim => "trim",
            TransformKind::Substring(_) => "substring",
            TransformKind::Replace(_) => "replace",
            TransformKind::Concatenate(_) => "concatenate",
            TransformKind::Split(_) => "split",
            TransformKind::NumberFormat(_) => "number_format",
            TransformKind::Calculate(_) => "calculate",
            TransformKind::Round(_) => "round",
            TransformKind::Ceil => "ceil",
            TransformKind::Floor => "floor",
            TransformKind::DateFormat(_) => "date_format",
            TransformKind::DateAdd(_) => "date_add",
            TransformKind::ParseJson => "parse_json",
            TransformKind::Stringify(_) => "stringify",
            TransformKind::Lookup(_) => "lookup",
            TransformKind::Custom(_) => "custom",
            TransformKind::Invalid(invalid) => &invalid.type_name,
        }
    }

    /// Decode a wire `type` and `config`. A null config is read as `{}`.
    pub fn from_parts(type_name: &str, config: Value) -> Result<Self, MappingError> {
        let config = if config.is_null() {
            Value::Object(Map::new())
        } else {
            config
        };
        let t = type_name;
        Ok(match type_name {
            "uppercase" => TransformKind::Uppercase,
            "lowercase" => TransformKind::Lowercase,
            "capitalize" => TransformKind::Capitalize,
            "trim" => TransformKind::Trim,
            "substring" => TransformKind::Substring(decode(t, config)?),
            "replace" => TransformKind::Replace(decode(t, config)?),
            "concatenate" => TransformKind::Concatenate(decode(t, config)?),
            "split" => TransformKind::Split(decode(t, config)?),
            "number_format" => TransformKind::NumberFormat(decode(t, config)?),
            "calculate" => TransformKind::Calculate(decode(t, config)?),
            "round" => TransformKind::Round(decode(t, config)?),
            "ceil" => TransformKind::Ceil,
            "floor" => TransformKind::Floor,
            "date_format" => TransformKind::DateFormat(decode(t, config)?),
            "date_add" => TransformKind::DateAdd(decode(t, config)?),
            "parse_json" => TransformKind::ParseJson,
            "stringify" => TransformKind::Stringify(decode(t, config)?),
            "lookup" => TransformKind::Lookup(decode(t, config)?),
            "custom" => TransformKind::Custom(decode(t, config)?),
            other => return Err(MappingError::UnknownTransformType(other.to_string())),
        })
    }

    /// Decode like [`from_parts`](Self::from_parts), but keep a failure as
    /// [`TransformKind::Invalid`].
    pub fn from_parts_or_invalid(type_name: &str, config: Value) -> Self {
        match Self::from_parts(type_name, config.clone()) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(transform = type_name, error = %e, "transformation does not decode");
                TransformKind::Invalid(InvalidTransform {
                    type_name: type_name.to_string(),
                    config,
                    message: e.to_string(),
                })
            }
        }
    }

    /// The wire `config` object.
    pub fn config_value(&self) -> Value {
        match self {
            TransformKind::Uppercase
            | TransformKind::Lowercase
            | TransformKind::Capitalize
            | TransformKind::Trim
            | TransformKind::Ceil
            | TransformKind::Floor
            | TransformKind::ParseJson => Value::Object(Map::new()),
            TransformKind::Substring(c) => encode(c),
            TransformKind::Replace(c) => encode(c),
            TransformKind::Concatenate(c) => encode(c),
            TransformKind::Split(c) => encode(c),
            TransformKind::NumberFormat(c) => encode(c),
            TransformKind::Calculate(c) => encode(c),
            TransformKind::Round(c) => encode(c),
            TransformKind::DateFormat(c) => encode(c),
            TransformKind::DateAdd(c) => encode(c),
            TransformKind::Stringify(c) => encode(c),
            TransformKind::Lookup(c) => encode(c),
            TransformKind::Custom(c) => encode(c),
            TransformKind::Invalid(invalid) => invalid.config.clone(),
        }
    }

    /// Apply the transformation. Never fails: on error the input is returned.
    pub fn apply(&self, value: &Value) -> Value {
        match self.try_apply(value) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(
                    transform = self.type_name(),
                    error = %e,
                    "transformation failed, keeping original value"
                );
                value.clone()
            }
        }
    }

    /// Fallible form of [`apply`](Self::apply).
    pub fn try_apply(&self, value: &Value) -> Result<Value, MappingError> {
        match self {
            TransformKind::Uppercase => Ok(text::map_text(value, |s| s.to_uppercase())),
            TransformKind::Lowercase => Ok(text::map_text(value, |s| s.to_lowercase())),
            TransformKind::Capitalize => Ok(text::map_text(value, text::capitalize)),
            TransformKind::Trim => Ok(text::map_text(value, |s| s.trim().to_string())),
            TransformKind::Substring(c) => Ok(text::substring(value, c)),
            TransformKind::Replace(c) => text::replace(value, c),
            TransformKind::Concatenate(c) => Ok(text::concatenate(value, c)),
            TransformKind::Split(c) => Ok(text::split(value, c)),
            TransformKind::NumberFormat(c) => Ok(number::number_format(value, c)),
            TransformKind::Calculate(c) => number::calculate(value, c),
            TransformKind::Round(c) => Ok(number::round(value, c.decimals)),
            TransformKind::Ceil => Ok(number::map_number(value, f64::ceil)),
            TransformKind::Floor => Ok(number::map_number(value, f64::floor)),
            TransformKind::DateFormat(c) => date::date_format(value, c),
            TransformKind::DateAdd(c) => date::date_add(value, c),
            TransformKind::ParseJson => advanced::parse_json(value),
            TransformKind::Stringify(c) => advanced::stringify(value, c),
            TransformKind::Lookup(c) => advanced::lookup(value, c),
            TransformKind::Custom(c) => expr::evaluate(&c.expression, value),
            TransformKind::Invalid(invalid) => Err(MappingError::InvalidTransformConfig {
                transform_type: invalid.type_name.clone(),
                message: invalid.message.clone(),
            }),
        }
    }
}

/// Apply one configured transformation.
pub fn apply_transformation(value: &Value, transformation: &MappingTransformation) -> Value {
    tracing::trace!(
        id = %transformation.id,
        transform = transformation.kind.type_name(),
        "applying transformation"
    );
    transformation.kind.apply(value)
}

/// Fold a chain of transformations left to right.
pub fn apply_all(value: &Value, transformations: &[MappingTransformation]) -> Value {
    transformations
        .iter()
        .fold(value.clone(), |acc, t| apply_transformation(&acc, t))
}
