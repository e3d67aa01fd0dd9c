//! Error types for the mapping engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes for FFI consumers.
///
/// These codes form a **stable API contract**: once published, variant names
/// and their serialized `snake_case` strings must never change across versions.
/// The WASM binding surfaces them to the editor unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// JSON (de)serialization error (malformed input, invalid structure, or encoding failure).
    JsonParseError,
    /// A path expression could not be parsed.
    InvalidPath,
    /// A path segment mixes `[*]` and `[N]` suffixes.
    MixedArrayAccess,
    /// A transformation `type` is not recognized.
    UnknownTransformType,
    /// A transformation config is malformed for its type.
    InvalidTransformConfig,
    /// A transformation failed at runtime.
    TransformFailed,
    /// No mapping with the given id exists in the config.
    MappingNotFound,
    /// No transformation with the given id exists in the config.
    TransformationNotFound,
    /// No source document or descriptor with the given id.
    SourceNotFound,
    /// A custom expression could not be parsed.
    ExpressionParseError,
    /// A custom expression failed during evaluation.
    ExpressionEvalError,
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("JSON (de)serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid path `{path}`: {message}")]
    InvalidPath { path: String, message: String },

    #[error("Path `{path}` mixes wildcard and fixed-index access in segment `{segment}`")]
    MixedArrayAccess { path: String, segment: String },

    #[error("Unknown transformation type: {0}")]
    UnknownTransformType(String),

    #[error("Invalid config for `{transform_type}` transformation: {message}")]
    InvalidTransformConfig {
        transform_type: String,
        message: String,
    },

    #[error("`{transform_type}` transformation failed: {message}")]
    TransformFailed {
        transform_type: String,
        message: String,
    },

    #[error("Mapping not found: {0}")]
    MappingNotFound(String),

    #[error("Transformation not found: {0}")]
    TransformationNotFound(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Expression parse error at offset {offset}: {message}")]
    ExpressionParse { offset: usize, message: String },

    #[error("Expression evaluation error: {0}")]
    ExpressionEval(String),
}

impl MappingError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            MappingError::JsonError(_) => ErrorCode::JsonParseError,
            MappingError::InvalidPath { .. } => ErrorCode::InvalidPath,
            MappingError::MixedArrayAccess { .. } => ErrorCode::MixedArrayAccess,
            MappingError::UnknownTransformType(_) => ErrorCode::UnknownTransformType,
            MappingError::InvalidTransformConfig { .. } => ErrorCode::InvalidTransformConfig,
            MappingError::TransformFailed { .. } => ErrorCode::TransformFailed,
            MappingError::MappingNotFound(_) => ErrorCode::MappingNotFound,
            MappingError::TransformationNotFound(_) => ErrorCode::TransformationNotFound,
            MappingError::SourceNotFound(_) => ErrorCode::SourceNotFound,
            MappingError::ExpressionParse { .. } => ErrorCode::ExpressionParseError,
            MappingError::ExpressionEval(_) => ErrorCode::ExpressionEvalError,
        }
    }

    /// Returns the path expression this error refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            MappingError::InvalidPath { path, .. } => Some(path),
            MappingError::MixedArrayAccess { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Produces a structured JSON error for FFI consumers.
    ///
    /// Format: `{"code": "...", "message": "...", "path": "..." | null}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "path": self.path(),
        })
    }
}
