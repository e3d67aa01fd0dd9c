//! Field mappings, conditionals and array-index bookkeeping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MappingError;
use crate::path::{format_path, parse_path, ArrayAccess};

/// A rule binding one source path to one target path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Stable identifier. Assigned once and preserved through every edit.
    pub id: String,
    pub source_path: String,
    pub target_path: String,
    /// Source document this mapping reads from. `None` means the primary source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_id: Option<String>,
    /// Written when the resolved value is null or missing.
    #[serde(
        default,
        deserialize_with = "crate::model::deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub fallback_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<MappingCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_index_config: Option<ArrayIndexConfig>,
}

impl FieldMapping {
    /// Create a mapping with a freshly generated id.
    pub fn new(source_path: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_path: source_path.into(),
            target_path: target_path.into(),
            source_id: None,
            transform_id: None,
            fallback_value: None,
            conditional: None,
            array_index_config: None,
        }
    }

    /// Replace the generated id. Intended for deserialization-free construction
    /// of known configs (tests, fixtures).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_transform(mut self, transform_id: impl Into<String>) -> Self {
        self.transform_id = Some(transform_id.into());
        self
    }

    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback_value = Some(fallback);
        self
    }

    pub fn with_conditional(mut self, conditional: MappingCondition) -> Self {
        self.conditional = Some(conditional);
        self
    }

    /// Attach an [`ArrayIndexConfig`] derived from the current source path.
    /// Paths without array segments are left unchanged.
    pub fn with_derived_index_config(mut self) -> Result<Self, MappingError> {
        self.array_index_config = ArrayIndexConfig::from_source_path(&self.source_path)?;
        Ok(self)
    }

    /// True when this mapping and `other` occupy the same (source, target) slot.
    pub fn same_slot(&self, other: &FieldMapping) -> bool {
        self.source_id == other.source_id && self.target_path == other.target_path
    }

    /// True when the mapping resolves a wildcard expansion into an output array.
    pub fn is_array_mode(&self) -> bool {
        self.array_index_config
            .as_ref()
            .is_some_and(|c| c.mapping_mode == ArrayMappingMode::Array)
    }
}

// ---------------------------------------------------------------------------
// Conditionals
// ---------------------------------------------------------------------------

/// Comparison applied by a [`MappingCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    Exists,
    NotExists,
}

/// Replaces a mapping's value depending on a test against the same source item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingCondition {
    /// Path evaluated against the source item (not the output).
    pub when: String,
    pub operator: ConditionOperator,
    #[serde(
        default,
        deserialize_with = "crate::model::deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
    #[serde(default)]
    pub then: Value,
    /// Value used when the test fails. `None` keeps the mapped value.
    #[serde(
        rename = "else",
        default,
        deserialize_with = "crate::model::deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub otherwise: Option<Value>,
}

// ---------------------------------------------------------------------------
// Array index configuration
// ---------------------------------------------------------------------------

/// How a mapping whose source traverses arrays is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayMappingMode {
    /// Expand every wildcard and emit an output array.
    Array,
    /// Resolve one concrete element per array segment.
    Index,
}

/// Array bookkeeping for a mapping whose `sourcePath` traverses arrays.
///
/// `template_path` has every array segment wildcarded. Substituting `indices`
/// back into it reproduces the source path, so the editor can change one index
/// without re-deriving the path from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayIndexConfig {
    /// Names of the array-bearing segments, in path order.
    pub fields: Vec<String>,
    /// Concrete index per array field. Fields absent here stay wildcarded.
    #[serde(default)]
    pub indices: BTreeMap<String, usize>,
    pub template_path: String,
    pub mapping_mode: ArrayMappingMode,
}

impl ArrayIndexConfig {
    /// Derive the config for a source path. Returns `Ok(None)` when the path
    /// has no array segments.
    ///
    /// Multi-dimensional segments (`grid[0][1]`) and repeated array field names
    /// cannot be represented by a single index per field and are rejected.
    pub fn from_source_path(source_path: &str) -> Result<Option<Self>, MappingError> {
        let mut segments = parse_path(source_path)?;
        let mut fields = Vec::new();
        let mut indices = BTreeMap::new();
        let mut any_wildcard = false;

        for segment in segments.iter_mut() {
            let index = match &segment.access {
                ArrayAccess::None => continue,
                ArrayAccess::Wildcard(1) => None,
                ArrayAccess::Indices(ix) if ix.len() == 1 => Some(ix[0]),
                _ => {
                    return Err(MappingError::InvalidPath {
                        path: source_path.to_string(),
                        message: format!(
                            "segment `{}` has more than one array suffix",
                            segment
                        ),
                    })
                }
            };
            if fields.contains(&segment.key) {
                return Err(MappingError::InvalidPath {
                    path: source_path.to_string(),
                    message: format!("array field `{}` appears more than once", segment.key),
                });
            }
            fields.push(segment.key.clone());
            match index {
                Some(i) => {
                    indices.insert(segment.key.clone(), i);
                }
                None => any_wildcard = true,
            }
            segment.access = ArrayAccess::Wildcard(1);
        }

        if fields.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            fields,
            indices,
            template_path: format_path(&segments),
            mapping_mode: if any_wildcard {
                ArrayMappingMode::Array
            } else {
                ArrayMappingMode::Index
            },
        }))
    }

    /// Substitute `indices` into `template_path`. Fields without an index keep
    /// their `[*]`.
    pub fn resolve_path(&self) -> Result<String, MappingError> {
        let mut segments = parse_path(&self.template_path)?;
        for segment in segments.iter_mut() {
            if let ArrayAccess::Wildcard(1) = segment.access {
                if let Some(index) = self.indices.get(&segment.key) {
                    segment.access = ArrayAccess::Indices(vec![*index]);
                }
            }
        }
        Ok(format_path(&segments))
    }

    /// True when substituting the indices reproduces `source_path` exactly.
    pub fn round_trips(&self, source_path: &str) -> bool {
        self.resolve_path().is_ok_and(|p| p == source_path)
    }

    /// Return a copy with `field` pinned to `index`. The mode becomes `index`
    /// once every field is pinned.
    pub fn with_index(&self, field: &str, index: usize) -> Result<Self, MappingError> {
        if !self.fields.iter().any(|f| f == field) {
            return Err(MappingError::InvalidPath {
                path: self.template_path.clone(),
                message: format!("`{}` is not an array field of this path", field),
            });
        }
        let mut next = self.clone();
        next.indices.insert(field.to_string(), index);
        if next.fields.iter().all(|f| next.indices.contains_key(f)) {
            next.mapping_mode = ArrayMappingMode::Index;
        }
        Ok(next)
    }

    /// Return a copy with `field` released back to a wildcard (array mode).
    pub fn without_index(&self, field: &str) -> Self {
        let mut next = self.clone();
        if next.indices.remove(field).is_some() {
            next.mapping_mode = ArrayMappingMode::Array;
        }
        next
    }
}
