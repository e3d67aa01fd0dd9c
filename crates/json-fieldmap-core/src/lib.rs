//! # json-fieldmap-core
//!
//! Declarative JSON field mapping: describe how fields of one or more source
//! documents map onto a target shape, then apply that description.
//!
//! ## Pipeline
//!
//! | Stage | Module | Purpose |
//! |-------|--------|---------|
//! | Extract | [`extract`] | Enumerate addressable paths in a sample document |
//! | Propose | [`automap`] | Suggest mappings by path similarity |
//! | Edit | [`model`] | Immutable edits over a [`MappingConfig`], with undo history |
//! | Validate | [`validate`] | Report errors and warnings before applying |
//! | Apply | [`apply`] | Produce the output document |
//!
//! Value-level transformations (text, number, date, lookup and sandboxed
//! custom expressions) live in [`transform`].
//!
//! ## Example
//!
//! ```rust
//! use json_fieldmap_core::{apply_mapping, MappingConfig};
//! use serde_json::json;
//!
//! let config = MappingConfig::from_json(r#"{
//!     "sourceSelection": {"type": "object", "sources": [{"id": "s", "name": "S"}], "primaryPath": ""},
//!     "outputTemplate": {"fields": [{"path": "name", "type": "string"}]},
//!     "fieldMappings": [{"id": "m1", "sourcePath": "fullName", "targetPath": "name"}]
//! }"#).unwrap();
//!
//! let out = apply_mapping(&json!({"fullName": "Ada"}), &config);
//! assert_eq!(out, json!({"name": "Ada"}));
//! ```

pub mod apply;
pub mod automap;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod path;
pub mod similarity;
pub mod transform;
pub mod validate;

pub use apply::{apply_mapping, apply_mapping_sources, apply_mapping_with, OUTPUT_VERSION};
pub use automap::{propose, propose_for_config, DEFAULT_THRESHOLD};
pub use config::{ApplyOptions, ExtractOptions};
pub use error::{ErrorCode, MappingError};
pub use extract::{
    extract_fields, extract_source_fields, ExtractionCache, FieldDescriptor, FieldKind,
};
pub use model::{
    ArrayIndexConfig, ArrayMappingMode, ConditionOperator, EditHistory, FieldMapping, FieldType,
    MappingCondition, MappingConfig, MappingTransformation, MergeMode, MetadataFields,
    OutputField, OutputTemplate, OutputWrapperConfig, SourceDescriptor, SourceSelection,
    SourceType,
};
pub use transform::{
    apply_transformation, validate_transform, TransformKind, TransformValidation,
};
pub use validate::{validate_config, IssueKind, ValidationIssue, ValidationReport};
