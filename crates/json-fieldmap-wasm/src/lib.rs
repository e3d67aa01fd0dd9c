//! WASM bindings for json-fieldmap.
//!
//! Exposes the mapping engine to the browser editor via `wasm-bindgen`. Uses
//! `serde-wasm-bindgen` for JS ↔ serde_json::Value marshalling.
//!
//! ## WASM API Contract
//!
//! - Results are wrapped in an `apiVersion: "1.0"` envelope.
//! - Errors are structured JS objects `{ code, message, path }`.
//! - Optional `options` parameters default when `undefined` or `null`.
//! - Configs and options use the same **camelCase** shapes as the JSON files
//!   the CLI reads.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use serde_wasm_bindgen::Serializer;

use json_fieldmap_core::model::SourceDescriptor;
use json_fieldmap_core::{
    ApplyOptions, ExtractOptions, FieldDescriptor, FieldMapping, MappingConfig, MappingError,
    OutputField, SourceType, TransformKind, ValidationIssue, DEFAULT_THRESHOLD,
};

/// Version of the envelope shape returned by every export.
pub const API_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// WASM-local DTOs (Anti-Corruption Layer)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WasmApplyResult<'a> {
    api_version: &'static str,
    data: &'a serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WasmValidationResult<'a> {
    api_version: &'static str,
    valid: bool,
    errors: &'a [ValidationIssue],
    warnings: &'a [ValidationIssue],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WasmProposalResult<'a> {
    api_version: &'static str,
    mappings: &'a [FieldMapping],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WasmExtractResult<'a> {
    api_version: &'static str,
    fields: &'a [FieldDescriptor],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WasmTransformResult<'a> {
    api_version: &'static str,
    value: &'a serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WasmTransformValidationResult<'a> {
    api_version: &'static str,
    valid: bool,
    errors: &'a [String],
}

/// Extraction options as the editor sends them: the core `ExtractOptions`
/// plus the primary path to enter before walking.
///
/// NOTE: Keep in sync with `json_fieldmap_core::ExtractOptions`.
/// Defaults are sourced from `ExtractOptions::default()` (single source of truth).
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
struct WasmExtractOptions {
    primary_path: Option<String>,
    max_depth: Option<usize>,
    include_wildcards: Option<bool>,
    include_fixed_indices: Option<bool>,
    max_array_indices: Option<usize>,
    include_values: Option<bool>,
}

impl From<&WasmExtractOptions> for ExtractOptions {
    fn from(wasm: &WasmExtractOptions) -> Self {
        let defaults = ExtractOptions::default();
        ExtractOptions {
            max_depth: wasm.max_depth.unwrap_or(defaults.max_depth),
            include_wildcards: wasm.include_wildcards.unwrap_or(defaults.include_wildcards),
            include_fixed_indices: wasm
                .include_fixed_indices
                .unwrap_or(defaults.include_fixed_indices),
            max_array_indices: wasm.max_array_indices.unwrap_or(defaults.max_array_indices),
            include_values: wasm.include_values.unwrap_or(defaults.include_values),
        }
    }
}

/// A transformation definition without the bookkeeping `id`/`name` the
/// editor may not have assigned yet.
#[derive(Deserialize)]
struct WasmTransformation {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    config: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Error helpers
// ---------------------------------------------------------------------------

/// Map a `MappingError` to a structured JS object `{ code, message, path }`.
fn to_structured_js_error(e: &MappingError) -> JsValue {
    let serializer = Serializer::json_compatible();
    e.to_json().serialize(&serializer).unwrap_or_else(|_| {
        let fallback = serde_json::json!({
            "code": "serialization_error",
            "message": e.to_string(),
            "path": serde_json::Value::Null,
        });
        fallback
            .serialize(&serializer)
            .unwrap_or_else(|_| JsValue::from_str(&e.to_string()))
    })
}

/// Map a `serde_wasm_bindgen` deserialization error to `{ code: "json_parse_error", ... }`.
fn to_serde_js_error(e: serde_wasm_bindgen::Error) -> JsValue {
    let error_obj = serde_json::json!({
        "code": "json_parse_error",
        "message": e.to_string(),
        "path": serde_json::Value::Null,
    });
    let serializer = Serializer::json_compatible();
    error_obj.serialize(&serializer).unwrap_or_else(|_| {
        let fallback = serde_json::json!({
            "code": "serialization_error",
            "message": e.to_string(),
            "path": serde_json::Value::Null,
        });
        fallback
            .serialize(&serializer)
            .unwrap_or_else(|_| JsValue::from_str(&e.to_string()))
    })
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(to_serde_js_error)
}

/// Deserialize an optional argument, using `T::default()` for `undefined`/`null`.
fn from_js_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        from_js(value)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = Serializer::json_compatible();
    value.serialize(&serializer).map_err(to_serde_js_error)
}

// ---------------------------------------------------------------------------
// Public WASM API
// ---------------------------------------------------------------------------

/// Initialize WASM module: sets up panic hook for better error messages.
///
/// Called automatically when the WASM module loads (`#[wasm_bindgen(start)]`).
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Map one source document through a mapping config.
///
/// Returns `{ apiVersion: "1.0", data }`.
#[wasm_bindgen(js_name = applyMapping, skip_typescript)]
pub fn apply_mapping(source: JsValue, config: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    let source: serde_json::Value = from_js(source)?;
    let config: MappingConfig = from_js(config)?;
    let options: ApplyOptions = from_js_or_default(options)?;

    let data = json_fieldmap_core::apply_mapping_with(&source, &config, &options);
    to_js(&WasmApplyResult {
        api_version: API_VERSION,
        data: &data,
    })
}

/// Map several source documents, given as an object keyed by source id.
///
/// Returns `{ apiVersion: "1.0", data }`. Throws `source_not_found` when the
/// primary source has no document.
#[wasm_bindgen(js_name = applyMappingSources, skip_typescript)]
pub fn apply_mapping_sources(
    sources: JsValue,
    config: JsValue,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let sources: BTreeMap<String, serde_json::Value> = from_js(sources)?;
    let config: MappingConfig = from_js(config)?;
    let options: ApplyOptions = from_js_or_default(options)?;

    let data = json_fieldmap_core::apply_mapping_sources(&sources, &config, &options)
        .map_err(|e| to_structured_js_error(&e))?;
    to_js(&WasmApplyResult {
        api_version: API_VERSION,
        data: &data,
    })
}

/// Check a mapping config.
///
/// Returns `{ apiVersion: "1.0", valid, errors, warnings }`.
#[wasm_bindgen(js_name = validateConfig, skip_typescript)]
pub fn validate_config(config: JsValue) -> Result<JsValue, JsValue> {
    let config: MappingConfig = from_js(config)?;
    let report = json_fieldmap_core::validate_config(&config);
    to_js(&WasmValidationResult {
        api_version: API_VERSION,
        valid: report.valid,
        errors: &report.errors,
        warnings: &report.warnings,
    })
}

/// Propose mappings from source paths onto template fields.
///
/// `threshold` defaults to 0.7 when `undefined`.
/// Returns `{ apiVersion: "1.0", mappings }`.
#[wasm_bindgen(js_name = proposeMappings, skip_typescript)]
pub fn propose_mappings(
    source_paths: JsValue,
    target_fields: JsValue,
    threshold: Option<f64>,
) -> Result<JsValue, JsValue> {
    let source_paths: Vec<String> = from_js(source_paths)?;
    let target_fields: Vec<OutputField> = from_js(target_fields)?;
    let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);

    let mappings = json_fieldmap_core::propose(&source_paths, &target_fields, threshold);
    to_js(&WasmProposalResult {
        api_version: API_VERSION,
        mappings: &mappings,
    })
}

/// List the addressable fields of a sample document.
///
/// Returns `{ apiVersion: "1.0", fields }`.
#[wasm_bindgen(js_name = extractFields, skip_typescript)]
pub fn extract_fields(document: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    let document: serde_json::Value = from_js(document)?;
    let wasm_opts: WasmExtractOptions = from_js_or_default(options)?;
    let options = ExtractOptions::from(&wasm_opts);

    let source = SourceDescriptor::new("sample", "sample", SourceType::Object)
        .with_primary_path(wasm_opts.primary_path.unwrap_or_default());
    let fields = json_fieldmap_core::extract_source_fields(&document, &source, &options);
    to_js(&WasmExtractResult {
        api_version: API_VERSION,
        fields: &fields,
    })
}

/// Apply one transformation `{ type, config }` to a value, for live previews.
///
/// A transformation that fails at runtime yields the input value unchanged;
/// only an unknown `type` or malformed `config` throws.
/// Returns `{ apiVersion: "1.0", value }`.
#[wasm_bindgen(js_name = applyTransformation, skip_typescript)]
pub fn apply_transformation(value: JsValue, transformation: JsValue) -> Result<JsValue, JsValue> {
    let value: serde_json::Value = from_js(value)?;
    let transformation: WasmTransformation = from_js(transformation)?;

    let kind = TransformKind::from_parts(&transformation.type_name, transformation.config)
        .map_err(|e| to_structured_js_error(&e))?;
    let result = kind.apply(&value);
    to_js(&WasmTransformResult {
        api_version: API_VERSION,
        value: &result,
    })
}

/// Check a transformation config before saving it.
///
/// Returns `{ apiVersion: "1.0", valid, errors }`.
#[wasm_bindgen(js_name = validateTransformation, skip_typescript)]
pub fn validate_transformation(type_name: &str, config: JsValue) -> Result<JsValue, JsValue> {
    let config: serde_json::Value = from_js_or_default(config)?;
    let check = json_fieldmap_core::validate_transform(type_name, &config);
    to_js(&WasmTransformValidationResult {
        api_version: API_VERSION,
        valid: check.valid,
        errors: &check.errors,
    })
}

// ⚠️ SYNC WARNING: These TypeScript types are hand-authored to match the
// serialized JS shapes produced by serde + Serializer::json_compatible().
// If you modify any of these Rust types, you MUST update the corresponding
// TypeScript definitions below:
//
//   - MappingConfig (model/mod.rs)          → MappingConfig
//   - FieldMapping (model/mapping.rs)       → FieldMapping
//   - OutputField (model/template.rs)       → OutputField
//   - FieldDescriptor (extract.rs)          → FieldDescriptor
//   - ValidationIssue (validate.rs)         → ValidationIssue
//   - WasmExtractOptions (this file)        → ExtractOptions
//   - ErrorCode (error.rs)                  → ErrorCode
#[wasm_bindgen(typescript_custom_section)]
const TS_TYPES: &str = r#"
export type FieldType = "string" | "number" | "boolean" | "object" | "array" | "any";

export interface OutputField {
  path: string;
  type: FieldType;
  required?: boolean;
  defaultValue?: unknown;
  description?: string;
}

export type ConditionOperator =
  | "equals" | "not_equals" | "contains" | "greater_than" | "less_than" | "exists" | "not_exists";

export interface MappingCondition {
  when: string;
  operator: ConditionOperator;
  value?: unknown;
  then: unknown;
  else?: unknown;
}

export interface ArrayIndexConfig {
  fields: string[];
  indices: Record<string, number>;
  templatePath: string;
  mappingMode: "array" | "index";
}

export interface FieldMapping {
  id: string;
  sourcePath: string;
  targetPath: string;
  sourceId?: string;
  transformId?: string;
  fallbackValue?: unknown;
  conditional?: MappingCondition;
  arrayIndexConfig?: ArrayIndexConfig;
}

export interface Transformation {
  id: string;
  name: string;
  type: string;
  config: Record<string, unknown>;
}

export interface SourceDescriptor {
  id: string;
  name: string;
  type?: "array" | "object";
  category?: string;
  primaryPath?: string;
}

export interface MappingConfig {
  sourceSelection: {
    type?: "array" | "object";
    sources: SourceDescriptor[];
    primaryPath?: string;
    mergeMode?: "single" | "merge";
    unwrapSingleItems?: boolean;
  };
  outputTemplate: { fields: OutputField[] };
  fieldMappings: FieldMapping[];
  transformations: Transformation[];
  outputWrapper?: {
    enabled?: boolean;
    wrapperKey?: string;
    includeMetadata?: boolean;
    metadataFields?: { timestamp?: boolean; source?: boolean; count?: boolean; version?: boolean };
    customMetadata?: Record<string, unknown>;
  };
}

export interface ApplyOptions {
  templateDefaults?: boolean;
  timestamp?: string;
}

export interface ExtractOptions {
  primaryPath?: string;
  maxDepth?: number;
  includeWildcards?: boolean;
  includeFixedIndices?: boolean;
  maxArrayIndices?: number;
  includeValues?: boolean;
}

export interface FieldDescriptor {
  path: string;
  type: "string" | "number" | "boolean" | "null" | "object" | "array";
  value?: unknown;
}

export interface ValidationIssue {
  kind: string;
  message: string;
  mappingId?: string;
  path?: string;
}

export type ErrorCode =
  | "json_parse_error"
  | "invalid_path"
  | "mixed_array_access"
  | "unknown_transform_type"
  | "invalid_transform_config"
  | "transform_failed"
  | "mapping_not_found"
  | "transformation_not_found"
  | "source_not_found"
  | "expression_parse_error"
  | "expression_eval_error";

export interface StructuredError {
  code: ErrorCode;
  message: string;
  path: string | null;
}

export function applyMapping(
  source: unknown,
  config: MappingConfig,
  options?: ApplyOptions | null
): { apiVersion: string; data: unknown };

export function applyMappingSources(
  sources: Record<string, unknown>,
  config: MappingConfig,
  options?: ApplyOptions | null
): { apiVersion: string; data: unknown };

export function validateConfig(
  config: MappingConfig
): { apiVersion: string; valid: boolean; errors: ValidationIssue[]; warnings: ValidationIssue[] };

export function proposeMappings(
  sourcePaths: string[],
  targetFields: OutputField[],
  threshold?: number
): { apiVersion: string; mappings: FieldMapping[] };

export function extractFields(
  document: unknown,
  options?: ExtractOptions | null
): { apiVersion: string; fields: FieldDescriptor[] };

export function applyTransformation(
  value: unknown,
  transformation: { type: string; config?: Record<string, unknown> }
): { apiVersion: string; value: unknown };

export function validateTransformation(
  type: string,
  config?: Record<string, unknown> | null
): { apiVersion: string; valid: boolean; errors: string[] };
"#;
