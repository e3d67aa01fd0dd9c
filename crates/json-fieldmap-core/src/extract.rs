//! Field extraction from sample documents.
//!
//! Walks a JSON value and reports every addressable field as a
//! [`FieldDescriptor`]: a path the applier can resolve plus a shallow type.
//! Arrays are generalized through their first element as `field[*]` and may
//! additionally be expanded through concrete indices.
//!
//! ## Usage
//!
//! ```rust
//! use json_fieldmap_core::{extract_fields, ExtractOptions};
//! use serde_json::json;
//!
//! let doc = json!({"user": {"name": "Ada", "tags": ["a", "b"]}, "orders": [{"id": 1}]});
//! let paths: Vec<String> = extract_fields(&doc, "", &ExtractOptions::default())
//!     .into_iter()
//!     .map(|f| f.path)
//!     .collect();
//! assert_eq!(paths, vec!["user.name", "user.tags", "orders[*].id"]);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ExtractOptions;
use crate::model::SourceDescriptor;
use crate::path::{self, join_path};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Shallow JSON type of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Null,
    Object,
    Array,
}

/// One extracted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Sample value, present only with `include_values`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Shallow type detection.
pub fn detect_type(value: &Value) -> FieldKind {
    match value {
        Value::String(_) => FieldKind::String,
        Value::Number(_) => FieldKind::Number,
        Value::Bool(_) => FieldKind::Boolean,
        Value::Null => FieldKind::Null,
        Value::Object(_) => FieldKind::Object,
        Value::Array(_) => FieldKind::Array,
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract every field of `value`, prefixing paths with `base_path`.
///
/// Recursion stops after `max_depth` container levels: a container reached
/// with no depth left is reported as one descriptor of its own type.
pub fn extract_fields(value: &Value, base_path: &str, options: &ExtractOptions) -> Vec<FieldDescriptor> {
    let mut out = Vec::new();
    walk(value, base_path, options.max_depth, options, &mut out);
    out
}

fn emit(out: &mut Vec<FieldDescriptor>, path: &str, value: &Value, options: &ExtractOptions) {
    out.push(FieldDescriptor {
        path: path.to_string(),
        kind: detect_type(value),
        value: options.include_values.then(|| value.clone()),
    });
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn walk(value: &Value, path: &str, depth: usize, options: &ExtractOptions, out: &mut Vec<FieldDescriptor>) {
    match value {
        Value::Object(map) => {
            if map.is_empty() || depth == 0 {
                if !path.is_empty() {
                    emit(out, path, value, options);
                }
                return;
            }
            for (key, child) in map {
                walk(child, &join_path(path, key), depth - 1, options, out);
            }
        }
        Value::Array(items) => {
            let nested = items.iter().any(is_container);
            if items.is_empty() || !nested || depth == 0 {
                emit(out, path, value, options);
                return;
            }
            // A segment's suffixes must be all `[*]` or all `[N]`.
            let under_wildcard = path.ends_with("[*]");
            let under_index = path.ends_with(']') && !under_wildcard;
            let before = out.len();
            if options.include_wildcards && !under_index {
                if let Some(first) = items.first() {
                    walk(first, &format!("{}[*]", path), depth - 1, options, out);
                }
            }
            if options.include_fixed_indices && !under_wildcard {
                for (i, item) in items.iter().take(options.max_array_indices).enumerate() {
                    walk(item, &format!("{}[{}]", path, i), depth - 1, options, out);
                }
            }
            if out.len() == before {
                emit(out, path, value, options);
            }
        }
        _ => emit(out, path, value, options),
    }
}

/// Extract the fields of one source document.
///
/// The source's `primaryPath` is navigated first. When it lands on an array,
/// the leading `[*].` every path would carry is dropped, since iteration over
/// that array is already implied by the primary path.
pub fn extract_source_fields(
    document: &Value,
    source: &SourceDescriptor,
    options: &ExtractOptions,
) -> Vec<FieldDescriptor> {
    let Some(root) = path::get(document, &source.primary_path) else {
        tracing::debug!(
            source = %source.id,
            primary_path = %source.primary_path,
            "primary path does not resolve, no fields extracted"
        );
        return Vec::new();
    };

    let mut fields = extract_fields(root, "", options);
    if root.is_array() {
        for field in &mut fields {
            if let Some(rest) = field.path.strip_prefix("[*].") {
                field.path = rest.to_string();
            } else if field.path == "[*]" {
                field.path.clear();
            }
        }
    }
    fields
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Caller-owned memo of extraction results.
///
/// Entries are keyed by source id, primary path and options. Callers
/// invalidate a source when its sample document changes.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: HashMap<(String, String, ExtractOptions), Vec<FieldDescriptor>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_extract(
        &mut self,
        source: &SourceDescriptor,
        document: &Value,
        options: &ExtractOptions,
    ) -> &[FieldDescriptor] {
        let key = (source.id.clone(), source.primary_path.clone(), *options);
        self.entries
            .entry(key)
            .or_insert_with(|| extract_source_fields(document, source, options))
    }

    /// Drop every entry for `source_id`.
    pub fn invalidate(&mut self, source_id: &str) {
        self.entries.retain(|(id, _, _), _| id != source_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn paths(fields: &[FieldDescriptor]) -> Vec<&str> {
        fields.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn leaves_and_nested_objects() {
        let doc = json!({"a": 1, "b": {"c": "x", "d": null}, "e": {}});
        let fields = extract_fields(&doc, "", &ExtractOptions::default());
        assert_eq!(paths(&fields), vec!["a", "b.c", "b.d", "e"]);
        assert_eq!(fields[0].kind, FieldKind::Number);
        assert_eq!(fields[2].kind, FieldKind::Null);
        assert_eq!(fields[3].kind, FieldKind::Object);
    }

    #[test]
    fn scalar_arrays_are_one_descriptor() {
        let doc = json!({"tags": ["a", "b"], "empty": []});
        let fields = extract_fields(&doc, "", &ExtractOptions::default());
        assert_eq!(paths(&fields), vec!["tags", "empty"]);
        assert!(fields.iter().all(|f| f.kind == FieldKind::Array));
    }

    #[test]
    fn wildcard_generalizes_through_first_element() {
        let doc = json!({"items": [{"sku": "a"}, {"sku": "b", "extra": 1}]});
        let fields = extract_fields(&doc, "", &ExtractOptions::default());
        assert_eq!(paths(&fields), vec!["items[*].sku"]);
    }

    #[test]
    fn fixed_indices_are_bounded() {
        let doc = json!({"items": [{"n": 1}, {"n": 2}, {"n": 3}, {"n": 4}]});
        let opts = ExtractOptions {
            include_wildcards: false,
            include_fixed_indices: true,
            max_array_indices: 2,
            ..Default::default()
        };
        let fields = extract_fields(&doc, "", &opts);
        assert_eq!(paths(&fields), vec!["items[0].n", "items[1].n"]);
    }

    #[test]
    fn nested_arrays_stack_wildcards() {
        let doc = json!({"grid": [[{"v": 1}]]});
        let fields = extract_fields(&doc, "", &ExtractOptions::default());
        assert_eq!(paths(&fields), vec!["grid[*][*].v"]);
    }

    #[test]
    fn nested_arrays_never_mix_suffixes() {
        let doc = json!({"grid": [[{"v": 1}]]});
        let opts = ExtractOptions {
            include_fixed_indices: true,
            ..Default::default()
        };
        let fields = extract_fields(&doc, "", &opts);
        assert_eq!(paths(&fields), vec!["grid[*][*].v", "grid[0][0].v"]);
    }

    #[test]
    fn depth_limit_reports_container() {
        let doc = json!({"a": {"b": {"c": {"d": 1}}}});
        let opts = ExtractOptions {
            max_depth: 2,
            ..Default::default()
        };
        let fields = extract_fields(&doc, "", &opts);
        assert_eq!(paths(&fields), vec!["a.b"]);
        assert_eq!(fields[0].kind, FieldKind::Object);
    }

    #[test]
    fn deep_document_terminates() {
        let mut doc = json!(1);
        for _ in 0..500 {
            doc = json!({ "n": doc });
        }
        let fields = extract_fields(&doc, "", &ExtractOptions::default());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].path.split('.').count(), 10);
    }

    #[test]
    fn include_values_attaches_samples() {
        let doc = json!({"a": "x"});
        let opts = ExtractOptions {
            include_values: true,
            ..Default::default()
        };
        assert_eq!(extract_fields(&doc, "", &opts)[0].value, Some(json!("x")));
        assert_eq!(extract_fields(&doc, "", &ExtractOptions::default())[0].value, None);
    }

    #[test]
    fn base_path_prefixes_everything() {
        let doc = json!({"a": 1});
        let fields = extract_fields(&doc, "root", &ExtractOptions::default());
        assert_eq!(paths(&fields), vec!["root.a"]);
    }

    #[test]
    fn source_fields_strip_leading_wildcard() {
        let doc = json!({"data": {"users": [{"name": "Ada", "address": {"city": "London"}}]}});
        let source = SourceDescriptor::new("u", "Users", SourceType::Array).with_primary_path("data.users");
        let fields = extract_source_fields(&doc, &source, &ExtractOptions::default());
        assert_eq!(paths(&fields), vec!["name", "address.city"]);
    }

    #[test]
    fn source_fields_missing_primary_path() {
        let source = SourceDescriptor::new("u", "Users", SourceType::Array).with_primary_path("nope");
        assert!(extract_source_fields(&json!({}), &source, &ExtractOptions::default()).is_empty());
    }

    #[test]
    fn cache_memoizes_and_invalidates() {
        let doc = json!({"a": 1});
        let source = SourceDescriptor::new("s1", "S", SourceType::Object);
        let mut cache = ExtractionCache::new();
        assert_eq!(cache.get_or_extract(&source, &doc, &ExtractOptions::default()).len(), 1);

        // A changed document is not seen until the source is invalidated.
        let changed = json!({"a": 1, "b": 2});
        assert_eq!(cache.get_or_extract(&source, &changed, &ExtractOptions::default()).len(), 1);
        cache.invalidate("s1");
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_extract(&source, &changed, &ExtractOptions::default()).len(), 2);

        let other_opts = ExtractOptions {
            include_values: true,
            ..Default::default()
        };
        cache.get_or_extract(&source, &changed, &other_opts);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn detect_type_is_shallow() {
        assert_eq!(detect_type(&json!([1])), FieldKind::Array);
        assert_eq!(detect_type(&json!(true)), FieldKind::Boolean);
        assert_eq!(detect_type(&json!("s")), FieldKind::String);
    }
}
