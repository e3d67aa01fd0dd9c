//! Mapping application: source documents in, mapped documents out.
//!
//! ## Pipeline
//!
//! 1. Resolve the selection's primary path against the primary document.
//! 2. For an array root under an `array` selection, map every element on its
//!    own; otherwise map the root as one item.
//! 3. Per item, run the field mappings in declaration order: resolve the
//!    source path, transform, apply the conditional, fall back on null or
//!    missing, then write the target path. Later mappings overwrite earlier
//!    ones. Template defaults fill whatever is still absent.
//! 4. Wrap the payload in the output envelope when one is enabled.
//!
//! Application never fails on account of the data: misses become fallbacks,
//! transformation failures keep the input value, and one mapping never
//! prevents the next from running.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

use crate::config::ApplyOptions;
use crate::error::MappingError;
use crate::model::{
    ConditionOperator, FieldMapping, MappingCondition, MappingConfig, MappingTransformation,
    MergeMode, OutputWrapperConfig, SourceType,
};
use crate::path::{self, has_wildcard, strip_wildcards};
use crate::transform::coerce::{to_display_string, to_number};
use crate::transform::date::to_iso;
use crate::transform::apply_transformation;

/// Version string reported by the wrapper's `version` metadata.
pub const OUTPUT_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Map a single source document with default options.
pub fn apply_mapping(source: &Value, config: &MappingConfig) -> Value {
    apply_mapping_with(source, config, &ApplyOptions::default())
}

/// Map a single source document. Mappings bound to a secondary source see
/// that source as missing.
pub fn apply_mapping_with(source: &Value, config: &MappingConfig, options: &ApplyOptions) -> Value {
    let primary_id = config.source_selection.primary().map(|s| s.id.as_str());
    let ctx = Context::new(config, primary_id, Vec::new());
    run(source, &ctx, options)
}

/// Map several documents keyed by source id.
///
/// Iteration is driven by the first selected source. With `mergeMode: merge`,
/// a mapping bound to another source reads that source's element at the same
/// position (array roots) or its root (anything else).
pub fn apply_mapping_sources(
    sources: &BTreeMap<String, Value>,
    config: &MappingConfig,
    options: &ApplyOptions,
) -> Result<Value, MappingError> {
    let selection = &config.source_selection;
    let primary = selection
        .primary()
        .ok_or_else(|| MappingError::SourceNotFound("no source selected".to_string()))?;
    let document = sources
        .get(&primary.id)
        .ok_or_else(|| MappingError::SourceNotFound(primary.id.clone()))?;

    let secondary = selection
        .sources
        .iter()
        .skip(1)
        .filter_map(|descriptor| {
            let Some(doc) = sources.get(&descriptor.id) else {
                tracing::debug!(source = %descriptor.id, "no document supplied for secondary source");
                return None;
            };
            let root = path::get(doc, &descriptor.primary_path)?;
            Some((descriptor.id.as_str(), root))
        })
        .collect();

    let ctx = Context::new(config, Some(primary.id.as_str()), secondary);
    Ok(run(document, &ctx, options))
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Read-only state shared by every item of one application.
struct Context<'a> {
    config: &'a MappingConfig,
    transforms: HashMap<&'a str, &'a MappingTransformation>,
    primary_id: Option<&'a str>,
    secondary: Vec<(&'a str, &'a Value)>,
}

/// Where a mapping reads from for one item.
enum Input<'a> {
    /// The mapping is not evaluated at all.
    Skip,
    Item(Option<&'a Value>),
}

impl<'a> Context<'a> {
    fn new(
        config: &'a MappingConfig,
        primary_id: Option<&'a str>,
        secondary: Vec<(&'a str, &'a Value)>,
    ) -> Self {
        let transforms = config
            .transformations
            .iter()
            .map(|t| (t.id.as_str(), t))
            .collect();
        Self {
            config,
            transforms,
            primary_id,
            secondary,
        }
    }

    fn input_for<'s>(&'s self, mapping: &FieldMapping, item: &'s Value, index: Option<usize>) -> Input<'s> {
        let Some(source_id) = mapping.source_id.as_deref() else {
            return Input::Item(Some(item));
        };
        if Some(source_id) == self.primary_id {
            return Input::Item(Some(item));
        }
        if self.config.source_selection.merge_mode == MergeMode::Single {
            return Input::Skip;
        }
        let root = self
            .secondary
            .iter()
            .find(|(id, _)| *id == source_id)
            .map(|(_, root)| *root);
        Input::Item(match (root, index) {
            (Some(Value::Array(items)), Some(i)) => items.get(i),
            (other, _) => other,
        })
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

fn run(document: &Value, ctx: &Context<'_>, options: &ApplyOptions) -> Value {
    let selection = &ctx.config.source_selection;
    let primary_path = selection.effective_primary_path();
    let root = match path::get(document, primary_path) {
        Some(root) => root,
        None => {
            tracing::debug!(primary_path, "primary path does not resolve, mapping an empty item");
            &Value::Null
        }
    };

    let payload = match root {
        Value::Array(items) if selection.source_type == SourceType::Array => {
            let mut results = map_items(items, ctx, options);
            if selection.unwrap_single_items && results.len() == 1 {
                results.pop().unwrap_or(Value::Null)
            } else {
                Value::Array(results)
            }
        }
        single => map_item(single, None, ctx, options),
    };

    match &ctx.config.output_wrapper {
        Some(wrapper) if wrapper.enabled => wrap(payload, wrapper, ctx.config, options),
        _ => payload,
    }
}

#[cfg(not(feature = "parallel"))]
fn map_items(items: &[Value], ctx: &Context<'_>, options: &ApplyOptions) -> Vec<Value> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| map_item(item, Some(i), ctx, options))
        .collect()
}

#[cfg(feature = "parallel")]
fn map_items(items: &[Value], ctx: &Context<'_>, options: &ApplyOptions) -> Vec<Value> {
    use rayon::prelude::*;

    items
        .par_iter()
        .enumerate()
        .map(|(i, item)| map_item(item, Some(i), ctx, options))
        .collect()
}

fn map_item(item: &Value, index: Option<usize>, ctx: &Context<'_>, options: &ApplyOptions) -> Value {
    let mut out = Value::Object(Map::new());

    for mapping in &ctx.config.field_mappings {
        let input = match ctx.input_for(mapping, item, index) {
            Input::Skip => {
                tracing::trace!(mapping = %mapping.id, "skipping mapping of unmerged source");
                continue;
            }
            Input::Item(input) => input,
        };
        let (target, value) = map_field(mapping, input, ctx);
        match value {
            Some(value) => path::set_in_place(&mut out, &target, value),
            None => tracing::trace!(mapping = %mapping.id, "no value and no fallback, target left unset"),
        }
    }

    if options.template_defaults {
        for field in &ctx.config.output_template.fields {
            if let Some(default) = &field.default_value {
                if path::get(&out, &field.path).is_none() {
                    path::set_in_place(&mut out, &field.path, default.clone());
                }
            }
        }
    }
    out
}

/// Compute the target path and the value one mapping writes, if any.
fn map_field(mapping: &FieldMapping, input: Option<&Value>, ctx: &Context<'_>) -> (String, Option<Value>) {
    let transformation = mapping.transform_id.as_deref().and_then(|id| {
        let found = ctx.transforms.get(id).copied();
        if found.is_none() {
            tracing::debug!(mapping = %mapping.id, transform = id, "unknown transformation, value left as is");
        }
        found
    });
    let transform = |v: &Value| match transformation {
        Some(t) => apply_transformation(v, t),
        None => v.clone(),
    };

    let expansion = array_template(mapping);
    let (target, resolved) = match &expansion {
        Some(template) => {
            let values: Vec<Value> = input
                .map(|src| path::get_all(src, template))
                .unwrap_or_default()
                .into_iter()
                .map(transform)
                .collect();
            let value = (!values.is_empty()).then_some(Value::Array(values));
            (strip_wildcards(&mapping.target_path), value)
        }
        None => {
            let value = input
                .and_then(|src| path::get(src, &mapping.source_path))
                .map(transform);
            (mapping.target_path.clone(), value)
        }
    };

    let conditioned = match &mapping.conditional {
        Some(condition) => apply_condition(condition, input, resolved),
        None => resolved,
    };

    let value = match conditioned {
        None | Some(Value::Null) if mapping.fallback_value.is_some() => mapping.fallback_value.clone(),
        other => other,
    };
    (target, value)
}

/// The path to expand over arrays, for mappings that produce an output array.
fn array_template(mapping: &FieldMapping) -> Option<String> {
    if mapping.is_array_mode() {
        let config = mapping.array_index_config.as_ref()?;
        match config.resolve_path() {
            Ok(resolved) => return Some(resolved),
            Err(e) => {
                tracing::debug!(mapping = %mapping.id, error = %e, "array index config does not resolve");
            }
        }
    }
    has_wildcard(&mapping.source_path).then(|| mapping.source_path.clone())
}

// ---------------------------------------------------------------------------
// Conditionals
// ---------------------------------------------------------------------------

fn apply_condition(condition: &MappingCondition, input: Option<&Value>, value: Option<Value>) -> Option<Value> {
    if evaluate_condition(condition, input) {
        Some(condition.then.clone())
    } else {
        match &condition.otherwise {
            Some(otherwise) => Some(otherwise.clone()),
            None => value,
        }
    }
}

/// Test a condition against the source item it belongs to.
pub fn evaluate_condition(condition: &MappingCondition, item: Option<&Value>) -> bool {
    let actual = item.and_then(|i| path::get(i, &condition.when));
    let expected = condition.value.as_ref();

    match condition.operator {
        ConditionOperator::Exists => actual.is_some_and(|v| !v.is_null()),
        ConditionOperator::NotExists => !actual.is_some_and(|v| !v.is_null()),
        ConditionOperator::Equals => loosely_equal(actual, expected),
        ConditionOperator::NotEquals => !loosely_equal(actual, expected),
        // Substring test on the display strings; arrays join with commas.
        ConditionOperator::Contains => match (actual, expected) {
            (Some(a), Some(e)) if !a.is_null() => {
                to_display_string(a).contains(to_display_string(e).as_str())
            }
            _ => false,
        },
        ConditionOperator::GreaterThan => compare(actual, expected).is_some_and(|(a, e)| a > e),
        ConditionOperator::LessThan => compare(actual, expected).is_some_and(|(a, e)| a < e),
    }
}

/// JSON equality, or string equality when the types differ. Missing and
/// null are equal to each other.
fn loosely_equal(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    let a = actual.unwrap_or(&Value::Null);
    let e = expected.unwrap_or(&Value::Null);
    if a == e {
        return true;
    }
    if a.is_null() || e.is_null() {
        return false;
    }
    std::mem::discriminant(a) != std::mem::discriminant(e)
        && to_display_string(a) == to_display_string(e)
}

fn compare(actual: Option<&Value>, expected: Option<&Value>) -> Option<(f64, f64)> {
    Some((to_number(actual?)?, to_number(expected?)?))
}

// ---------------------------------------------------------------------------
// Wrapper
// ---------------------------------------------------------------------------

fn wrap(payload: Value, wrapper: &OutputWrapperConfig, config: &MappingConfig, options: &ApplyOptions) -> Value {
    let mut envelope = Map::new();

    if wrapper.include_metadata {
        let fields = wrapper.metadata_fields;
        if fields.timestamp {
            envelope.insert("timestamp".to_string(), Value::String(to_iso(&options.now())));
        }
        if fields.source {
            if let Some(source) = config.source_selection.primary() {
                envelope.insert("source".to_string(), json!({"id": source.id, "name": source.name}));
            }
        }
        if fields.count {
            let count = payload.as_array().map_or(1, Vec::len);
            envelope.insert("count".to_string(), json!(count));
        }
        if fields.version {
            envelope.insert("version".to_string(), json!(OUTPUT_VERSION));
        }
        for (key, value) in &wrapper.custom_metadata {
            envelope.insert(key.clone(), value.clone());
        }
    }

    let key = if wrapper.wrapper_key.is_empty() {
        "data".to_string()
    } else {
        wrapper.wrapper_key.clone()
    };
    envelope.insert(key, payload);
    Value::Object(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        FieldType, MetadataFields, OutputField, SourceDescriptor, SourceSelection,
    };
    use crate::transform::{CalcOperation, CalculateConfig, TransformKind};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn config(source_type: SourceType, mappings: Vec<FieldMapping>) -> MappingConfig {
        MappingConfig {
            source_selection: SourceSelection {
                source_type,
                sources: vec![SourceDescriptor::new("src", "Source", source_type)],
                primary_path: Some(String::new()),
                ..Default::default()
            },
            field_mappings: mappings,
            ..Default::default()
        }
    }

    fn condition(when: &str, operator: ConditionOperator, value: Option<Value>) -> MappingCondition {
        MappingCondition {
            when: when.to_string(),
            operator,
            value,
            then: json!("yes"),
            otherwise: Some(json!("no")),
        }
    }

    #[test]
    fn nested_source_to_nested_target() {
        let cfg = config(SourceType::Object, vec![FieldMapping::new("user.name", "profile.fullName")]);
        let out = apply_mapping(&json!({"user": {"name": "Ada"}}), &cfg);
        assert_eq!(out, json!({"profile": {"fullName": "Ada"}}));
    }

    #[test]
    fn array_items_are_mapped_independently() {
        let cfg = config(SourceType::Array, vec![FieldMapping::new("id", "itemId")]);
        let out = apply_mapping(&json!([{"id": 1}, {"id": 2}]), &cfg);
        assert_eq!(out, json!([{"itemId": 1}, {"itemId": 2}]));
    }

    #[test]
    fn unwrap_single_items() {
        let mut cfg = config(SourceType::Array, vec![FieldMapping::new("id", "itemId")]);
        cfg.source_selection.unwrap_single_items = true;
        assert_eq!(apply_mapping(&json!([{"id": 1}]), &cfg), json!({"itemId": 1}));
        assert_eq!(
            apply_mapping(&json!([{"id": 1}, {"id": 2}]), &cfg),
            json!([{"itemId": 1}, {"itemId": 2}])
        );
    }

    #[test]
    fn object_selection_keeps_array_root_whole() {
        let cfg = config(SourceType::Object, vec![FieldMapping::new("0.id", "first")]);
        assert_eq!(apply_mapping(&json!([{"id": 7}]), &cfg), json!({"first": 7}));
    }

    #[test]
    fn primary_path_selects_the_root() {
        let mut cfg = config(SourceType::Array, vec![FieldMapping::new("n", "m")]);
        cfg.source_selection.primary_path = Some("data.rows".to_string());
        let out = apply_mapping(&json!({"data": {"rows": [{"n": 1}]}}), &cfg);
        assert_eq!(out, json!([{"m": 1}]));
    }

    #[test]
    fn later_mappings_overwrite_earlier() {
        let cfg = config(
            SourceType::Object,
            vec![FieldMapping::new("a", "out"), FieldMapping::new("b", "out")],
        );
        assert_eq!(apply_mapping(&json!({"a": 1, "b": 2}), &cfg), json!({"out": 2}));
    }

    #[test]
    fn fallback_on_null_or_missing_and_absent_otherwise() {
        let cfg = config(
            SourceType::Object,
            vec![
                FieldMapping::new("missing", "a").with_fallback(json!("fb")),
                FieldMapping::new("nil", "b").with_fallback(json!(0)),
                FieldMapping::new("missing", "c"),
                FieldMapping::new("nil", "d"),
            ],
        );
        let out = apply_mapping(&json!({"nil": null}), &cfg);
        assert_eq!(out, json!({"a": "fb", "b": 0, "d": null}));
    }

    #[test]
    fn transformation_is_applied_by_id() {
        let t = MappingTransformation::new(
            "Halve",
            TransformKind::Calculate(CalculateConfig {
                operation: CalcOperation::Divide,
                value: 2.0,
            }),
        )
        .with_id("t1");
        let mut cfg = config(
            SourceType::Object,
            vec![
                FieldMapping::new("n", "half").with_transform("t1"),
                FieldMapping::new("n", "same").with_transform("nope"),
            ],
        );
        cfg.transformations.push(t);
        assert_eq!(apply_mapping(&json!({"n": 9}), &cfg), json!({"half": 4.5, "same": 9}));
    }

    #[test]
    fn conditional_overrides_transformed_value() {
        let t = MappingTransformation::new("Up", TransformKind::Uppercase).with_id("t1");
        let mut cfg = config(
            SourceType::Object,
            vec![FieldMapping::new("name", "flag")
                .with_transform("t1")
                .with_conditional(condition("status", ConditionOperator::Equals, Some(json!("active"))))],
        );
        cfg.transformations.push(t);
        assert_eq!(
            apply_mapping(&json!({"name": "x", "status": "active"}), &cfg),
            json!({"flag": "yes"})
        );
        assert_eq!(
            apply_mapping(&json!({"name": "x", "status": "gone"}), &cfg),
            json!({"flag": "no"})
        );
    }

    #[test]
    fn conditional_without_else_keeps_value() {
        let mut cond = condition("vip", ConditionOperator::Exists, None);
        cond.otherwise = None;
        let cfg = config(
            SourceType::Object,
            vec![FieldMapping::new("name", "label").with_conditional(cond)],
        );
        assert_eq!(apply_mapping(&json!({"name": "Ada"}), &cfg), json!({"label": "Ada"}));
        assert_eq!(
            apply_mapping(&json!({"name": "Ada", "vip": true}), &cfg),
            json!({"label": "yes"})
        );
    }

    #[test]
    fn contains_matches_substrings_of_array_elements() {
        let cfg = config(
            SourceType::Object,
            vec![FieldMapping::new("tags", "out")
                .with_conditional(condition("tags", ConditionOperator::Contains, Some(json!("a"))))],
        );
        assert_eq!(apply_mapping(&json!({"tags": ["ab", "cd"]}), &cfg), json!({"out": "yes"}));
        assert_eq!(apply_mapping(&json!({"tags": ["xy"]}), &cfg), json!({"out": "no"}));
    }

    #[test]
    fn explicit_null_else_writes_null_or_falls_back() {
        let cfg: MappingConfig = serde_json::from_value(json!({
            "sourceSelection": {"sources": [{"id": "s", "name": "S"}], "primaryPath": ""},
            "fieldMappings": [
                {"id": "m1", "sourcePath": "name", "targetPath": "out",
                 "conditional": {"when": "vip", "operator": "exists", "then": "yes", "else": null}},
                {"id": "m2", "sourcePath": "name", "targetPath": "backup", "fallbackValue": "none",
                 "conditional": {"when": "vip", "operator": "exists", "then": "yes", "else": null}}
            ]
        }))
        .unwrap();
        assert_eq!(
            apply_mapping(&json!({"name": "Ada"}), &cfg),
            json!({"out": null, "backup": "none"})
        );
    }

    #[test]
    fn condition_operators() {
        let item = json!({"n": "10", "s": "hello world", "tags": ["a", "b"], "z": null});
        let check = |when: &str, op, value: Option<Value>| {
            evaluate_condition(&condition(when, op, value), Some(&item))
        };
        assert!(check("n", ConditionOperator::Equals, Some(json!(10))));
        assert!(check("n", ConditionOperator::NotEquals, Some(json!(11))));
        assert!(check("s", ConditionOperator::Contains, Some(json!("world"))));
        assert!(check("tags", ConditionOperator::Contains, Some(json!("b"))));
        assert!(!check("tags", ConditionOperator::Contains, Some(json!("c"))));
        assert!(check("tags", ConditionOperator::Contains, Some(json!("a,b"))));
        assert!(check("n", ConditionOperator::GreaterThan, Some(json!(9))));
        assert!(check("n", ConditionOperator::LessThan, Some(json!("11"))));
        assert!(!check("s", ConditionOperator::GreaterThan, Some(json!(1))));
        assert!(check("n", ConditionOperator::Exists, None));
        assert!(check("z", ConditionOperator::NotExists, None));
        assert!(check("missing", ConditionOperator::NotExists, None));
        assert!(check("missing", ConditionOperator::Equals, None));
    }

    #[test]
    fn array_mode_expands_wildcards() {
        let mapping = FieldMapping::new("orders[*].total", "totals[*]")
            .with_derived_index_config()
            .unwrap();
        let cfg = config(SourceType::Object, vec![mapping]);
        let out = apply_mapping(&json!({"orders": [{"total": 5}, {"total": 7}, {}]}), &cfg);
        assert_eq!(out, json!({"totals": [5, 7]}));
    }

    #[test]
    fn array_mode_transforms_each_element() {
        let t = MappingTransformation::new("Up", TransformKind::Uppercase).with_id("t1");
        let mut cfg = config(
            SourceType::Object,
            vec![FieldMapping::new("tags[*].name", "names").with_transform("t1")],
        );
        cfg.transformations.push(t);
        let out = apply_mapping(&json!({"tags": [{"name": "a"}, {"name": "b"}]}), &cfg);
        assert_eq!(out, json!({"names": ["A", "B"]}));
    }

    #[test]
    fn fixed_index_reads_one_element() {
        let mapping = FieldMapping::new("orders[1].total", "second")
            .with_derived_index_config()
            .unwrap();
        let cfg = config(SourceType::Object, vec![mapping]);
        let out = apply_mapping(&json!({"orders": [{"total": 5}, {"total": 7}]}), &cfg);
        assert_eq!(out, json!({"second": 7}));
    }

    #[test]
    fn template_defaults_fill_absent_paths() {
        let mut cfg = config(SourceType::Object, vec![FieldMapping::new("a", "x")]);
        cfg.output_template.fields = vec![
            OutputField::new("x", FieldType::Any).with_default(json!("dx")),
            OutputField::new("meta.kind", FieldType::String).with_default(json!("person")),
        ];
        let out = apply_mapping(&json!({"a": 1}), &cfg);
        assert_eq!(out, json!({"x": 1, "meta": {"kind": "person"}}));

        let off = ApplyOptions {
            template_defaults: false,
            ..Default::default()
        };
        assert_eq!(apply_mapping_with(&json!({"a": 1}), &cfg, &off), json!({"x": 1}));
    }

    #[test]
    fn wrapper_with_metadata() {
        let mut cfg = config(SourceType::Array, vec![FieldMapping::new("id", "id")]);
        let mut wrapper = OutputWrapperConfig::enabled("items").with_metadata(MetadataFields {
            version: true,
            ..Default::default()
        });
        wrapper.custom_metadata.insert("env".to_string(), json!("test"));
        cfg.output_wrapper = Some(wrapper);

        let options = ApplyOptions {
            timestamp: Some(chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            ..Default::default()
        };
        let out = apply_mapping_with(&json!([{"id": 1}, {"id": 2}]), &cfg, &options);
        assert_eq!(
            out,
            json!({
                "timestamp": "2024-01-02T03:04:05.000Z",
                "source": {"id": "src", "name": "Source"},
                "count": 2,
                "version": "1.0",
                "env": "test",
                "items": [{"id": 1}, {"id": 2}]
            })
        );
    }

    #[test]
    fn wrapper_without_metadata() {
        let mut cfg = config(SourceType::Object, vec![FieldMapping::new("id", "id")]);
        cfg.output_wrapper = Some(OutputWrapperConfig::enabled("data"));
        assert_eq!(apply_mapping(&json!({"id": 1}), &cfg), json!({"data": {"id": 1}}));

        cfg.output_wrapper = Some(OutputWrapperConfig::default());
        assert_eq!(apply_mapping(&json!({"id": 1}), &cfg), json!({"id": 1}));
    }

    #[test]
    fn merge_mode_reads_secondary_sources_by_position() {
        let mut cfg = config(
            SourceType::Array,
            vec![
                FieldMapping::new("name", "name"),
                FieldMapping::new("score", "score").with_source("scores"),
                FieldMapping::new("region", "region").with_source("meta"),
            ],
        );
        cfg.source_selection.sources.push(SourceDescriptor::new("scores", "Scores", SourceType::Array));
        cfg.source_selection
            .sources
            .push(SourceDescriptor::new("meta", "Meta", SourceType::Object).with_primary_path("info"));
        cfg.source_selection.merge_mode = MergeMode::Merge;

        let mut docs = BTreeMap::new();
        docs.insert("src".to_string(), json!([{"name": "a"}, {"name": "b"}]));
        docs.insert("scores".to_string(), json!([{"score": 1}, {"score": 2}]));
        docs.insert("meta".to_string(), json!({"info": {"region": "eu"}}));

        let out = apply_mapping_sources(&docs, &cfg, &ApplyOptions::default()).unwrap();
        assert_eq!(
            out,
            json!([
                {"name": "a", "score": 1, "region": "eu"},
                {"name": "b", "score": 2, "region": "eu"}
            ])
        );

        cfg.source_selection.merge_mode = MergeMode::Single;
        let single = apply_mapping_sources(&docs, &cfg, &ApplyOptions::default()).unwrap();
        assert_eq!(single, json!([{"name": "a"}, {"name": "b"}]));
    }

    #[test]
    fn missing_primary_document_is_an_error() {
        let cfg = config(SourceType::Object, vec![]);
        let err = apply_mapping_sources(&BTreeMap::new(), &cfg, &ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, MappingError::SourceNotFound(ref id) if id == "src"));
    }

    #[test]
    fn failing_transformation_keeps_other_mappings() {
        let bad = MappingTransformation::new("Parse", TransformKind::ParseJson).with_id("t1");
        let mut cfg = config(
            SourceType::Object,
            vec![
                FieldMapping::new("raw", "parsed").with_transform("t1"),
                FieldMapping::new("ok", "ok"),
            ],
        );
        cfg.transformations.push(bad);
        let out = apply_mapping(&json!({"raw": "{broken", "ok": true}), &cfg);
        assert_eq!(out, json!({"parsed": "{broken", "ok": true}));
    }
}
