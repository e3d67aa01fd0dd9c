//! End-to-end integration tests that exercise the public API the way the
//! editor and CLI drive it: extract → propose → edit → validate → apply.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use json_fieldmap_core::transform::{CalcOperation, CalculateConfig, LookupConfig};
use json_fieldmap_core::{
    apply_mapping, apply_mapping_sources, apply_mapping_with, apply_transformation,
    extract_source_fields, propose_for_config, validate_config, ApplyOptions, EditHistory,
    ExtractOptions, FieldMapping, FieldType, IssueKind, MappingConfig, MappingError,
    MappingTransformation, MergeMode, OutputField, OutputWrapperConfig, SourceDescriptor,
    SourceType, TransformKind, ValidationIssue,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// ── Helpers ─────────────────────────────────────────────────────────────────

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/fixtures");

fn load_fixture(name: &str) -> Value {
    let path = Path::new(FIXTURES_DIR).join(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {name}: {e}"));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse fixture {name}: {e}"))
}

fn load_config(name: &str) -> MappingConfig {
    serde_json::from_value(load_fixture(name))
        .unwrap_or_else(|e| panic!("Failed to decode config {name}: {e}"))
}

fn object_config() -> MappingConfig {
    MappingConfig::default()
        .with_source(SourceDescriptor::new("s", "Source", SourceType::Object))
        .with_primary_path("")
}

fn array_config() -> MappingConfig {
    let mut config = MappingConfig::default()
        .with_source(SourceDescriptor::new("s", "Source", SourceType::Array))
        .with_primary_path("");
    config.source_selection.source_type = SourceType::Array;
    config
}

fn pinned() -> ApplyOptions {
    ApplyOptions {
        template_defaults: true,
        timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
    }
}

// ── Basic scenarios ─────────────────────────────────────────────────────────

#[test]
fn nested_source_to_nested_target() {
    let config = object_config()
        .with_output_field(OutputField::new("profile.fullName", FieldType::String))
        .with_mapping(FieldMapping::new("user.name", "profile.fullName"));

    let out = apply_mapping(&json!({"user": {"name": "Ada"}}), &config);
    assert_eq!(out, json!({"profile": {"fullName": "Ada"}}));
}

#[test]
fn text_transformations() {
    let upper = MappingTransformation::new("Upper", TransformKind::Uppercase);
    let cap = MappingTransformation::new("Cap", TransformKind::Capitalize);
    assert_eq!(apply_transformation(&json!("hello"), &upper), json!("HELLO"));
    assert_eq!(apply_transformation(&json!("hello world"), &cap), json!("Hello World"));
}

#[test]
fn divide_by_zero_yields_zero_but_fails_validation() {
    let kind = TransformKind::Calculate(CalculateConfig {
        operation: CalcOperation::Divide,
        value: 0.0,
    });
    let t = MappingTransformation::new("Div", kind.clone());
    assert_eq!(apply_transformation(&json!(10), &t), json!(0));

    let check = kind.validate();
    assert!(!check.valid);
    assert_eq!(check.errors, vec!["Cannot divide by zero".to_string()]);
}

#[test]
fn array_root_maps_each_item() {
    let config = array_config()
        .with_output_field(OutputField::new("itemId", FieldType::Number))
        .with_mapping(FieldMapping::new("id", "itemId"));

    let out = apply_mapping(&json!([{"id": 1}, {"id": 2}]), &config);
    assert_eq!(out, json!([{"itemId": 1}, {"itemId": 2}]));

    let mut unwrap = config.clone();
    unwrap.source_selection.unwrap_single_items = true;
    assert_eq!(apply_mapping(&json!([{"id": 1}]), &unwrap), json!({"itemId": 1}));
    // Two items stay an array even with unwrapping on.
    assert_eq!(
        apply_mapping(&json!([{"id": 1}, {"id": 2}]), &unwrap),
        json!([{"itemId": 1}, {"itemId": 2}])
    );
}

#[test]
fn lookup_default_for_unknown_key() {
    let t = MappingTransformation::new(
        "Label",
        TransformKind::Lookup(LookupConfig {
            lookup_table: json!({"A": "Alpha"}),
            default_value: Some(json!("Unknown")),
        }),
    );
    assert_eq!(apply_transformation(&json!("B"), &t), json!("Unknown"));
    assert_eq!(apply_transformation(&json!("A"), &t), json!("Alpha"));
}

// ── Fixture-driven ──────────────────────────────────────────────────────────

#[test]
fn users_fixture_applies_with_wrapper() {
    let config = load_config("users_config.json");
    let doc = load_fixture("users.json");

    let out = apply_mapping_with(&doc, &config, &pinned());
    assert_eq!(out["timestamp"], json!("2024-03-01T12:00:00.000Z"));
    assert_eq!(out["count"], json!(2));
    assert_eq!(out["version"], json!("1.0"));
    assert_eq!(out["source"], json!({"id": "users", "name": "Users"}));
    assert_eq!(
        out["records"][1],
        json!({
            "userId": 2,
            "fullName": "Alan Turing",
            "contact": {"email": "none"},
            "status": "Unknown",
            "source": "crm"
        })
    );
}

#[test]
fn users_fixture_validates_cleanly() {
    let report = validate_config(&load_config("users_config.json"));
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn broken_fixture_reports_every_error() {
    let report = validate_config(&load_config("broken_config.json"));
    assert!(!report.valid);
    let kinds = |issues: &[ValidationIssue]| issues.iter().map(|i| i.kind).collect::<Vec<_>>();
    assert_eq!(
        kinds(&report.errors),
        vec![
            IssueKind::MissingPrimaryPath,
            IssueKind::NoSources,
            IssueKind::UnmappedRequiredField,
        ]
    );
    assert!(report.has_kind(IssueKind::InvalidPath));
    assert!(report.has_kind(IssueKind::InvalidTransformation));
}

#[test]
fn config_survives_json_round_trip() {
    let config = load_config("users_config.json");
    let text = serde_json::to_string(&config).unwrap();
    let back = MappingConfig::from_json(&text).unwrap();
    assert_eq!(back, config);
}

// ── Editor flow ─────────────────────────────────────────────────────────────

#[test]
fn extract_propose_validate_apply() {
    let doc = load_fixture("users.json");
    let config = load_config("partial_config.json");

    let source = config.source_selection.primary().unwrap().clone();
    let fields = extract_source_fields(&doc, &source, &ExtractOptions::default());
    let paths: Vec<String> = fields.into_iter().map(|f| f.path).collect();

    let proposals = propose_for_config(&config, &paths, 0.7);
    assert_eq!(proposals.len(), 2);

    let mut history = EditHistory::new(config);
    for proposal in proposals {
        history
            .apply(|c| Ok::<_, MappingError>(c.with_mapping(proposal)))
            .unwrap();
    }
    let report = validate_config(history.current());
    assert!(report.valid, "{:?}", report.errors);

    let out = apply_mapping(&doc, history.current());
    assert_eq!(out[0], json!({"id": 1, "name": "ada lovelace", "email": "ADA@EXAMPLE.COM"}));

    // Undo drops the email proposal; the template default fills in instead.
    history.undo().unwrap();
    let out = apply_mapping(&doc, history.current());
    assert_eq!(out[0]["email"], json!("n/a"));
    assert!(history.can_redo());
}

#[test]
fn edits_keep_mapping_ids_stable() {
    let config = object_config().with_mapping(FieldMapping::new("a", "x").with_id("m1"));
    let config = config
        .update_mapping("m1", |m| {
            m.source_path = "b".to_string();
            m.id = "hijacked".to_string();
        })
        .unwrap();
    assert_eq!(config.field_mappings[0].id, "m1");
    assert_eq!(config.field_mappings[0].source_path, "b");

    // Same (source, target) slot replaces in place and inherits the id.
    let config = config.with_mapping(FieldMapping::new("c", "x"));
    assert_eq!(config.field_mappings.len(), 1);
    assert_eq!(config.field_mappings[0].id, "m1");
    assert_eq!(config.field_mappings[0].source_path, "c");
}

#[test]
fn removing_transformation_detaches_mappings() {
    let t = MappingTransformation::new("Upper", TransformKind::Uppercase).with_id("t1");
    let config = object_config()
        .with_transformation(t)
        .with_mapping(FieldMapping::new("name", "name").with_id("m1").with_transform("t1"));
    assert_eq!(apply_mapping(&json!({"name": "ada"}), &config), json!({"name": "ADA"}));

    let config = config.without_transformation("t1").unwrap();
    assert_eq!(config.field_mappings[0].transform_id, None);
    assert_eq!(apply_mapping(&json!({"name": "ada"}), &config), json!({"name": "ada"}));
    assert!(matches!(
        config.without_transformation("t1"),
        Err(MappingError::TransformationNotFound(_))
    ));
}

#[test]
fn pinning_an_array_index() {
    let config = object_config().with_mapping(
        FieldMapping::new("orders[*].total", "totals")
            .with_id("m1")
            .with_derived_index_config()
            .unwrap(),
    );
    let doc = json!({"orders": [{"total": 5}, {"total": 7}]});
    assert_eq!(apply_mapping(&doc, &config), json!({"totals": [5, 7]}));

    let pinned = config.with_mapping_index("m1", "orders", 1).unwrap();
    assert_eq!(pinned.field_mappings[0].source_path, "orders[1].total");
    assert_eq!(apply_mapping(&doc, &pinned), json!({"totals": 7}));
}

// ── Multiple sources ────────────────────────────────────────────────────────

#[test]
fn merge_mode_reads_secondary_sources_by_position() {
    let mut config = array_config()
        .with_source(SourceDescriptor::new("prices", "Prices", SourceType::Array).with_primary_path("rows"))
        .with_mapping(FieldMapping::new("sku", "sku"))
        .with_mapping(FieldMapping::new("amount", "price").with_source("prices"));
    config.source_selection.merge_mode = MergeMode::Merge;

    let mut docs = BTreeMap::new();
    docs.insert("s".to_string(), json!([{"sku": "A"}, {"sku": "B"}]));
    docs.insert("prices".to_string(), json!({"rows": [{"amount": 3}, {"amount": 4}]}));

    let out = apply_mapping_sources(&docs, &config, &ApplyOptions::default()).unwrap();
    assert_eq!(out, json!([{"sku": "A", "price": 3}, {"sku": "B", "price": 4}]));

    // Single mode ignores mappings bound to other sources.
    config.source_selection.merge_mode = MergeMode::Single;
    let out = apply_mapping_sources(&docs, &config, &ApplyOptions::default()).unwrap();
    assert_eq!(out, json!([{"sku": "A"}, {"sku": "B"}]));
}

#[test]
fn missing_primary_document_is_an_error() {
    let config = array_config();
    let err = apply_mapping_sources(&BTreeMap::new(), &config, &ApplyOptions::default()).unwrap_err();
    assert!(matches!(err, MappingError::SourceNotFound(ref id) if id == "s"));
}

#[test]
fn wrapper_without_metadata_only_nests_payload() {
    let config = object_config()
        .with_mapping(FieldMapping::new("a", "b"))
        .with_output_wrapper(Some(OutputWrapperConfig::enabled("payload")));
    assert_eq!(apply_mapping(&json!({"a": 1}), &config), json!({"payload": {"b": 1}}));
}
