//! Criterion benchmarks for the json-fieldmap-core pipeline.
//!
//! Fixtures are pre-parsed outside the benchmark loop to measure only the
//! extraction/mapping logic, not JSON parsing or file I/O.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use json_fieldmap_core::transform::expr;
use json_fieldmap_core::{
    apply_mapping_with, extract_fields, propose, validate_config, ApplyOptions, ExtractOptions,
    FieldType, MappingConfig, OutputField,
};

/// Load and parse a fixture from the shared test fixtures directory.
fn load_fixture(name: &str) -> Value {
    let fixtures_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/fixtures");
    let path = Path::new(fixtures_dir).join(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

fn load_config(name: &str) -> MappingConfig {
    serde_json::from_value(load_fixture(name))
        .unwrap_or_else(|e| panic!("Failed to decode config {}: {}", name, e))
}

/// The users fixture with its array repeated to `n` elements.
fn users(n: usize) -> Value {
    let doc = load_fixture("users.json");
    let template = doc["data"]["users"].as_array().cloned().unwrap_or_default();
    let items: Vec<Value> = template.iter().cycle().take(n).cloned().collect();
    json!({"data": {"users": items}})
}

fn bench_apply_small(c: &mut Criterion) {
    let config = load_config("users_config.json");
    let doc = load_fixture("users.json");
    let options = ApplyOptions::default();

    c.bench_function("apply/users_2", |b| {
        b.iter(|| apply_mapping_with(black_box(&doc), black_box(&config), black_box(&options)))
    });
}

fn bench_apply_large(c: &mut Criterion) {
    let config = load_config("users_config.json");
    let doc = users(1_000);
    let options = ApplyOptions::default();

    c.bench_function("apply/users_1000", |b| {
        b.iter(|| apply_mapping_with(black_box(&doc), black_box(&config), black_box(&options)))
    });
}

fn bench_extract(c: &mut Criterion) {
    let doc = users(50);
    let options = ExtractOptions {
        include_fixed_indices: true,
        ..Default::default()
    };

    c.bench_function("extract/users_50_fixed_indices", |b| {
        b.iter(|| extract_fields(black_box(&doc), "", black_box(&options)))
    });
}

fn bench_validate(c: &mut Criterion) {
    let config = load_config("users_config.json");

    c.bench_function("validate/users_config", |b| {
        b.iter(|| validate_config(black_box(&config)))
    });
}

fn bench_propose(c: &mut Criterion) {
    let sources: Vec<String> = (0..100).map(|i| format!("record.field_{i}.value")).collect();
    let targets: Vec<OutputField> = (0..50)
        .map(|i| OutputField::new(format!("recordField{i}Value"), FieldType::Any))
        .collect();

    c.bench_function("automap/100x50", |b| {
        b.iter(|| propose(black_box(&sources), black_box(&targets), 0.7))
    });
}

fn bench_custom_expression(c: &mut Criterion) {
    let parsed = expr::parse("value.price * (1 + value.tax) > 100 ? 'premium' : 'standard'").unwrap();
    let input = json!({"price": 90, "tax": 0.2});

    c.bench_function("expr/evaluate_parsed", |b| {
        b.iter(|| parsed.evaluate(black_box(&input)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_apply_small,
    bench_apply_large,
    bench_extract,
    bench_validate,
    bench_propose,
    bench_custom_expression,
);
criterion_main!(benches);
