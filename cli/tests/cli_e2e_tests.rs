//! CLI end-to-end tests that exercise the CLI binary against shared fixtures.
//! These complement `cli_tests.rs`, which builds its inputs inline.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/fixtures");

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("json-fieldmap").expect("binary should exist")
}

fn fixture(name: &str) -> String {
    format!("{FIXTURES_DIR}/{name}")
}

fn read_output(path: &std::path::Path) -> serde_json::Value {
    let content = fs::read_to_string(path).expect("output file should exist");
    serde_json::from_str(&content).expect("output should be valid JSON")
}

// ── E2E: Apply array source with wrapper ────────────────────────────────────

#[test]
fn test_cli_e2e_apply_users() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("mapped.json");

    cmd()
        .args(["apply", &fixture("users_config.json"), &fixture("users.json")])
        .args(["--timestamp", "2024-03-01T12:00:00Z"])
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success();

    let data = read_output(&output);
    assert_eq!(
        data,
        serde_json::json!({
            "timestamp": "2024-03-01T12:00:00.000Z",
            "source": { "id": "users", "name": "Users" },
            "count": 2,
            "version": "1.0",
            "records": [
                {
                    "userId": 1,
                    "fullName": "Ada Lovelace",
                    "contact": { "email": "ada@example.com" },
                    "status": "Active",
                    "source": "crm"
                },
                {
                    "userId": 2,
                    "fullName": "Alan Turing",
                    "contact": { "email": "none" },
                    "status": "Unknown",
                    "source": "crm"
                }
            ]
        })
    );
}

#[test]
fn test_cli_e2e_apply_without_template_defaults() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("mapped.json");

    cmd()
        .args(["apply", &fixture("users_config.json"), &fixture("users.json")])
        .arg("--no-template-defaults")
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success();

    let data = read_output(&output);
    let first = &data["records"][0];
    assert!(first.get("source").is_none());
    assert_eq!(first["status"], serde_json::json!("Active"));
}

// ── E2E: Validate ───────────────────────────────────────────────────────────

#[test]
fn test_cli_e2e_validate_clean_config() {
    cmd()
        .args(["validate", &fixture("users_config.json"), "--format", "compact"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""valid":true"#));
}

#[test]
fn test_cli_e2e_validate_broken_config() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("report.json");

    cmd()
        .args(["validate", &fixture("broken_config.json")])
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .code(1);

    let report = read_output(&output);
    assert_eq!(report["valid"], serde_json::json!(false));
    let kinds = |section: &str| -> Vec<String> {
        report[section]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["kind"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(
        kinds("errors"),
        ["missing_primary_path", "no_sources", "unmapped_required_field"]
    );
    let warnings = kinds("warnings");
    for expected in ["invalid_path", "invalid_transformation"] {
        assert!(warnings.iter().any(|k| k == expected), "missing {expected} in {warnings:?}");
    }
}

// ── E2E: Extract ────────────────────────────────────────────────────────────

#[test]
fn test_cli_e2e_extract_primary_path() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("fields.json");

    cmd()
        .args(["extract", &fixture("users.json"), "--primary-path", "data.users"])
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success();

    let fields = read_output(&output);
    let paths: Vec<&str> = fields
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["id", "name", "email", "status", "tags"]);
    assert_eq!(fields[2]["type"], serde_json::json!("string"));
}

#[test]
fn test_cli_e2e_extract_fixed_indices_with_values() {
    cmd()
        .args(["extract", &fixture("users.json"), "--fixed-indices", "--values"])
        .args(["--format", "compact"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""path":"data.users[*].id""#))
        .stdout(predicate::str::contains(r#""path":"data.users[1].name""#))
        .stdout(predicate::str::contains(r#""value":"alan turing""#));
}

// ── E2E: Automap ────────────────────────────────────────────────────────────

#[test]
fn test_cli_e2e_automap_proposals() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("proposals.json");

    cmd()
        .args(["automap", &fixture("partial_config.json"), &fixture("users.json")])
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success();

    let proposals = read_output(&output);
    let pairs: Vec<(&str, &str)> = proposals
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["sourcePath"].as_str().unwrap(), m["targetPath"].as_str().unwrap()))
        .collect();
    assert_eq!(pairs, vec![("name", "name"), ("email", "email")]);
    assert_eq!(proposals[1]["fallbackValue"], serde_json::json!("n/a"));
}

#[test]
fn test_cli_e2e_automap_write_then_apply() {
    let dir = TempDir::new().unwrap();
    let updated = dir.path().join("config.json");
    let mapped = dir.path().join("mapped.json");

    cmd()
        .args(["automap", &fixture("partial_config.json"), &fixture("users.json"), "--write"])
        .args(["-o", updated.to_str().unwrap()])
        .assert()
        .success();

    cmd()
        .args(["apply", updated.to_str().unwrap(), &fixture("users.json")])
        .args(["-o", mapped.to_str().unwrap()])
        .assert()
        .success();

    let data = read_output(&mapped);
    assert_eq!(
        data[1],
        serde_json::json!({ "id": 2, "name": "alan turing", "email": "n/a" })
    );
}

#[test]
fn test_cli_e2e_automap_rejects_bad_threshold() {
    cmd()
        .args(["automap", &fixture("partial_config.json"), &fixture("users.json")])
        .args(["--threshold", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Threshold must be between"));
}

// ── E2E: Error path, malformed input via CLI ───────────────────────────────

#[test]
fn test_cli_e2e_malformed_config() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("malformed.json");
    fs::write(&input, "this is not valid JSON at all {{{").unwrap();

    cmd()
        .args(["apply", input.to_str().unwrap(), &fixture("users.json")])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}
