//! Command-line tool tests
//!
//! Covers resource input parsing, batch application and output formats.

use octofhir_sof::cli::input::parse_resources;
use octofhir_sof::cli::output::{OutputFormat, format_records};
use octofhir_sof::cli::run::{RunConfig, apply_view, run};
use octofhir_sof::cli::validate::validate_file;
use octofhir_sof::ViewApplicator;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Map, Value, json};
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn name_view() -> Value {
    json!({
        "resourceType": "ViewDefinition",
        "name": "patient_names",
        "resource": "Patient",
        "select": [
            {"column": [{"name": "id", "path": "getResourceKey()"}]},
            {"forEachOrNull": "name", "column": [{"name": "family", "path": "family"}]}
        ]
    })
}

fn resources() -> Vec<Value> {
    vec![
        json!({"resourceType": "Patient", "id": "p1", "name": [{"family": "Smith"}, {"family": "Doe"}]}),
        json!({"resourceType": "Observation", "id": "o1"}),
        json!({"resourceType": "Patient", "id": "p2"}),
    ]
}

fn record(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ============================================================================
// Input
// ============================================================================

#[test]
fn test_parse_ndjson() {
    let content = r#"{"resourceType": "Patient", "id": "p1"}

{"resourceType": "Patient", "id": "p2"}
"#;
    let parsed = parse_resources(content).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[1]["id"], json!("p2"));
}

#[test]
fn test_parse_bundle() {
    let bundle = json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            {"resource": {"resourceType": "Patient", "id": "p1"}},
            {"fullUrl": "urn:uuid:1"},
            {"resource": {"resourceType": "Observation", "id": "o1"}}
        ]
    });
    let parsed = parse_resources(&bundle.to_string()).unwrap();
    assert_eq!(
        parsed,
        vec![
            json!({"resourceType": "Patient", "id": "p1"}),
            json!({"resourceType": "Observation", "id": "o1"})
        ]
    );
}

#[rstest]
#[case::single(r#"{"resourceType": "Patient", "id": "p1"}"#, 1)]
#[case::array(r#"[{"resourceType": "Patient"}, {"resourceType": "Patient"}]"#, 2)]
#[case::blank("  \n ", 0)]
fn test_parse_documents(#[case] content: &str, #[case] expected: usize) {
    assert_eq!(parse_resources(content).unwrap().len(), expected);
}

#[test]
fn test_parse_reports_bad_ndjson_line() {
    let content = "{\"resourceType\": \"Patient\"}\n{not json}\n";
    let err = parse_resources(content).unwrap_err();
    assert!(err.to_string().contains("line 2"), "got: {}", err);
}

// ============================================================================
// Batch Application
// ============================================================================

#[test]
fn test_apply_view_filters_other_resource_types() {
    let applicator = ViewApplicator::from_json(&name_view().to_string()).unwrap();
    let summary = apply_view(&applicator, &resources(), false).unwrap();

    assert_eq!(summary.applied, 2);
    assert_eq!(summary.filtered, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        summary.records,
        vec![
            record(&[("id", json!("p1")), ("family", json!("Smith"))]),
            record(&[("id", json!("p1")), ("family", json!("Doe"))]),
            record(&[("id", json!("p2")), ("family", Value::Null)]),
        ]
    );
}

#[test]
fn test_apply_view_errors_stop_or_skip() {
    let applicator = ViewApplicator::from_json(
        &json!({
            "resource": "Patient",
            "select": [{"column": [{"name": "id", "path": "id"}]}],
            "where": [{"path": "active"}]
        })
        .to_string(),
    )
    .unwrap();
    let resources = vec![
        json!({"resourceType": "Patient", "id": "p1", "active": true}),
        json!({"resourceType": "Patient", "id": "p2"}),
    ];

    assert!(apply_view(&applicator, &resources, false).is_err());

    let summary = apply_view(&applicator, &resources, true).unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.records, vec![record(&[("id", json!("p1"))])]);
}

// ============================================================================
// Output
// ============================================================================

#[rstest]
#[case("csv", OutputFormat::Csv)]
#[case("NDJSON", OutputFormat::Ndjson)]
#[case("jsonl", OutputFormat::Ndjson)]
#[case("json", OutputFormat::Json)]
#[case("table", OutputFormat::Table)]
fn test_output_format_names(#[case] name: &str, #[case] expected: OutputFormat) {
    assert_eq!(name.parse::<OutputFormat>().unwrap(), expected);
}

#[test]
fn test_unknown_output_format() {
    assert!("parquet".parse::<OutputFormat>().is_err());
}

#[test]
fn test_csv_output() {
    let records = vec![
        record(&[("id", json!("p1")), ("given", json!(["Ann", "Lee"])), ("rank", json!(1))]),
        record(&[("id", json!("p,2")), ("given", Value::Null), ("rank", json!(2))]),
    ];
    let csv = format_records(&["id", "given", "rank"], &records, OutputFormat::Csv).unwrap();
    assert_eq!(
        csv,
        "id,given,rank\np1,\"[\"\"Ann\"\",\"\"Lee\"\"]\",1\n\"p,2\",,2\n"
    );
}

#[test]
fn test_csv_header_without_rows() {
    let csv = format_records(&["id", "family"], &[], OutputFormat::Csv).unwrap();
    assert_eq!(csv, "id,family\n");
}

#[test]
fn test_ndjson_output() {
    let records = vec![record(&[("id", json!("p1"))]), record(&[("id", json!("p2"))])];
    let out = format_records(&["id"], &records, OutputFormat::Ndjson).unwrap();
    assert_eq!(out, "{\"id\":\"p1\"}\n{\"id\":\"p2\"}\n");
}

#[test]
fn test_table_output_lists_columns_and_values() {
    let records = vec![record(&[("id", json!("p1")), ("family", json!("Smith"))])];
    let table = format_records(&["id", "family"], &records, OutputFormat::Table).unwrap();
    assert!(table.contains("family"));
    assert!(table.contains("Smith"));
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_run_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let view_path = dir.path().join("view.json");
    let input_path = dir.path().join("patients.ndjson");
    let output_path = dir.path().join("rows.csv");

    fs::write(&view_path, name_view().to_string()).unwrap();
    let ndjson: Vec<String> = resources().iter().map(Value::to_string).collect();
    fs::write(&input_path, ndjson.join("\n")).unwrap();

    run(RunConfig {
        view: view_path,
        input: Some(input_path),
        skip_errors: false,
        output_format: Some("csv".to_string()),
        output_file: Some(output_path.clone()),
    })
    .unwrap();

    let written = fs::read_to_string(output_path).unwrap();
    assert_eq!(written, "id,family\np1,Smith\np1,Doe\np2,\n");
}

#[test]
fn test_run_rejects_invalid_view() {
    let dir = TempDir::new().unwrap();
    let view_path = dir.path().join("view.json");
    fs::write(&view_path, r#"{"resource": "Patient", "select": []}"#).unwrap();

    let err = run(RunConfig {
        view: view_path,
        input: None,
        skip_errors: false,
        output_format: None,
        output_file: None,
    })
    .unwrap_err();
    assert!(err.to_string().contains("Invalid view definition"));
}

#[test]
fn test_validate_file() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    fs::write(&good, name_view().to_string()).unwrap();
    fs::write(
        &bad,
        json!({
            "resource": "Patient",
            "select": [{"forEach": "name", "forEachOrNull": "name", "column": [{"name": "f", "path": "family"}]}]
        })
        .to_string(),
    )
    .unwrap();

    let view = validate_file(&good).unwrap();
    assert_eq!(view.name.as_deref(), Some("patient_names"));
    assert!(validate_file(&bad).is_err());
    assert!(validate_file(&dir.path().join("missing.json")).is_err());
}
