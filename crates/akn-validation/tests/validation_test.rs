//! Integration tests for akn-validation
//!
//! These tests validate whole profiles against the AKN-shaped fixture schema.

use akn_profile::Severity;
use akn_schema::{SchemaLoader, SchemaModel};
use akn_validation::{ReportFormat, ValidationEngine, ValidationReporter, validate};
use std::path::PathBuf;

fn schema() -> SchemaModel {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("akn-schema")
        .join("tests")
        .join("data")
        .join("mini_akn.xsd");
    SchemaLoader::new()
        .load_from_file(&path)
        .expect("fixture schema should load")
}

const COMPLETE_ACT: &str = r#"profile:
  name: Acts
  version: "1.0"
  documentTypes:
    - act
  elements:
    akomaNtoso:
      children:
        act: "1..1"
    act:
      attributes:
        name:
          required: true
        contains:
          required: false
          values:
            - singleVersion
      children:
        meta: "1..1"
        body: "1..1"
    meta:
      children:
        identification: "1..1"
    identification:
      attributes:
        source:
          required: true
      children:
        FRBRWork: "1..1"
        FRBRExpression: "1..1"
    FRBRWork:
      children:
        FRBRthis: "1..1"
        FRBRuri: "1..1"
        FRBRdate: "1..1"
        FRBRcountry: "1..1"
    FRBRExpression:
      children:
        FRBRthis: "1..1"
        FRBRuri: "1..1"
        FRBRdate: "1..1"
        FRBRlanguage: "1..*"
    FRBRthis:
    FRBRuri:
    FRBRdate:
    FRBRcountry:
    FRBRlanguage:
    body:
      children:
        choice:
          chapter:
          content:
    chapter:
      attributes:
        eId:
          required: true
      children:
        choice:
          content:
          chapter:
    content:
      children:
        p:
    p:
"#;

#[test]
fn test_complete_profile_has_no_errors() {
    let result = validate(COMPLETE_ACT, &schema());
    assert!(result.is_valid(), "{:#?}", result.diagnostics);
}

#[test]
fn test_empty_document_single_diagnostic() {
    let result = validate("", &schema());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, "parse.not-a-mapping");
    assert_eq!(result.diagnostics[0].message, "document must be a mapping.");
}

#[test]
fn test_mandatory_choice_with_nothing_declared() {
    let text = "profile:\n  elements:\n    body:\n";
    let result = validate(text, &schema());
    let empty: Vec<_> = result.with_code("choice.required-group-empty").collect();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].path, "profile.elements.body.children");
    assert_eq!(empty[0].range.start.line, 3);
}

#[test]
fn test_broken_profile_reports_every_family_in_position_order() {
    let text = "\
profile:
  documentTypes: [act]
  elements:
    act:
      attributes:
        contains:
          values: [draft]
      children:
        meta: 0..1
        chapter: 1..1
    body:
      children:
        content: 1..1
        section: 1..1
";
    let result = validate(text, &schema());
    let families: Vec<&str> = result.diagnostics.iter().map(|d| d.family()).collect();
    for family in ["structure", "datatype", "strictness", "choice"] {
        assert!(families.contains(&family), "missing {family} in {families:?}");
    }

    let starts: Vec<_> = result.diagnostics.iter().map(|d| d.range.start).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
    assert!(result.count(Severity::Error) > 0);
}

#[test]
fn test_repeated_runs_are_identical() {
    let engine = ValidationEngine::new();
    let model = schema();
    let text = COMPLETE_ACT.replace("chapter:\n      attributes", "chaptr:\n      attributes");
    let first = engine.validate(&text, &model);
    let second = engine.validate(&text, &model);
    assert_eq!(first, second);
    assert!(first.has_errors());

    let report = ValidationReporter::new(ReportFormat::Text)
        .report("act.yaml", &first)
        .unwrap();
    assert!(report.contains("[vocabulary.unknown-element] 'chaptr' is not a known element."));
}
