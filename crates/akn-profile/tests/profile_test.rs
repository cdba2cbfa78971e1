//! Integration tests for akn-profile
//!
//! These tests exercise parsing, canonical rendering and deltas together.

use akn_profile::{Cardinality, Delta, ElementNode, Severity, parse, parse_document, render};

const HAND_WRITTEN: &str = "\
# Profile for enacted acts
profile:
  name: Acts
  documentTypes: [act]
  elements:
    act:
      children: {meta: 1..1, body: 1..1}
      attributes:
        name: {required: true}
    body:
      choice:
        chapter: 1..*
    chapter:
      profileNote: keep me
      structure: [chapter, section]
";

#[test]
fn test_flow_style_input_renders_canonically() {
    let doc = parse_document(HAND_WRITTEN).unwrap();
    let canonical = render(&doc);

    assert!(canonical.contains("    act:\n      attributes:\n        name:\n          required: true\n      children:\n"));
    assert!(canonical.contains("      children:\n        choice:\n          chapter: \"1..*\"\n"));
    assert!(canonical.contains("      structure:\n        - chapter\n        - section\n"));

    // canonical text is a fixed point of parse + render
    let again = render(&parse_document(&canonical).unwrap());
    assert_eq!(again, canonical);
}

#[test]
fn test_positions_point_at_keys() {
    let doc = parse_document(HAND_WRITTEN).unwrap();
    let chapter = doc.element("chapter").unwrap();
    assert_eq!(chapter.range.start.line, 13);
    assert_eq!(chapter.range.start.column, 5);
    assert_eq!(doc.metadata.document_types[0].range.start.line, 4);
}

#[test]
fn test_delta_between_renders_is_minimal() {
    let mut doc = parse_document(HAND_WRITTEN).unwrap();
    let before = render(&doc);
    doc.insert_element(ElementNode::new("section").with_child("num", Some(Cardinality::new(0, Some(1)))));
    let after = render(&doc);

    let delta = Delta::compute(&before, &after);
    assert_eq!(delta.edits.len(), 1);
    assert_eq!(delta.edits[0].start_line, before.lines().count());
    assert_eq!(delta.apply(&before), after);
}

#[test]
fn test_invalid_cardinality_keeps_the_rest() {
    let outcome = parse("profile:\n  elements:\n    act:\n      children:\n        meta: 2..1\n        body: 1..1\n");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
    assert_eq!(outcome.diagnostics[0].range.start.line, 5);
    let doc = outcome.document.unwrap();
    assert_eq!(
        doc.element("act").unwrap().child("body").unwrap().cardinality,
        Some(Cardinality::EXACTLY_ONE)
    );
}
