//! A profile may only tighten the schema, never loosen it

use super::{attribute_path, attributes_path, child_path, choice_path};
use akn_profile::{Diagnostic, ElementNode, Fix, ProfileDocument};
use akn_schema::SchemaModel;
use std::collections::{BTreeSet, HashSet};

pub const UNDECLARED_CHILD_ELEMENT: &str = "strictness.undeclared-child-element";
pub const MISSING_REQUIRED_ATTRIBUTE: &str = "strictness.missing-required-attribute";
pub const LOOSENED_ATTRIBUTE_REQUIRED: &str = "strictness.loosened-attribute-required";
pub const LOOSENED_CHILD_CARDINALITY: &str = "strictness.loosened-child-cardinality";
pub const MISSING_REQUIRED_ELEMENT: &str = "strictness.missing-required-element";

pub fn check(document: &ProfileDocument, schema: &SchemaModel) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for element in &document.elements {
        if !schema.has_element(&element.name) {
            continue;
        }
        check_undeclared_children(document, element, schema, &mut out);
        check_attributes(element, schema, &mut out);
        check_child_minimum(element, schema, &mut out);
    }
    check_required_chain(document, schema, &mut out);
    out
}

fn check_undeclared_children(
    document: &ProfileDocument,
    element: &ElementNode,
    schema: &SchemaModel,
    out: &mut Vec<Diagnostic>,
) {
    let parent = element.name.as_str();
    let plain = element.children.iter().map(|e| (e, child_path(parent, &e.name)));
    let exclusive = element.choice.iter().map(|e| (e, choice_path(parent, &e.name)));

    for (entry, path) in plain.chain(exclusive) {
        if !schema.has_element(&entry.name) || document.has_element(&entry.name) {
            continue;
        }
        out.push(
            Diagnostic::error(
                UNDECLARED_CHILD_ELEMENT,
                format!(
                    "'{}' is listed as a child of <{parent}> but has no element definition in the profile.",
                    entry.name
                ),
                path,
                entry.range,
            )
            .with_fix(Fix::ExpandElement {
                element: entry.name.clone(),
            }),
        );
    }
}

fn check_attributes(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    if element.attributes.is_empty() {
        return;
    }
    let name = element.name.as_str();

    // identity attributes are reported by the identity module
    let required = schema
        .attributes(name)
        .iter()
        .filter(|a| a.required && !schema.is_identity_attribute(&a.name));
    for declared in required {
        match element.attribute(&declared.name) {
            None => out.push(Diagnostic::error(
                MISSING_REQUIRED_ATTRIBUTE,
                format!(
                    "'{}' is required on <{name}> but is not listed under 'attributes'.",
                    declared.name
                ),
                attributes_path(name),
                element.range,
            )),
            Some(attribute) if !attribute.required => out.push(Diagnostic::error(
                LOOSENED_ATTRIBUTE_REQUIRED,
                format!(
                    "'{}' is required on <{name}> but the profile does not mark it as required.",
                    declared.name
                ),
                attribute_path(name, &declared.name),
                attribute.range,
            )),
            Some(_) => {}
        }
    }
}

fn check_child_minimum(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    let parent = element.name.as_str();
    for entry in &element.children {
        let (Some(cardinality), Some(child)) = (entry.cardinality, schema.child(parent, &entry.name))
        else {
            continue;
        };
        if cardinality.min >= child.occurs.min {
            continue;
        }
        out.push(Diagnostic::error(
            LOOSENED_CHILD_CARDINALITY,
            format!(
                "Cardinality {cardinality} of <{}> inside <{parent}> is below the schema minimum of {}.",
                entry.name, child.occurs.min
            ),
            child_path(parent, &entry.name),
            entry.range,
        ));
    }
}

fn check_required_chain(document: &ProfileDocument, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    for document_type in document.document_types() {
        if !schema.has_element(document_type) {
            continue;
        }
        let mut visited = HashSet::new();
        let mut missing = BTreeSet::new();
        walk_required(document, schema, document_type, &mut visited, &mut missing);

        for name in missing {
            out.push(
                Diagnostic::error(
                    MISSING_REQUIRED_ELEMENT,
                    format!(
                        "<{name}> is on the required chain of document type '{document_type}' but is not declared under 'elements'."
                    ),
                    "profile.elements",
                    document.elements_range,
                )
                .with_fix(Fix::ExpandElement {
                    element: name.to_string(),
                }),
            );
        }
    }
}

fn walk_required<'s>(
    document: &ProfileDocument,
    schema: &'s SchemaModel,
    name: &'s str,
    visited: &mut HashSet<&'s str>,
    missing: &mut BTreeSet<&'s str>,
) {
    if !visited.insert(name) {
        return;
    }
    if !document.has_element(name) {
        missing.insert(name);
    }
    let Some(element_type) = schema.element(name) else {
        return;
    };
    for child in element_type.required_children() {
        walk_required(document, schema, &child.name, visited, missing);
    }
}
