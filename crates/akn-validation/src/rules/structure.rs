//! Containment: which children an element may hold and how many

use super::{
    child_path, children_path, children_range, choice_path, declares_children, structure_path,
};
use akn_profile::{ChildEntry, Diagnostic, ElementNode, Fix, ProfileDocument};
use akn_schema::SchemaModel;

pub const INVALID_CHILD: &str = "structure.invalid-child";
pub const MISSING_REQUIRED_CHILD: &str = "structure.missing-required-child";
pub const CARDINALITY_EXCEEDS_MAX: &str = "structure.cardinality-exceeds-max";
pub const INVALID_STRUCTURE_ROOT: &str = "structure.invalid-structure-root";
pub const INVALID_STRUCTURE_CHAIN: &str = "structure.invalid-structure-chain";

pub fn check(document: &ProfileDocument, schema: &SchemaModel) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for element in &document.elements {
        if !schema.has_element(&element.name) {
            continue;
        }
        check_children(element, schema, &mut out);
        check_required(element, schema, &mut out);
        check_maximum(element, schema, &mut out);
        check_structure(element, schema, &mut out);
    }
    out
}

fn check_children(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    let parent = element.name.as_str();
    for entry in &element.children {
        if !schema.has_element(&entry.name) || schema.is_valid_child(parent, &entry.name) {
            continue;
        }
        out.push(
            Diagnostic::error(
                INVALID_CHILD,
                format!("<{parent}> cannot contain <{}>.", entry.name),
                child_path(parent, &entry.name),
                entry.range,
            )
            .with_fix(Fix::RemoveEntry {
                name: entry.name.clone(),
            }),
        );
    }
}

fn check_required(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    if !declares_children(element) {
        return;
    }
    let Some(element_type) = schema.element(&element.name) else {
        return;
    };
    for required in element_type.required_children() {
        if element.references(&required.name) {
            continue;
        }
        out.push(
            Diagnostic::error(
                MISSING_REQUIRED_CHILD,
                format!(
                    "<{}> is required inside <{}> but is not listed in 'children'.",
                    required.name, element.name
                ),
                children_path(&element.name),
                children_range(element),
            )
            .with_fix(Fix::AddChild {
                parent: element.name.clone(),
                child: required.name.clone(),
            }),
        );
    }
}

fn check_maximum(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    let parent = element.name.as_str();
    let plain = element.children.iter().map(|e| (e, child_path(parent, &e.name)));
    let exclusive = element.choice.iter().map(|e| (e, choice_path(parent, &e.name)));

    for (entry, path) in plain.chain(exclusive) {
        if let Some(diagnostic) = exceeds_max(parent, entry, path, schema) {
            out.push(diagnostic);
        }
    }
}

fn exceeds_max(
    parent: &str,
    entry: &ChildEntry,
    path: String,
    schema: &SchemaModel,
) -> Option<Diagnostic> {
    let cardinality = entry.cardinality?;
    let child = schema.child(parent, &entry.name)?;
    let schema_max = child.occurs.max?;
    if cardinality.max.is_some_and(|max| max <= schema_max) {
        return None;
    }
    Some(Diagnostic::error(
        CARDINALITY_EXCEEDS_MAX,
        format!(
            "Cardinality {cardinality} of <{}> inside <{parent}> exceeds the schema maximum of {schema_max}.",
            entry.name
        ),
        path,
        entry.range,
    ))
}

fn check_structure(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    let name = element.name.as_str();
    let Some(first) = element.structure.first() else {
        return;
    };

    if schema.has_element(&first.name) && !schema.is_valid_child(name, &first.name) {
        out.push(Diagnostic::error(
            INVALID_STRUCTURE_ROOT,
            format!(
                "<{}> is not a valid child of <{name}>, so it cannot be the first level of the structure.",
                first.name
            ),
            structure_path(name, 0),
            first.range,
        ));
    }

    for (index, pair) in element.structure.windows(2).enumerate() {
        let (outer, inner) = (&pair[0], &pair[1]);
        if !schema.has_element(&outer.name) || !schema.has_element(&inner.name) {
            continue;
        }
        if !schema.is_valid_child(&outer.name, &inner.name) {
            out.push(Diagnostic::error(
                INVALID_STRUCTURE_CHAIN,
                format!(
                    "<{}> cannot contain <{}>, so the structure chain '{} > {}' is invalid.",
                    outer.name, inner.name, outer.name, inner.name
                ),
                structure_path(name, index + 1),
                inner.range,
            ));
        }
    }
}
