//! Cascade collapse
//!
//! Removing an element also removes the descendants that only it kept
//! alive. A descendant survives when a remaining element still references
//! it, when it carries a `profileNote`, or when the schema requires it
//! under a remaining element.

use crate::{CascadeError, Result};
use akn_profile::ProfileDocument;
use akn_schema::SchemaModel;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Remove `element_type` and its orphaned descendants from a copy of
/// `document`. An element type that is not defined leaves the document
/// unchanged.
///
/// # Errors
///
/// Returns [`CascadeError::UnknownType`] when the schema does not declare
/// `element_type`.
pub fn collapse_element(
    schema: &SchemaModel,
    document: &ProfileDocument,
    element_type: &str,
) -> Result<ProfileDocument> {
    if !schema.has_element(element_type) {
        return Err(CascadeError::UnknownType(element_type.to_string()));
    }
    if !document.has_element(element_type) {
        return Ok(document.clone());
    }

    let descendants = descendants(document, element_type);

    // anchors: everything outside the collapsed subtree plus annotated nodes
    let mut kept: HashSet<&str> = document
        .elements
        .iter()
        .filter(|e| e.name != element_type)
        .filter(|e| !descendants.contains(e.name.as_str()) || e.annotation.is_some())
        .map(|e| e.name.as_str())
        .collect();

    let mut pending: Vec<&str> = kept.iter().copied().collect();
    while let Some(name) = pending.pop() {
        let Some(node) = document.element(name) else {
            continue;
        };
        let referenced = node.referenced_children().map(|c| c.name.as_str());
        let required = schema
            .element(name)
            .into_iter()
            .flat_map(|t| t.required_children())
            .map(|c| c.name.as_str());
        for child in referenced.chain(required) {
            if child == element_type || !document.has_element(child) {
                continue;
            }
            if let Some(child) = document.element(child) {
                if kept.insert(child.name.as_str()) {
                    pending.push(child.name.as_str());
                }
            }
        }
    }

    let removed: BTreeSet<&str> = document
        .element_names()
        .filter(|name| !kept.contains(name))
        .collect();
    debug!(
        "Collapsing <{}> removes {} element(s): {:?}",
        element_type,
        removed.len(),
        removed
    );

    let mut collapsed = document.clone();
    collapsed
        .elements
        .retain(|e| !removed.contains(e.name.as_str()));
    for element in &mut collapsed.elements {
        let plain = element.children.len();
        element
            .children
            .retain(|c| !removed.contains(c.name.as_str()));
        if element.children.len() != plain && element.children.is_empty() {
            element.children_range = None;
        }
        let choice = element.choice.len();
        element.choice.retain(|c| !removed.contains(c.name.as_str()));
        if element.choice.len() != choice && element.choice.is_empty() {
            element.choice_range = None;
        }
    }
    Ok(collapsed)
}

/// Transitive children of `name` in the document, excluding `name` itself
fn descendants<'d>(document: &'d ProfileDocument, name: &str) -> HashSet<&'d str> {
    let mut found = HashSet::new();
    let mut pending = vec![name];
    while let Some(current) = pending.pop() {
        let Some(node) = document.element(current) else {
            continue;
        };
        for child in node.referenced_children() {
            let Some(child) = document.element(&child.name) else {
                continue;
            };
            if child.name != name && found.insert(child.name.as_str()) {
                pending.push(child.name.as_str());
            }
        }
    }
    found
}
