//! Canonical ordering
//!
//! Elements are ordered parents before children with the document root
//! first. Child references follow the schema sequence with required
//! children first; attributes put schema-required ones first, then schema
//! order. Ordering is a fixed point: reordering a reordered document changes
//! nothing.

use akn_profile::{AttributeNode, ChildEntry, ElementNode, ProfileDocument};
use akn_schema::{ElementType, SchemaModel};
use std::collections::{BTreeMap, BTreeSet};

/// Sort key of names the schema does not know; they keep their relative order
const UNKNOWN: (u8, usize) = (2, usize::MAX);

/// Return a copy of `document` in canonical order
#[must_use]
pub fn reorder(schema: &SchemaModel, document: &ProfileDocument) -> ProfileDocument {
    let mut ordered = document.clone();
    for element in &mut ordered.elements {
        let element_type = schema.element(&element.name);
        sort_entries(&mut element.children, element_type);
        sort_entries(&mut element.choice, element_type);
        sort_attributes(&mut element.attributes, element_type);
    }
    ordered.elements = topological(schema.document_root(), ordered.elements);
    ordered
}

fn sort_entries(entries: &mut [ChildEntry], element_type: Option<&ElementType>) {
    entries.sort_by_key(|entry| {
        element_type
            .and_then(|t| t.child(&entry.name))
            .map_or(UNKNOWN, |child| (u8::from(!child.occurs.is_required()), child.index))
    });
}

fn sort_attributes(attributes: &mut [AttributeNode], element_type: Option<&ElementType>) {
    attributes.sort_by_key(|attribute| {
        element_type
            .and_then(|t| t.attribute(&attribute.name).zip(t.attribute_index(&attribute.name)))
            .map_or(UNKNOWN, |(declared, index)| (u8::from(!declared.required), index))
    });
}

/// Kahn's algorithm over "references" edges with an alphabetical ready
/// queue. Self-references are ignored; elements caught in a cycle are
/// appended alphabetically.
fn topological(root: Option<&str>, elements: Vec<ElementNode>) -> Vec<ElementNode> {
    let mut nodes: BTreeMap<String, ElementNode> = BTreeMap::new();
    for element in elements {
        nodes.entry(element.name.clone()).or_insert(element);
    }

    let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = nodes.keys().map(|k| (k.as_str(), 0)).collect();
    for (name, node) in &nodes {
        for child in node.referenced_children() {
            let Some((child_name, _)) = nodes.get_key_value(&child.name) else {
                continue;
            };
            if child_name == name {
                continue;
            }
            if edges
                .entry(name.as_str())
                .or_default()
                .insert(child_name.as_str())
            {
                *in_degree.entry(child_name.as_str()).or_default() += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(nodes.len());
    loop {
        let next = match root.filter(|r| ready.contains(r)) {
            Some(r) => r,
            None => match ready.first() {
                Some(first) => *first,
                None => break,
            },
        };
        ready.remove(next);
        order.push(next.to_string());
        for child in edges.get(next).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*child);
                }
            }
        }
    }

    let placed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
    let leftover: Vec<String> = nodes
        .keys()
        .filter(|k| !placed.contains(k.as_str()))
        .cloned()
        .collect();
    order.extend(leftover);

    order
        .iter()
        .filter_map(|name| nodes.remove(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{document, names, schema};

    #[test]
    fn test_parents_before_children_root_first() {
        let doc = document(
            "profile:\n  elements:\n    meta:\n    body:\n    act:\n      children:\n        body: 1..1\n        meta: 1..1\n    akomaNtoso:\n      children:\n        act: 1..1\n",
        );
        let doc = reorder(schema(), &doc);
        assert_eq!(names(&doc), vec!["akomaNtoso", "act", "body", "meta"]);
        let act = doc.element("act").unwrap();
        let children: Vec<&str> = act.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["meta", "body"]);
    }

    #[test]
    fn test_required_children_first_unknown_last() {
        let doc = document(
            "profile:\n  elements:\n    act:\n      children:\n        zzz: 1..1\n        preface: 0..1\n        aaa: 1..1\n        body: 1..1\n        meta: 1..1\n",
        );
        let doc = reorder(schema(), &doc);
        let act = doc.element("act").unwrap();
        let children: Vec<&str> = act.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["meta", "body", "preface", "zzz", "aaa"]);
    }

    #[test]
    fn test_attributes_required_first() {
        let doc = document(
            "profile:\n  elements:\n    act:\n      attributes:\n        wId:\n          required: false\n        contains:\n          required: true\n        eId:\n          required: false\n        name:\n          required: true\n",
        );
        let doc = reorder(schema(), &doc);
        let attributes: Vec<&str> = doc.element("act").unwrap().attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attributes, vec!["name", "contains", "eId", "wId"]);
    }

    #[test]
    fn test_cycles_appended_alphabetically() {
        let doc = document(
            "profile:\n  elements:\n    section:\n      children:\n        choice:\n          content:\n          chapter:\n    chapter:\n      children:\n        choice:\n          content:\n          section:\n    body:\n      children:\n        choice:\n          content:\n          chapter:\n    content:\n",
        );
        let doc = reorder(schema(), &doc);
        // body is the only entry point; chapter and section wait on each other
        assert_eq!(names(&doc), vec!["body", "chapter", "content", "section"]);
    }

    #[test]
    fn test_reorder_is_a_fixed_point() {
        let doc = document(
            "profile:\n  elements:\n    chapter:\n      children:\n        choice:\n          chapter:\n          content:\n    body:\n      children:\n        choice:\n          chapter:\n          content:\n    content:\n",
        );
        let once = reorder(schema(), &doc);
        assert_eq!(reorder(schema(), &once), once);
        assert_eq!(names(&once), vec!["body", "chapter", "content"]);
    }
}
