//! Cascade expansion
//!
//! Expanding an element type inserts its node and everything the schema
//! requires beneath it: required attributes, required children and one
//! member of every mandatory choice group. The walk descends into every
//! referenced child, so expanding a type also completes descendants that an
//! earlier edit left unsatisfied.

use crate::options::{CyclePolicy, ExpansionOptions};
use crate::ordering::reorder;
use crate::{CascadeError, Result};
use akn_profile::{AttributeNode, Cardinality, ChildEntry, ElementNode, ProfileDocument};
use akn_schema::{AttributeType, ElementType, Occurs, SchemaModel};
use std::collections::HashSet;
use tracing::debug;

/// Insert `element_type` and its required descendants into a copy of
/// `document`.
///
/// # Errors
///
/// Returns [`CascadeError::UnknownType`] when the schema does not declare
/// `element_type`, and [`CascadeError::DepthExceeded`] when an element that
/// still needs work sits deeper than `options.max_depth`.
pub fn expand_element(
    schema: &SchemaModel,
    document: &ProfileDocument,
    element_type: &str,
    options: &ExpansionOptions,
) -> Result<ProfileDocument> {
    if !schema.has_element(element_type) {
        return Err(CascadeError::UnknownType(element_type.to_string()));
    }

    let mut expander = Expander {
        schema,
        options,
        document: document.clone(),
        done: HashSet::new(),
        path: Vec::new(),
    };
    expander.visit(element_type)?;

    let mut expanded = expander.document;
    ensure_document_root(schema, &mut expanded);
    debug!(
        "Expanded <{}>: {} -> {} elements",
        element_type,
        document.elements.len(),
        expanded.elements.len()
    );
    Ok(reorder(schema, &expanded))
}

struct Expander<'a> {
    schema: &'a SchemaModel,
    options: &'a ExpansionOptions,
    document: ProfileDocument,
    /// Types completed during this expansion
    done: HashSet<String>,
    /// Types on the current descent
    path: Vec<String>,
}

impl<'a> Expander<'a> {
    fn visit(&mut self, name: &str) -> Result<()> {
        let schema = self.schema;
        let Some(element_type) = schema.element(name) else {
            return Ok(());
        };
        if self.path.iter().any(|p| p == name) {
            return Ok(());
        }
        match self.options.cycle_policy {
            CyclePolicy::OncePerExpansion if self.done.contains(name) => return Ok(()),
            CyclePolicy::MaxDepth(limit) if self.path.len() >= limit => return Ok(()),
            _ => {}
        }
        if self.path.len() >= self.options.max_depth {
            if self.needs_work(element_type) {
                return Err(CascadeError::DepthExceeded {
                    element: name.to_string(),
                    max_depth: self.options.max_depth,
                });
            }
            return Ok(());
        }

        self.done.insert(name.to_string());
        self.path.push(name.to_string());
        self.complete(element_type);

        let children: Vec<String> = self
            .document
            .element(name)
            .map(|node| {
                node.referenced_children()
                    .filter(|c| schema.has_element(&c.name))
                    .map(|c| c.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        for child in children {
            self.visit(&child)?;
        }

        self.path.pop();
        Ok(())
    }

    /// Whether completing `element_type` would change the document
    fn needs_work(&self, element_type: &ElementType) -> bool {
        let Some(node) = self.document.element(&element_type.name) else {
            return true;
        };
        let missing_attribute = !node.attributes.is_empty()
            && element_type
                .required_attributes()
                .any(|a| node.attribute(&a.name).is_none());
        missing_attribute
            || element_type
                .required_children()
                .any(|c| !node.references(&c.name))
            || element_type
                .mandatory_choices()
                .any(|u| !u.group.members().any(|m| node.references(m)))
    }

    fn complete(&mut self, element_type: &'a ElementType) {
        let name = element_type.name.as_str();
        if !self.document.has_element(name) {
            debug!("Inserting <{name}>");
            let node = self.new_node(element_type);
            self.document.insert_element(node);
        }
        let Some(node) = self.document.element_mut(name) else {
            return;
        };

        if !node.attributes.is_empty() {
            for attribute in element_type.required_attributes() {
                if node.attribute(&attribute.name).is_none() {
                    node.attributes.push(attribute_node(attribute, true));
                }
            }
        }

        for child in element_type.required_children() {
            if !node.references(&child.name) {
                node.children
                    .push(ChildEntry::new(&child.name, Some(cardinality(child.occurs))));
            }
        }

        // only one choice block per node
        let mut choice_taken = !node.choice.is_empty();
        for usage in element_type.mandatory_choices() {
            if usage.group.members().any(|m| node.references(m)) {
                continue;
            }
            if usage.is_exclusive() && !choice_taken {
                for branch in usage.group.branches.iter().take(2) {
                    if let Some(first) = branch.members.first() {
                        node.choice.push(at_least_one(element_type, first));
                    }
                }
                choice_taken = true;
            } else if let Some(first) = usage.group.members().next() {
                node.children.push(at_least_one(element_type, first));
            }
        }
    }

    fn new_node(&self, element_type: &ElementType) -> ElementNode {
        let mut node = ElementNode::new(&element_type.name);
        for attribute in &element_type.attributes {
            let identity = self.options.identity_attributes.contains(&attribute.name)
                && self.schema.is_identity_attribute(&attribute.name);
            if attribute.required {
                node.attributes.push(attribute_node(attribute, true));
            } else if identity {
                node.attributes
                    .push(attribute_node(attribute, self.options.identity_required));
            } else if self.options.include_optional_attributes {
                node.attributes.push(attribute_node(attribute, false));
            }
        }
        node
    }
}

pub(crate) fn cardinality(occurs: Occurs) -> Cardinality {
    Cardinality::new(occurs.min, occurs.max)
}

/// Cardinality of a choice member made mandatory
fn at_least_one(element_type: &ElementType, member: &str) -> ChildEntry {
    let max = element_type.child(member).and_then(|c| c.occurs.max);
    ChildEntry::new(member, Some(Cardinality::new(1, max)))
}

/// Profile attribute mirroring a schema attribute, enumeration values copied
pub(crate) fn attribute_node(attribute: &AttributeType, required: bool) -> AttributeNode {
    let node = AttributeNode::new(&attribute.name, required);
    match attribute.kind.enumeration() {
        Some(values) => node.with_values(values.iter().map(String::as_str)),
        None => node,
    }
}

/// Make the document root reference every defined document type.
///
/// A single type becomes a `1..1` child; several types go into the root's
/// `choice` block since they are exclusive.
fn ensure_document_root(schema: &SchemaModel, document: &mut ProfileDocument) {
    let Some(root) = schema.document_root() else {
        return;
    };
    let types: Vec<&str> = schema
        .document_types()
        .into_iter()
        .filter(|t| document.has_element(t))
        .collect();
    if types.is_empty() {
        return;
    }

    if !document.has_element(root) {
        let mut node = ElementNode::new(root);
        if let Some(root_type) = schema.element(root) {
            node.attributes = root_type
                .required_attributes()
                .map(|a| attribute_node(a, true))
                .collect();
        }
        document.insert_element(node);
    }
    let Some(node) = document.element_mut(root) else {
        return;
    };

    if let [single] = types.as_slice() {
        if !node.references(single) {
            node.children
                .push(ChildEntry::new(*single, Some(Cardinality::EXACTLY_ONE)));
        }
        return;
    }
    for name in types {
        node.children.retain(|c| c.name != name);
        if node.choice_entry(name).is_none() {
            node.choice
                .push(ChildEntry::new(name, Some(Cardinality::EXACTLY_ONE)));
        }
    }
}
