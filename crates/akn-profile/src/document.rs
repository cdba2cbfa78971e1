//! Profile document tree
#![allow(clippy::must_use_candidate)] // Builder/constructor API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use crate::cardinality::Cardinality;
use crate::position::SourceRange;
use serde::{Deserialize, Serialize};

/// A positioned name in a list (document type, structure entry, value)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntry {
    pub name: String,
    #[serde(default)]
    pub range: SourceRange,
}

impl NamedEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: SourceRange::default(),
        }
    }
}

/// A child reference with its optional cardinality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    pub name: String,
    pub cardinality: Option<Cardinality>,
    #[serde(default)]
    pub range: SourceRange,
}

impl ChildEntry {
    pub fn new(name: impl Into<String>, cardinality: Option<Cardinality>) -> Self {
        Self {
            name: name.into(),
            cardinality,
            range: SourceRange::default(),
        }
    }
}

/// Restriction of one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNode {
    pub name: String,
    pub required: bool,
    /// Permitted values; empty means unrestricted
    pub values: Vec<NamedEntry>,
    #[serde(default)]
    pub range: SourceRange,
}

impl AttributeNode {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            values: Vec::new(),
            range: SourceRange::default(),
        }
    }

    /// Restrict the attribute to a set of values
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(NamedEntry::new).collect();
        self
    }
}

/// Restriction of one element type.
///
/// Empty blocks are equivalent to absent blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementNode {
    pub name: String,

    /// Position of the element key
    #[serde(default)]
    pub range: SourceRange,

    /// Free-text author note (`profileNote`)
    pub annotation: Option<String>,

    pub attributes: Vec<AttributeNode>,

    /// Plain child references
    pub children: Vec<ChildEntry>,

    /// Mutually exclusive child references
    pub choice: Vec<ChildEntry>,

    /// Expected nesting order of hierarchical containers
    pub structure: Vec<NamedEntry>,

    #[serde(default)]
    pub children_range: Option<SourceRange>,

    #[serde(default)]
    pub choice_range: Option<SourceRange>,
}

impl ElementNode {
    /// Create a bare element with no restriction blocks
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_annotation(mut self, note: impl Into<String>) -> Self {
        self.annotation = Some(note.into());
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeNode) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, cardinality: Option<Cardinality>) -> Self {
        self.children.push(ChildEntry::new(name, cardinality));
        self
    }

    pub fn with_choice(mut self, name: impl Into<String>, cardinality: Option<Cardinality>) -> Self {
        self.choice.push(ChildEntry::new(name, cardinality));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeNode> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&ChildEntry> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn choice_entry(&self, name: &str) -> Option<&ChildEntry> {
        self.choice.iter().find(|c| c.name == name)
    }

    /// Whether the element references `name` as a plain or choice child
    pub fn references(&self, name: &str) -> bool {
        self.child(name).is_some() || self.choice_entry(name).is_some()
    }

    /// Plain children followed by choice members
    pub fn referenced_children(&self) -> impl Iterator<Item = &ChildEntry> {
        self.children.iter().chain(self.choice.iter())
    }

    /// Whether the node carries anything besides its name
    pub fn is_bare(&self) -> bool {
        self.annotation.is_none()
            && self.attributes.is_empty()
            && self.children.is_empty()
            && self.choice.is_empty()
            && self.structure.is_empty()
    }
}

/// Profile-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Root types the profile applies to (`documentTypes`)
    pub document_types: Vec<NamedEntry>,
}

/// A parsed or generated application profile
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub metadata: ProfileMetadata,

    /// Element restrictions in document order
    pub elements: Vec<ElementNode>,

    /// Position of the `profile` key
    #[serde(default)]
    pub profile_range: SourceRange,

    /// Position of the `elements` key
    #[serde(default)]
    pub elements_range: SourceRange,
}

impl ProfileDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, name: &str) -> Option<&ElementNode> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn element_mut(&mut self, name: &str) -> Option<&mut ElementNode> {
        self.elements.iter_mut().find(|e| e.name == name)
    }

    pub fn has_element(&self, name: &str) -> bool {
        self.element(name).is_some()
    }

    /// Add an element at the end unless one with the same name exists.
    /// Returns whether it was inserted.
    pub fn insert_element(&mut self, element: ElementNode) -> bool {
        if self.has_element(&element.name) {
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Remove an element by name
    pub fn remove_element(&mut self, name: &str) -> Option<ElementNode> {
        let index = self.elements.iter().position(|e| e.name == name)?;
        Some(self.elements.remove(index))
    }

    /// Names of the declared elements in document order
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.name.as_str())
    }

    /// Names of the declared document types
    pub fn document_types(&self) -> impl Iterator<Item = &str> {
        self.metadata.document_types.iter().map(|d| d.name.as_str())
    }

    /// Elements that reference `name` as a child
    pub fn parents_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ElementNode> + 'a {
        self.elements.iter().filter(move |e| e.references(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProfileDocument {
        let mut doc = ProfileDocument::new();
        doc.insert_element(
            ElementNode::new("act")
                .with_attribute(AttributeNode::new("contains", false).with_values(["singleVersion"]))
                .with_child("meta", Some(Cardinality::EXACTLY_ONE))
                .with_child("body", Some(Cardinality::EXACTLY_ONE)),
        );
        doc.insert_element(ElementNode::new("meta"));
        doc.insert_element(
            ElementNode::new("body")
                .with_choice("chapter", None)
                .with_choice("content", None),
        );
        doc
    }

    #[test]
    fn test_lookup_and_references() {
        let doc = sample();
        let act = doc.element("act").unwrap();
        assert_eq!(act.attribute("contains").unwrap().values[0].name, "singleVersion");
        assert!(act.references("body"));
        assert!(doc.element("body").unwrap().references("content"));
        assert_eq!(
            doc.parents_of("chapter").map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["body"]
        );
    }

    #[test]
    fn test_insert_is_unique_and_remove() {
        let mut doc = sample();
        assert!(!doc.insert_element(ElementNode::new("meta")));
        assert_eq!(doc.elements.len(), 3);
        assert!(doc.remove_element("meta").is_some());
        assert!(doc.remove_element("meta").is_none());
        assert_eq!(doc.element_names().collect::<Vec<_>>(), vec!["act", "body"]);
    }

    #[test]
    fn test_bare_element() {
        let doc = sample();
        assert!(doc.element("meta").unwrap().is_bare());
        assert!(!doc.element("body").unwrap().is_bare());
        assert!(!ElementNode::new("p").with_annotation("kept").is_bare());
    }
}
