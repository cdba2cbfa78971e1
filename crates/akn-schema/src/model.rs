//! Schema model types
//!
//! The model is built once by [`crate::SchemaLoader`] and never mutated
//! afterwards. Element types reference each other by name, so recursive
//! content models are plain name references flagged as back-references.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Occurrence bounds of a particle, `max == None` meaning unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Occurs {
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences (`None` = unbounded)
    pub max: Option<u32>,
}

impl Occurs {
    /// Exactly once (the XSD default)
    pub const ONCE: Self = Self {
        min: 1,
        max: Some(1),
    };

    /// Create new bounds
    #[must_use]
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Whether at least one occurrence is mandatory
    #[must_use]
    pub const fn is_required(self) -> bool {
        self.min >= 1
    }

    /// Whether at most one occurrence is allowed
    #[must_use]
    pub fn is_single(self) -> bool {
        self.max == Some(1)
    }

    /// Bounds of a particle nested inside a particle with `self` bounds
    #[must_use]
    pub fn times(self, inner: Self) -> Self {
        Self {
            min: self.min.saturating_mul(inner.min),
            max: match (self.max, inner.max) {
                (Some(a), Some(b)) => Some(a.saturating_mul(b)),
                _ => None,
            },
        }
    }

    /// Bounds of two sibling particles naming the same element
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        Self {
            min: self.min.saturating_add(other.min),
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                _ => None,
            },
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::ONCE
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

/// A child element reference inside an element's content model
#[derive(Debug, Clone, Serialize)]
pub struct ChildRef {
    /// Referenced element name
    pub name: String,
    /// Effective occurrence inside the parent
    pub occurs: Occurs,
    /// Position in the parent's declared sequence
    pub index: usize,
    /// The child re-enters a type already on the resolution path
    pub back_reference: bool,
}

/// Compiled `xs:pattern` facet
#[derive(Debug, Clone)]
pub struct PatternFacet {
    source: String,
    compiled: Option<Regex>,
}

impl PatternFacet {
    /// Compile an XSD pattern; XSD patterns match the whole value.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&format!("^(?:{source})$")).ok();
        if compiled.is_none() {
            tracing::debug!("Pattern {:?} is not supported by the regex engine", source);
        }
        Self { source, compiled }
    }

    /// The pattern as written in the schema
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `None` when the pattern could not be compiled
    #[must_use]
    pub fn is_match(&self, value: &str) -> Option<bool> {
        self.compiled.as_ref().map(|re| re.is_match(value))
    }
}

impl Serialize for PatternFacet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Datatype of an attribute
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Closed set of literal values
    Enumeration { values: Vec<String> },
    /// Values must fully match a regular expression
    Pattern { pattern: PatternFacet },
    /// Any text (builtin or unconstrained type)
    FreeText { base: String },
}

impl AttributeKind {
    /// Enumeration values, if this is an enumerated type
    #[must_use]
    pub fn enumeration(&self) -> Option<&[String]> {
        match self {
            Self::Enumeration { values } => Some(values),
            _ => None,
        }
    }
}

/// An attribute permitted on an element
#[derive(Debug, Clone, Serialize)]
pub struct AttributeType {
    pub name: String,
    pub kind: AttributeKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// One alternative of a choice group
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceBranch {
    /// `branch_N`, unique within the group
    pub id: String,
    /// Human-readable origin of the branch (element or group names)
    pub label: Option<String>,
    /// Member element names in first-encountered order
    pub members: Vec<String>,
}

/// A normalized `xs:choice`
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceGroup {
    /// `owner:choice_N`
    pub id: String,
    /// Complex type or named group that declares the choice
    pub owner: String,
    /// Occurrence of the choice particle itself
    pub occurs: Occurs,
    pub branches: Vec<ChoiceBranch>,
}

impl ChoiceGroup {
    /// All members across branches, in branch order
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.branches
            .iter()
            .flat_map(|b| b.members.iter().map(String::as_str))
    }

    /// Branch that contains `element`
    #[must_use]
    pub fn branch_of(&self, element: &str) -> Option<&ChoiceBranch> {
        self.branches
            .iter()
            .find(|b| b.members.iter().any(|m| m == element))
    }

    /// Whether `element` is a member of any branch
    #[must_use]
    pub fn contains(&self, element: &str) -> bool {
        self.branch_of(element).is_some()
    }
}

/// A choice group as used by one element, with the effective occurrence at
/// that position. The group itself is shared between all users.
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceUse {
    pub group: Arc<ChoiceGroup>,
    pub occurs: Occurs,
}

impl ChoiceUse {
    /// At least one member must be present
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.occurs.is_required()
    }

    /// Members of different branches may not be combined
    #[must_use]
    pub fn is_exclusive(&self) -> bool {
        self.occurs.is_single() && self.group.branches.len() > 1
    }
}

/// An element declared by the schema
#[derive(Debug, Clone, Serialize)]
pub struct ElementType {
    pub name: String,
    /// Named complex or simple type, `None` for anonymous types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub children: Vec<ChildRef>,
    pub attributes: Vec<AttributeType>,
    pub choices: Vec<ChoiceUse>,
    pub mixed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl ElementType {
    /// Look up a permitted child
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ChildRef> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Look up a permitted attribute
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeType> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Children whose minimum occurrence is at least one
    pub fn required_children(&self) -> impl Iterator<Item = &ChildRef> {
        self.children.iter().filter(|c| c.occurs.is_required())
    }

    /// Attributes declared with `use="required"`
    pub fn required_attributes(&self) -> impl Iterator<Item = &AttributeType> {
        self.attributes.iter().filter(|a| a.required)
    }

    /// Position of a child in the declared sequence
    #[must_use]
    pub fn child_index(&self, name: &str) -> Option<usize> {
        self.child(name).map(|c| c.index)
    }

    /// Position of an attribute in the declared order
    #[must_use]
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Choice groups that must be satisfied by at least one member
    pub fn mandatory_choices(&self) -> impl Iterator<Item = &ChoiceUse> {
        self.choices.iter().filter(|c| c.is_mandatory())
    }

    /// Ids of the choice groups a child belongs to
    #[must_use]
    pub fn choice_groups_of(&self, child: &str) -> Vec<&str> {
        self.choices
            .iter()
            .filter(|c| c.group.contains(child))
            .map(|c| c.group.id.as_str())
            .collect()
    }
}

/// Options that qualify how a schema is interpreted
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Element whose children are the document types
    pub document_root: Option<String>,
    /// Attributes treated as identity attributes
    pub identity_attributes: Vec<String>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            document_root: Some("akomaNtoso".to_string()),
            identity_attributes: vec!["eId".to_string(), "wId".to_string(), "GUID".to_string()],
        }
    }
}

/// Immutable, queryable schema model
#[derive(Debug, Clone, Serialize)]
pub struct SchemaModel {
    version: String,
    elements: BTreeMap<String, ElementType>,
    document_root: Option<String>,
    identity_attributes: Vec<String>,
}

impl SchemaModel {
    pub(crate) fn new(
        version: impl Into<String>,
        elements: BTreeMap<String, ElementType>,
        options: &SchemaOptions,
    ) -> Self {
        let document_root = options
            .document_root
            .clone()
            .filter(|root| elements.contains_key(root));
        Self {
            version: version.into(),
            elements,
            document_root,
            identity_attributes: options.identity_attributes.clone(),
        }
    }

    /// Version label the model was loaded under
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn has_element(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    #[must_use]
    pub fn element(&self, name: &str) -> Option<&ElementType> {
        self.elements.get(name)
    }

    /// All element names in alphabetical order
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn elements(&self) -> impl Iterator<Item = &ElementType> {
        self.elements.values()
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Permitted children of an element, empty for unknown elements
    #[must_use]
    pub fn children(&self, element: &str) -> &[ChildRef] {
        self.element(element).map_or(&[], |e| e.children.as_slice())
    }

    /// Look up a child of `parent`
    #[must_use]
    pub fn child(&self, parent: &str, child: &str) -> Option<&ChildRef> {
        self.element(parent).and_then(|e| e.child(child))
    }

    /// Whether `child` may appear inside `parent`
    #[must_use]
    pub fn is_valid_child(&self, parent: &str, child: &str) -> bool {
        self.child(parent, child).is_some()
    }

    /// Permitted attributes of an element, empty for unknown elements
    #[must_use]
    pub fn attributes(&self, element: &str) -> &[AttributeType] {
        self.element(element)
            .map_or(&[], |e| e.attributes.as_slice())
    }

    #[must_use]
    pub fn attribute(&self, element: &str, attribute: &str) -> Option<&AttributeType> {
        self.element(element).and_then(|e| e.attribute(attribute))
    }

    /// Choice groups used by an element
    #[must_use]
    pub fn choice_groups(&self, element: &str) -> &[ChoiceUse] {
        self.element(element).map_or(&[], |e| e.choices.as_slice())
    }

    /// Number of distinct choice groups across the model
    #[must_use]
    pub fn choice_group_count(&self) -> usize {
        let mut ids: Vec<&str> = self
            .elements
            .values()
            .flat_map(|e| e.choices.iter().map(|c| c.group.id.as_str()))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// The document root element, when the schema declares one
    #[must_use]
    pub fn document_root(&self) -> Option<&str> {
        self.document_root.as_deref()
    }

    /// Elements that may appear directly under the document root
    #[must_use]
    pub fn document_types(&self) -> Vec<&str> {
        self.document_root
            .as_deref()
            .map(|root| self.children(root).iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Configured identity attribute names
    #[must_use]
    pub fn identity_attributes(&self) -> &[String] {
        &self.identity_attributes
    }

    #[must_use]
    pub fn is_identity_attribute(&self, name: &str) -> bool {
        self.identity_attributes.iter().any(|a| a == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_display() {
        assert_eq!(Occurs::ONCE.to_string(), "1..1");
        assert_eq!(Occurs::new(0, None).to_string(), "0..*");
    }

    #[test]
    fn test_occurs_arithmetic() {
        let optional = Occurs::new(0, Some(1));
        let many = Occurs::new(1, None);
        assert_eq!(optional.times(many), Occurs::new(0, None));
        assert_eq!(Occurs::ONCE.plus(Occurs::ONCE), Occurs::new(2, Some(2)));
        assert_eq!(Occurs::ONCE.plus(many).max, None);
    }

    #[test]
    fn test_pattern_matches_whole_value() {
        let facet = PatternFacet::new(r"[^\s]+");
        assert_eq!(facet.is_match("art_1"), Some(true));
        assert_eq!(facet.is_match("art 1"), Some(false));
        assert_eq!(facet.source(), r"[^\s]+");
    }

    #[test]
    fn test_choice_group_lookup() {
        let group = ChoiceGroup {
            id: "t:choice_0".to_string(),
            owner: "t".to_string(),
            occurs: Occurs::ONCE,
            branches: vec![
                ChoiceBranch {
                    id: "branch_0".to_string(),
                    label: Some("a".to_string()),
                    members: vec!["a".to_string()],
                },
                ChoiceBranch {
                    id: "branch_1".to_string(),
                    label: Some("g".to_string()),
                    members: vec!["b".to_string(), "c".to_string()],
                },
            ],
        };
        assert_eq!(group.branch_of("c").map(|b| b.id.as_str()), Some("branch_1"));
        assert!(!group.contains("d"));
        assert_eq!(group.members().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let usage = ChoiceUse {
            group: Arc::new(group),
            occurs: Occurs::ONCE,
        };
        assert!(usage.is_mandatory());
        assert!(usage.is_exclusive());
    }
}
