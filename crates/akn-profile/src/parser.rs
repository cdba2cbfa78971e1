//! YAML adapter producing a [`ProfileDocument`]
//!
//! Syntax and top-level shape are classified with `serde_yaml`; positions
//! come from the `marked-yaml` tree. Problems below the `profile` key are
//! reported as diagnostics and the offending entry is skipped, so rules can
//! still run on the rest of the document.

use crate::cardinality::Cardinality;
use crate::diagnostic::Diagnostic;
use crate::document::{AttributeNode, ChildEntry, ElementNode, NamedEntry, ProfileDocument};
use crate::position::{Position, SourceRange};
use crate::{Error, Result};
use marked_yaml::types::{MarkedMappingNode, MarkedScalarNode, Node, Span};
use tracing::trace;

pub const YAML_SYNTAX: &str = "parse.yaml-syntax";
pub const NOT_A_MAPPING: &str = "parse.not-a-mapping";
pub const MISSING_PROFILE_KEY: &str = "parse.missing-profile-key";
pub const PROFILE_NOT_MAPPING: &str = "parse.profile-not-mapping";
pub const INVALID_SHAPE: &str = "parse.invalid-shape";
pub const INVALID_CARDINALITY: &str = "parse.invalid-cardinality";

/// Result of parsing profile text
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// `None` when the text is not a usable profile at all
    pub document: Option<ProfileDocument>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            document: None,
            diagnostics: vec![diagnostic],
        }
    }
}

/// Whether the text holds nothing but whitespace and comments
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

/// Parse profile text, collecting diagnostics instead of failing
#[must_use]
pub fn parse(text: &str) -> ParseOutcome {
    let top = SourceRange::at(1, 1);
    if is_blank(text) {
        return ParseOutcome::failed(not_a_mapping(top));
    }

    let value: serde_yaml::Value = match serde_yaml::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            let range = e
                .location()
                .map_or(top, |l| SourceRange::at(l.line(), l.column()));
            return ParseOutcome::failed(Diagnostic::error(
                YAML_SYNTAX,
                format!("YAML syntax error: {e}"),
                "",
                range,
            ));
        }
    };
    let Some(root) = value.as_mapping() else {
        return ParseOutcome::failed(not_a_mapping(top));
    };
    match root.get("profile") {
        None => {
            return ParseOutcome::failed(Diagnostic::error(
                MISSING_PROFILE_KEY,
                "Missing top-level 'profile' key.",
                "",
                top,
            ));
        }
        Some(profile) if !profile.is_mapping() => {
            return ParseOutcome::failed(Diagnostic::error(
                PROFILE_NOT_MAPPING,
                "'profile' must be a mapping.",
                "profile",
                top,
            ));
        }
        Some(_) => {}
    }

    let node = match marked_yaml::parse_yaml(0, text) {
        Ok(node) => node,
        Err(e) => {
            return ParseOutcome::failed(Diagnostic::error(
                YAML_SYNTAX,
                format!("YAML syntax error: {e}"),
                "",
                top,
            ));
        }
    };
    let Some(root) = node.as_mapping() else {
        return ParseOutcome::failed(not_a_mapping(top));
    };
    let Some((profile_key, profile)) = root
        .iter()
        .find(|(k, _)| k.as_str() == "profile")
        .and_then(|(k, v)| v.as_mapping().map(|m| (k, m)))
    else {
        return ParseOutcome::failed(Diagnostic::error(
            PROFILE_NOT_MAPPING,
            "'profile' must be a mapping.",
            "profile",
            top,
        ));
    };

    let mut builder = Builder::default();
    for (key, _) in root.iter().filter(|(k, _)| k.as_str() != "profile") {
        builder.unknown_key(key, key.as_str());
    }
    let mut document = builder.profile(profile);
    document.profile_range = range_of(profile_key.span());
    trace!(
        "Parsed profile with {} elements and {} diagnostics",
        document.elements.len(),
        builder.diagnostics.len()
    );
    ParseOutcome {
        document: Some(document),
        diagnostics: builder.diagnostics,
    }
}

/// Parse profile text, failing when no document can be built
///
/// # Errors
///
/// Returns [`Error::Malformed`] with the first diagnostic when the text is
/// not a usable profile.
pub fn parse_document(text: &str) -> Result<ProfileDocument> {
    let outcome = parse(text);
    match outcome.document {
        Some(document) => Ok(document),
        None => Err(Error::Malformed(
            outcome
                .diagnostics
                .first()
                .map_or_else(|| "unknown error".to_string(), |d| d.message.clone()),
        )),
    }
}

fn not_a_mapping(range: SourceRange) -> Diagnostic {
    Diagnostic::error(NOT_A_MAPPING, "document must be a mapping.", "", range)
}

fn range_of(span: &Span) -> SourceRange {
    let start = span
        .start()
        .map_or_else(Position::default, |m| Position::new(m.line(), m.column()));
    let end = span
        .end()
        .map_or(start, |m| Position::new(m.line(), m.column()));
    SourceRange::new(start, end)
}

fn is_null(value: &str) -> bool {
    matches!(value, "" | "~" | "null" | "Null" | "NULL")
}

fn scalar_text(node: &Node) -> Option<&MarkedScalarNode> {
    node.as_scalar().filter(|s| !is_null(s.as_str()))
}

fn is_null_node(node: &Node) -> bool {
    node.as_scalar().is_some_and(|s| is_null(s.as_str()))
}

#[derive(Default)]
struct Builder {
    diagnostics: Vec<Diagnostic>,
}

impl Builder {
    fn shape(&mut self, message: String, path: &str, node: &Node) {
        self.diagnostics.push(Diagnostic::error(
            INVALID_SHAPE,
            message,
            path,
            range_of(node.span()),
        ));
    }

    fn unknown_key(&mut self, key: &MarkedScalarNode, path: &str) {
        self.diagnostics.push(Diagnostic::warning(
            INVALID_SHAPE,
            format!("Unknown key '{}' is ignored.", key.as_str()),
            path,
            range_of(key.span()),
        ));
    }

    fn profile(&mut self, profile: &MarkedMappingNode) -> ProfileDocument {
        let mut document = ProfileDocument::default();
        for (key, value) in profile.iter() {
            let path = format!("profile.{}", key.as_str());
            match key.as_str() {
                "name" => document.metadata.name = self.text(value, &path),
                "version" => document.metadata.version = self.text(value, &path),
                "description" => document.metadata.description = self.text(value, &path),
                "documentTypes" => document.metadata.document_types = self.names(value, &path),
                "elements" => {
                    document.elements_range = range_of(key.span());
                    document.elements = self.elements(value, &path);
                }
                _ => self.unknown_key(key, &path),
            }
        }
        document
    }

    fn text(&mut self, node: &Node, path: &str) -> Option<String> {
        if node.as_scalar().is_none() {
            self.shape(format!("'{path}' must be a text value."), path, node);
            return None;
        }
        scalar_text(node).map(|s| s.as_str().to_string())
    }

    fn names(&mut self, node: &Node, path: &str) -> Vec<NamedEntry> {
        if let Some(sequence) = node.as_sequence() {
            let mut entries = Vec::new();
            for item in sequence.iter() {
                match scalar_text(item) {
                    Some(s) => entries.push(NamedEntry {
                        name: s.as_str().to_string(),
                        range: range_of(s.span()),
                    }),
                    None if is_null_node(item) => {}
                    None => self.shape(format!("Entries of '{path}' must be names."), path, item),
                }
            }
            entries
        } else if let Some(s) = scalar_text(node) {
            vec![NamedEntry {
                name: s.as_str().to_string(),
                range: range_of(s.span()),
            }]
        } else if is_null_node(node) {
            Vec::new()
        } else {
            self.shape(format!("'{path}' must be a list of names."), path, node);
            Vec::new()
        }
    }

    fn elements(&mut self, node: &Node, path: &str) -> Vec<ElementNode> {
        if let Some(mapping) = node.as_mapping() {
            mapping
                .iter()
                .map(|(key, value)| self.element(key, value, path))
                .collect()
        } else {
            if !is_null_node(node) {
                self.shape(format!("'{path}' must be a mapping of element names."), path, node);
            }
            Vec::new()
        }
    }

    fn element(&mut self, key: &MarkedScalarNode, value: &Node, parent: &str) -> ElementNode {
        let path = format!("{parent}.{}", key.as_str());
        let mut element = ElementNode::new(key.as_str());
        element.range = range_of(key.span());

        let Some(body) = value.as_mapping() else {
            if !is_null_node(value) {
                self.shape(
                    format!("Element '{}' must be empty or a mapping.", key.as_str()),
                    &path,
                    value,
                );
            }
            return element;
        };

        for (field, inner) in body.iter() {
            let field_path = format!("{path}.{}", field.as_str());
            match field.as_str() {
                "profileNote" => element.annotation = self.text(inner, &field_path),
                "attributes" => element.attributes = self.attributes(inner, &field_path),
                "children" => {
                    element.children_range = Some(range_of(field.span()));
                    self.children(inner, &field_path, &mut element);
                }
                "choice" => {
                    element.choice_range = Some(range_of(field.span()));
                    let entries = self.child_entries(inner, &field_path);
                    element.choice.extend(entries);
                }
                "structure" => element.structure = self.names(inner, &field_path),
                _ => self.unknown_key(field, &field_path),
            }
        }
        element
    }

    fn children(&mut self, node: &Node, path: &str, element: &mut ElementNode) {
        let Some(mapping) = node.as_mapping() else {
            if !is_null_node(node) {
                self.shape(format!("'{path}' must be a mapping of child names."), path, node);
            }
            return;
        };
        for (key, value) in mapping.iter() {
            if key.as_str() == "choice" {
                element.choice_range = Some(range_of(key.span()));
                let entries = self.child_entries(value, &format!("{path}.choice"));
                element.choice.extend(entries);
            } else {
                let entry = self.child_entry(key, value, path);
                element.children.push(entry);
            }
        }
    }

    fn child_entries(&mut self, node: &Node, path: &str) -> Vec<ChildEntry> {
        if let Some(mapping) = node.as_mapping() {
            mapping
                .iter()
                .map(|(key, value)| self.child_entry(key, value, path))
                .collect()
        } else if node.as_sequence().is_some() {
            self.names(node, path)
                .into_iter()
                .map(|n| ChildEntry {
                    name: n.name,
                    cardinality: None,
                    range: n.range,
                })
                .collect()
        } else {
            if !is_null_node(node) {
                self.shape(format!("'{path}' must be a mapping of child names."), path, node);
            }
            Vec::new()
        }
    }

    fn child_entry(&mut self, key: &MarkedScalarNode, value: &Node, parent: &str) -> ChildEntry {
        let path = format!("{parent}.{}", key.as_str());
        let mut entry = ChildEntry::new(key.as_str(), None);
        entry.range = range_of(key.span());

        if let Some(text) = scalar_text(value) {
            match text.as_str().parse::<Cardinality>() {
                Ok(cardinality) => entry.cardinality = Some(cardinality),
                Err(e) => self.diagnostics.push(Diagnostic::error(
                    INVALID_CARDINALITY,
                    e.to_string(),
                    path,
                    range_of(text.span()),
                )),
            }
        } else if !is_null_node(value) {
            self.shape(
                format!("Cardinality of '{}' must be text such as 1..1.", key.as_str()),
                &path,
                value,
            );
        }
        entry
    }

    fn attributes(&mut self, node: &Node, path: &str) -> Vec<AttributeNode> {
        let Some(mapping) = node.as_mapping() else {
            if !is_null_node(node) {
                self.shape(format!("'{path}' must be a mapping of attribute names."), path, node);
            }
            return Vec::new();
        };

        let mut attributes = Vec::new();
        for (key, value) in mapping.iter() {
            let attribute_path = format!("{path}.{}", key.as_str());
            let mut attribute = AttributeNode::new(key.as_str(), false);
            attribute.range = range_of(key.span());

            if let Some(body) = value.as_mapping() {
                for (field, inner) in body.iter() {
                    let field_path = format!("{attribute_path}.{}", field.as_str());
                    match field.as_str() {
                        "required" => match scalar_text(inner).map(|s| s.as_str()) {
                            Some("true" | "True" | "TRUE") => attribute.required = true,
                            Some("false" | "False" | "FALSE") => attribute.required = false,
                            _ => self.shape(
                                format!("'{field_path}' must be true or false."),
                                &field_path,
                                inner,
                            ),
                        },
                        "values" => attribute.values = self.names(inner, &field_path),
                        _ => self.unknown_key(field, &field_path),
                    }
                }
            } else if !is_null_node(value) {
                self.shape(
                    format!("Attribute '{}' must be empty or a mapping.", key.as_str()),
                    &attribute_path,
                    value,
                );
            }
            attributes.push(attribute);
        }
        attributes
    }
}
