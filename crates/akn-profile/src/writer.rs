//! Canonical YAML rendering of a [`ProfileDocument`]
//!
//! Output is deterministic: two-space indentation, a blank line between
//! element definitions, and element keys in the order `profileNote`,
//! `attributes`, `children` (with a nested `choice` last) and `structure`.

use crate::cardinality::Cardinality;
use crate::document::{AttributeNode, ChildEntry, ElementNode, NamedEntry, ProfileDocument};

const RESERVED: &[&str] = &[
    "true", "false", "yes", "no", "on", "off", "null", "y", "n", "~",
];

/// Render a document as canonical YAML
#[must_use]
pub fn render(document: &ProfileDocument) -> String {
    let mut out = Emitter::default();
    out.document(document);
    out.text
}

/// Render a document preceded by comment lines
#[must_use]
pub fn render_with_header(document: &ProfileDocument, header: &[&str]) -> String {
    let mut out = Emitter::default();
    for line in header {
        if line.is_empty() {
            out.line(0, "#");
        } else {
            out.line(0, &format!("# {line}"));
        }
    }
    out.document(document);
    out.text
}

/// Quote a scalar unless it is safe as a plain YAML name
fn scalar(value: &str) -> String {
    if is_plain(value) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn is_plain(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
        && !RESERVED.contains(&value.to_ascii_lowercase().as_str())
}

fn cardinality(value: Option<Cardinality>) -> Option<String> {
    value.map(|c| scalar(&c.to_string()))
}

#[derive(Default)]
struct Emitter {
    text: String,
}

impl Emitter {
    fn line(&mut self, indent: usize, content: &str) {
        for _ in 0..indent {
            self.text.push_str("  ");
        }
        self.text.push_str(content);
        self.text.push('\n');
    }

    fn key(&mut self, indent: usize, key: &str, value: Option<String>) {
        match value {
            Some(value) => self.line(indent, &format!("{}: {value}", scalar(key))),
            None => self.line(indent, &format!("{}:", scalar(key))),
        }
    }

    fn list(&mut self, indent: usize, entries: &[NamedEntry]) {
        for entry in entries {
            self.line(indent, &format!("- {}", scalar(&entry.name)));
        }
    }

    fn document(&mut self, document: &ProfileDocument) {
        let metadata = &document.metadata;
        self.line(0, "profile:");
        for (key, value) in [
            ("name", &metadata.name),
            ("version", &metadata.version),
            ("description", &metadata.description),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                self.key(1, key, Some(scalar(value)));
            }
        }
        if !metadata.document_types.is_empty() {
            self.line(1, "documentTypes:");
            self.list(2, &metadata.document_types);
        }

        self.line(1, "elements:");
        for (index, element) in document.elements.iter().enumerate() {
            if index > 0 {
                self.text.push('\n');
            }
            self.element(element);
        }
    }

    fn element(&mut self, element: &ElementNode) {
        self.key(2, &element.name, None);
        if let Some(note) = element.annotation.as_deref().filter(|n| !n.is_empty()) {
            self.key(3, "profileNote", Some(scalar(note)));
        }
        if !element.attributes.is_empty() {
            self.line(3, "attributes:");
            for attribute in &element.attributes {
                self.attribute(attribute);
            }
        }
        if !element.children.is_empty() || !element.choice.is_empty() {
            self.line(3, "children:");
            self.entries(4, &element.children);
            if !element.choice.is_empty() {
                self.line(4, "choice:");
                self.entries(5, &element.choice);
            }
        }
        if !element.structure.is_empty() {
            self.line(3, "structure:");
            self.list(4, &element.structure);
        }
    }

    fn attribute(&mut self, attribute: &AttributeNode) {
        self.key(4, &attribute.name, None);
        self.key(5, "required", Some(attribute.required.to_string()));
        if !attribute.values.is_empty() {
            self.line(5, "values:");
            self.list(6, &attribute.values);
        }
    }

    fn entries(&mut self, indent: usize, entries: &[ChildEntry]) {
        for entry in entries {
            self.key(indent, &entry.name, cardinality(entry.cardinality));
        }
    }
}
