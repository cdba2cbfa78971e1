//! Raw XSD declarations read with `roxmltree`
//!
//! This layer only records what the schema documents say. Name resolution,
//! inheritance and choice normalization happen in the loader.

use crate::model::Occurs;
use crate::{Error, Result};
use roxmltree::{Document, Node, ParsingOptions};
use std::collections::HashMap;
use tracing::{debug, warn};

pub(crate) const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// A qualified reference to a type, element, group or attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QName {
    /// Declared in the loaded schema documents
    Local(String),
    /// Builtin `xs:` datatype
    Builtin(String),
    /// `xml:` namespace attribute
    Xml(String),
}

impl QName {
    pub(crate) fn local(&self) -> &str {
        match self {
            Self::Local(n) | Self::Builtin(n) | Self::Xml(n) => n,
        }
    }
}

/// Content model particle
#[derive(Debug, Clone)]
pub(crate) enum Particle {
    Element { name: String, occurs: Occurs },
    Group { name: String, occurs: Occurs },
    Sequence { items: Vec<Particle>, occurs: Occurs },
    Choice { items: Vec<Particle>, occurs: Occurs },
    All { items: Vec<Particle>, occurs: Occurs },
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Derivation {
    Extension,
    Restriction,
}

#[derive(Debug, Clone)]
pub(crate) struct RawComplexType {
    pub name: String,
    pub base: Option<(QName, Derivation)>,
    pub content: Option<Particle>,
    pub attributes: Vec<RawAttributeUse>,
    pub mixed: bool,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum RawAttributeUse {
    Local(RawAttribute),
    Ref { name: QName, required: bool },
    Group(String),
}

#[derive(Debug, Clone)]
pub(crate) struct RawAttribute {
    pub name: String,
    pub type_ref: Option<QName>,
    pub inline: Option<RawSimpleType>,
    pub required: bool,
    pub prohibited: bool,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RawSimpleType {
    pub base: Option<QName>,
    pub enumerations: Vec<String>,
    pub pattern: Option<String>,
    /// `xs:union` or `xs:list`
    pub composite: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum ElementTypeRef {
    Named(QName),
    Complex(Box<RawComplexType>),
    Simple,
}

#[derive(Debug, Clone)]
pub(crate) struct RawElement {
    pub name: String,
    pub type_ref: ElementTypeRef,
    pub documentation: Option<String>,
}

/// Every declaration of the loaded schema documents, first declaration wins
#[derive(Debug, Default)]
pub(crate) struct RawSchema {
    pub elements: Vec<RawElement>,
    element_index: HashMap<String, usize>,
    pub complex_types: HashMap<String, RawComplexType>,
    pub simple_types: HashMap<String, RawSimpleType>,
    pub groups: HashMap<String, Particle>,
    pub attribute_groups: HashMap<String, Vec<RawAttributeUse>>,
    pub attributes: HashMap<String, RawAttribute>,
}

impl RawSchema {
    /// Parse one schema document and merge its declarations. Returns the
    /// `schemaLocation` of every `xs:include`.
    pub(crate) fn add_document(&mut self, source: &str, xsd: &str) -> Result<Vec<String>> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xsd, options)
            .map_err(|e| Error::InvalidFormat(format!("{source}: {e}")))?;

        let root = doc.root_element();
        if !is_xsd(root, "schema") {
            return Err(Error::InvalidFormat(format!(
                "{source}: root element is <{}>, expected xs:schema",
                root.tag_name().name()
            )));
        }

        let mut local_elements = Vec::new();
        let mut includes = Vec::new();
        for node in root.children().filter(Node::is_element) {
            if node.tag_name().namespace() != Some(XSD_NS) {
                continue;
            }
            match node.tag_name().name() {
                "element" => {
                    let element = parse_element(node, &mut local_elements)?;
                    self.insert_element(element);
                }
                "complexType" => {
                    let name = required_attr(node, "name")?;
                    let ct = parse_complex_type(node, name, &mut local_elements)?;
                    insert_first(&mut self.complex_types, name, ct, "complexType");
                }
                "simpleType" => {
                    let name = required_attr(node, "name")?;
                    let st = parse_simple_type(node);
                    insert_first(&mut self.simple_types, name, st, "simpleType");
                }
                "group" => {
                    let name = required_attr(node, "name")?;
                    let particle = node
                        .children()
                        .filter(Node::is_element)
                        .find_map(|c| parse_particle(c, &mut local_elements).transpose())
                        .transpose()?
                        .unwrap_or(Particle::Sequence {
                            items: Vec::new(),
                            occurs: Occurs::ONCE,
                        });
                    insert_first(&mut self.groups, name, particle, "group");
                }
                "attributeGroup" => {
                    let name = required_attr(node, "name")?;
                    let uses = parse_attribute_uses(node)?;
                    insert_first(&mut self.attribute_groups, name, uses, "attributeGroup");
                }
                "attribute" => {
                    let attribute = parse_attribute(node)?;
                    let name = attribute.name.clone();
                    insert_first(&mut self.attributes, &name, attribute, "attribute");
                }
                "include" => {
                    if let Some(location) = node.attribute("schemaLocation") {
                        includes.push(location.to_string());
                    }
                }
                "import" | "redefine" => {
                    debug!(
                        "{}: skipping <{}> {:?}",
                        source,
                        node.tag_name().name(),
                        node.attribute("schemaLocation")
                    );
                }
                _ => {}
            }
        }

        // Local declarations become addressable by name unless a top-level
        // element already claims it.
        for element in local_elements {
            if !self.element_index.contains_key(&element.name) {
                self.insert_element(element);
            }
        }
        Ok(includes)
    }

    fn insert_element(&mut self, element: RawElement) {
        if self.element_index.contains_key(&element.name) {
            warn!("Duplicate element declaration '{}' ignored", element.name);
            return;
        }
        self.element_index
            .insert(element.name.clone(), self.elements.len());
        self.elements.push(element);
    }

    pub(crate) fn has_element(&self, name: &str) -> bool {
        self.element_index.contains_key(name)
    }
}

fn insert_first<T>(map: &mut HashMap<String, T>, name: &str, value: T, kind: &str) {
    if map.contains_key(name) {
        warn!("Duplicate {} declaration '{}' ignored", kind, name);
    } else {
        map.insert(name.to_string(), value);
    }
}

fn is_xsd(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XSD_NS)
        && node.tag_name().name() == local
}

fn required_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        Error::InvalidFormat(format!(
            "<{}> at byte {} is missing the '{}' attribute",
            node.tag_name().name(),
            node.range().start,
            name
        ))
    })
}

fn qname(node: Node<'_, '_>, value: &str) -> QName {
    match value.split_once(':') {
        Some(("xml", local)) => QName::Xml(local.to_string()),
        Some((prefix, local)) => {
            if node.lookup_namespace_uri(Some(prefix)) == Some(XSD_NS) {
                QName::Builtin(local.to_string())
            } else {
                QName::Local(local.to_string())
            }
        }
        None => QName::Local(value.to_string()),
    }
}

fn parse_occurs(node: Node<'_, '_>) -> Result<Occurs> {
    let min = match node.attribute("minOccurs") {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| Error::InvalidFormat(format!("invalid minOccurs '{v}'")))?,
        None => 1,
    };
    let max = match node.attribute("maxOccurs").map(str::trim) {
        Some("unbounded") => None,
        Some(v) => Some(
            v.parse()
                .map_err(|_| Error::InvalidFormat(format!("invalid maxOccurs '{v}'")))?,
        ),
        None => Some(1),
    };
    Ok(Occurs::new(min, max))
}

/// Whitespace-normalized text of an `xs:annotation/xs:documentation` child.
/// Structured documentation (nested markup) prefers a `comment` child.
fn documentation(node: Node<'_, '_>) -> Option<String> {
    let doc = node
        .children()
        .filter(|n| is_xsd(*n, "annotation"))
        .flat_map(|a| a.children())
        .find(|n| is_xsd(*n, "documentation"))?;

    let source = doc
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "comment")
        .unwrap_or(doc);

    let text: Vec<&str> = source
        .descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .flat_map(str::split_whitespace)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text.join(" "))
    }
}

fn parse_element(node: Node<'_, '_>, locals: &mut Vec<RawElement>) -> Result<RawElement> {
    let name = required_attr(node, "name")?;
    let type_ref = if let Some(t) = node.attribute("type") {
        ElementTypeRef::Named(qname(node, t))
    } else if let Some(ct) = node.children().find(|n| is_xsd(*n, "complexType")) {
        ElementTypeRef::Complex(Box::new(parse_complex_type(ct, name, locals)?))
    } else {
        ElementTypeRef::Simple
    };
    Ok(RawElement {
        name: name.to_string(),
        type_ref,
        documentation: documentation(node),
    })
}

fn parse_complex_type(
    node: Node<'_, '_>,
    name: &str,
    locals: &mut Vec<RawElement>,
) -> Result<RawComplexType> {
    let mut derived_attributes = Vec::new();
    let mut ct = RawComplexType {
        name: name.to_string(),
        base: None,
        content: None,
        attributes: Vec::new(),
        mixed: node.attribute("mixed") == Some("true"),
        documentation: documentation(node),
    };

    for child in node.children().filter(Node::is_element) {
        if child.tag_name().namespace() != Some(XSD_NS) {
            continue;
        }
        match child.tag_name().name() {
            "complexContent" | "simpleContent" => {
                if child.attribute("mixed") == Some("true") {
                    ct.mixed = true;
                }
                let Some(derivation) = child.children().find(|n| {
                    is_xsd(*n, "extension") || is_xsd(*n, "restriction")
                }) else {
                    continue;
                };
                let kind = if derivation.tag_name().name() == "extension" {
                    Derivation::Extension
                } else {
                    Derivation::Restriction
                };
                let base = required_attr(derivation, "base")?;
                ct.base = Some((qname(derivation, base), kind));
                for inner in derivation.children().filter(Node::is_element) {
                    if let Some(particle) = parse_particle(inner, locals)? {
                        ct.content = Some(particle);
                    }
                }
                derived_attributes.extend(parse_attribute_uses(derivation)?);
            }
            "attribute" | "attributeGroup" | "anyAttribute" => {}
            _ => {
                if let Some(particle) = parse_particle(child, locals)? {
                    ct.content = Some(particle);
                }
            }
        }
    }
    ct.attributes = parse_attribute_uses(node)?;
    ct.attributes.append(&mut derived_attributes);
    Ok(ct)
}

fn parse_particle(node: Node<'_, '_>, locals: &mut Vec<RawElement>) -> Result<Option<Particle>> {
    if node.tag_name().namespace() != Some(XSD_NS) {
        return Ok(None);
    }
    let particle = match node.tag_name().name() {
        "element" => {
            let occurs = parse_occurs(node)?;
            if let Some(r) = node.attribute("ref") {
                Particle::Element {
                    name: qname(node, r).local().to_string(),
                    occurs,
                }
            } else {
                let element = parse_element(node, locals)?;
                let name = element.name.clone();
                locals.push(element);
                Particle::Element { name, occurs }
            }
        }
        "group" => Particle::Group {
            name: qname(node, required_attr(node, "ref")?).local().to_string(),
            occurs: parse_occurs(node)?,
        },
        "sequence" | "choice" | "all" => {
            let occurs = parse_occurs(node)?;
            let mut items = Vec::new();
            for child in node.children().filter(Node::is_element) {
                if let Some(p) = parse_particle(child, locals)? {
                    items.push(p);
                }
            }
            match node.tag_name().name() {
                "sequence" => Particle::Sequence { items, occurs },
                "choice" => Particle::Choice { items, occurs },
                _ => Particle::All { items, occurs },
            }
        }
        "any" => Particle::Any,
        _ => return Ok(None),
    };
    Ok(Some(particle))
}

fn parse_attribute_uses(node: Node<'_, '_>) -> Result<Vec<RawAttributeUse>> {
    let mut uses = Vec::new();
    for child in node.children().filter(Node::is_element) {
        if is_xsd(child, "attribute") {
            if let Some(r) = child.attribute("ref") {
                uses.push(RawAttributeUse::Ref {
                    name: qname(child, r),
                    required: child.attribute("use") == Some("required"),
                });
            } else {
                uses.push(RawAttributeUse::Local(parse_attribute(child)?));
            }
        } else if is_xsd(child, "attributeGroup") {
            let r = required_attr(child, "ref")?;
            uses.push(RawAttributeUse::Group(qname(child, r).local().to_string()));
        }
    }
    Ok(uses)
}

fn parse_attribute(node: Node<'_, '_>) -> Result<RawAttribute> {
    let name = required_attr(node, "name")?;
    let inline = node
        .children()
        .find(|n| is_xsd(*n, "simpleType"))
        .map(parse_simple_type);
    Ok(RawAttribute {
        name: name.to_string(),
        type_ref: node.attribute("type").map(|t| qname(node, t)),
        inline,
        required: node.attribute("use") == Some("required"),
        prohibited: node.attribute("use") == Some("prohibited"),
        documentation: documentation(node),
    })
}

fn parse_simple_type(node: Node<'_, '_>) -> RawSimpleType {
    let mut st = RawSimpleType::default();
    for child in node.children().filter(Node::is_element) {
        if is_xsd(child, "restriction") {
            st.base = child.attribute("base").map(|b| qname(child, b));
            for facet in child.children().filter(Node::is_element) {
                if is_xsd(facet, "enumeration") {
                    if let Some(v) = facet.attribute("value") {
                        st.enumerations.push(v.to_string());
                    }
                } else if is_xsd(facet, "pattern") && st.pattern.is_none() {
                    st.pattern = facet.attribute("value").map(str::to_string);
                }
            }
        } else if is_xsd(child, "union") || is_xsd(child, "list") {
            st.composite = true;
        }
    }
    st
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="doc">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="title" type="xs:string"/>
        <xs:element ref="part" minOccurs="0" maxOccurs="unbounded"/>
      </xs:sequence>
      <xs:attribute name="lang" type="xs:language" use="required"/>
    </xs:complexType>
  </xs:element>
  <xs:element name="part" type="xs:string"/>
</xs:schema>"#;

    #[test]
    fn test_add_document_collects_declarations() {
        let mut raw = RawSchema::default();
        raw.add_document("small.xsd", SMALL).unwrap();

        assert!(raw.has_element("doc"));
        assert!(raw.has_element("part"));
        // local declaration registered after the top-level ones
        assert!(raw.has_element("title"));
        assert_eq!(raw.elements.last().map(|e| e.name.as_str()), Some("title"));
    }

    #[test]
    fn test_occurs_and_builtin_types() {
        let mut raw = RawSchema::default();
        raw.add_document("small.xsd", SMALL).unwrap();

        let doc = &raw.elements[0];
        let ElementTypeRef::Complex(ct) = &doc.type_ref else {
            panic!("expected anonymous complex type");
        };
        let Some(Particle::Sequence { items, .. }) = &ct.content else {
            panic!("expected sequence");
        };
        match &items[1] {
            Particle::Element { name, occurs } => {
                assert_eq!(name, "part");
                assert_eq!(*occurs, Occurs::new(0, None));
            }
            other => panic!("unexpected particle {other:?}"),
        }
        match &ct.attributes[0] {
            RawAttributeUse::Local(a) => {
                assert!(a.required);
                assert_eq!(a.type_ref, Some(QName::Builtin("language".to_string())));
            }
            other => panic!("unexpected attribute use {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_schema_root() {
        let mut raw = RawSchema::default();
        let err = raw.add_document("bad.xsd", "<root/>").unwrap_err();
        assert!(err.to_string().contains("expected xs:schema"));
    }

    #[test]
    fn test_rejects_malformed_xml() {
        let mut raw = RawSchema::default();
        assert!(raw.add_document("bad.xsd", "<xs:schema").is_err());
    }
}
