//! Schema loader: reads XSD documents and resolves them into a
//! [`SchemaModel`]

use crate::choice::ChoiceNormalizer;
use crate::model::{
    AttributeKind, AttributeType, ChildRef, ElementType, Occurs, PatternFacet, SchemaModel,
    SchemaOptions,
};
use crate::xsd::{
    Derivation, ElementTypeRef, Particle, QName, RawAttribute, RawAttributeUse, RawComplexType,
    RawElement, RawSchema, RawSimpleType,
};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Loads XSD documents into an immutable schema model
#[derive(Debug, Clone, Default)]
pub struct SchemaLoader {
    options: SchemaOptions,
}

impl SchemaLoader {
    /// Create a loader with the default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with specific options
    #[must_use]
    pub fn with_options(options: SchemaOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Load a single schema document held in memory
    ///
    /// # Errors
    ///
    /// Returns an error when the XML is malformed or a reference cannot be
    /// resolved.
    pub fn load_from_str(&self, version: &str, xsd: &str) -> Result<SchemaModel> {
        let mut raw = RawSchema::default();
        let includes = raw.add_document(version, xsd)?;
        if !includes.is_empty() {
            debug!(
                "Ignoring {} xs:include(s) of an in-memory schema",
                includes.len()
            );
        }
        self.build(version, &raw)
    }

    /// Load a schema file, following `xs:include` relative to it
    ///
    /// # Errors
    ///
    /// Returns an error when a file cannot be read, the XML is malformed, or
    /// a reference cannot be resolved.
    pub fn load_from_file(&self, path: &Path) -> Result<SchemaModel> {
        self.load_from_files(&[path.to_path_buf()])
    }

    /// Load a set of schema files as one schema
    ///
    /// # Errors
    ///
    /// Returns an error when a file cannot be read, the XML is malformed, or
    /// a reference cannot be resolved.
    pub fn load_from_files(&self, paths: &[PathBuf]) -> Result<SchemaModel> {
        let Some(first) = paths.first() else {
            return Err(Error::NotFound("no schema files given".to_string()));
        };
        let mut raw = RawSchema::default();
        let mut visited = HashSet::new();
        for path in paths {
            Self::add_file(&mut raw, path, &mut visited)?;
        }
        let version = first
            .file_stem()
            .map_or_else(|| "schema".to_string(), |s| s.to_string_lossy().into_owned());
        self.build(&version, &raw)
    }

    fn add_file(raw: &mut RawSchema, path: &Path, visited: &mut HashSet<PathBuf>) -> Result<()> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(canonical) {
            return Ok(());
        }
        trace!("Reading schema document {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        let includes = raw.add_document(&path.display().to_string(), &content)?;
        for location in includes {
            let next = path
                .parent()
                .map_or_else(|| PathBuf::from(&location), |dir| dir.join(&location));
            Self::add_file(raw, &next, visited)?;
        }
        Ok(())
    }

    fn build(&self, version: &str, raw: &RawSchema) -> Result<SchemaModel> {
        let mut resolver = Resolver::new(raw);
        let mut elements = BTreeMap::new();
        for element in &raw.elements {
            let resolved = resolver.resolve_element(element)?;
            elements.insert(resolved.name.clone(), resolved);
        }
        let back_references = mark_back_references(&mut elements);

        let model = SchemaModel::new(version, elements, &self.options);
        info!(
            "Loaded schema '{}': {} elements, {} choice groups, {} recursive references",
            version,
            model.element_count(),
            model.choice_group_count(),
            back_references
        );
        Ok(model)
    }
}

#[derive(Debug, Default)]
struct ChildAccumulator {
    children: Vec<ChildRef>,
}

impl ChildAccumulator {
    fn add(&mut self, name: &str, occurs: Occurs) {
        if let Some(existing) = self.children.iter_mut().find(|c| c.name == name) {
            existing.occurs = existing.occurs.plus(occurs);
        } else {
            let index = self.children.len();
            self.children.push(ChildRef {
                name: name.to_string(),
                occurs,
                index,
                back_reference: false,
            });
        }
    }
}

struct Resolver<'a> {
    raw: &'a RawSchema,
    choices: ChoiceNormalizer<'a>,
    type_cache: HashMap<String, (Vec<ChildRef>, Vec<AttributeType>)>,
}

impl<'a> Resolver<'a> {
    fn new(raw: &'a RawSchema) -> Self {
        Self {
            raw,
            choices: ChoiceNormalizer::new(raw),
            type_cache: HashMap::new(),
        }
    }

    fn resolve_element(&mut self, element: &RawElement) -> Result<ElementType> {
        let raw = self.raw;
        let leaf = |type_name: Option<String>| ElementType {
            name: element.name.clone(),
            type_name,
            children: Vec::new(),
            attributes: Vec::new(),
            choices: Vec::new(),
            mixed: false,
            documentation: element.documentation.clone(),
        };

        match &element.type_ref {
            ElementTypeRef::Named(QName::Local(type_name)) => {
                if let Some(ct) = raw.complex_types.get(type_name) {
                    let (children, attributes) = self.named_type(type_name, ct)?;
                    Ok(ElementType {
                        name: element.name.clone(),
                        type_name: Some(type_name.clone()),
                        children,
                        attributes,
                        choices: self.choices.for_type(type_name)?,
                        mixed: ct.mixed,
                        documentation: element
                            .documentation
                            .clone()
                            .or_else(|| ct.documentation.clone()),
                    })
                } else if raw.simple_types.contains_key(type_name) {
                    Ok(leaf(Some(type_name.clone())))
                } else {
                    Err(Error::unresolved("type", type_name, &element.name))
                }
            }
            ElementTypeRef::Named(other) => Ok(leaf(Some(other.local().to_string()))),
            ElementTypeRef::Complex(ct) => {
                let children = self.children_of(ct, &mut Vec::new())?;
                let attributes = self.attributes_of(ct, &mut Vec::new())?;
                Ok(ElementType {
                    name: element.name.clone(),
                    type_name: None,
                    children,
                    attributes,
                    choices: self.choices.for_complex_type(&element.name, ct)?,
                    mixed: ct.mixed,
                    documentation: element.documentation.clone(),
                })
            }
            ElementTypeRef::Simple => Ok(leaf(None)),
        }
    }

    fn named_type(
        &mut self,
        name: &str,
        ct: &RawComplexType,
    ) -> Result<(Vec<ChildRef>, Vec<AttributeType>)> {
        if let Some(cached) = self.type_cache.get(name) {
            return Ok(cached.clone());
        }
        let mut path = vec![name.to_string()];
        let children = self.children_of(ct, &mut path)?;
        let mut path = vec![name.to_string()];
        let attributes = self.attributes_of(ct, &mut path)?;
        self.type_cache
            .insert(name.to_string(), (children.clone(), attributes.clone()));
        Ok((children, attributes))
    }

    /// Resolve the base of a derived type, guarding against derivation cycles
    fn base_type(
        &self,
        ct: &RawComplexType,
        path: &mut Vec<String>,
    ) -> Result<Option<(&'a RawComplexType, Derivation)>> {
        let raw = self.raw;
        let Some((QName::Local(base), derivation)) = &ct.base else {
            return Ok(None);
        };
        if let Some(base_ct) = raw.complex_types.get(base) {
            if path.contains(base) {
                path.push(base.clone());
                return Err(Error::Derivation(path.join(" -> ")));
            }
            path.push(base.clone());
            Ok(Some((base_ct, *derivation)))
        } else if raw.simple_types.contains_key(base) {
            Ok(None)
        } else {
            Err(Error::unresolved("type", base, &ct.name))
        }
    }

    fn children_of(&self, ct: &RawComplexType, path: &mut Vec<String>) -> Result<Vec<ChildRef>> {
        let mut acc = ChildAccumulator::default();
        self.collect_content(ct, path, &mut acc)?;
        Ok(acc.children)
    }

    fn collect_content(
        &self,
        ct: &RawComplexType,
        path: &mut Vec<String>,
        acc: &mut ChildAccumulator,
    ) -> Result<()> {
        if let Some((base_ct, derivation)) = self.base_type(ct, path)? {
            // a restriction restates the content it keeps
            if derivation == Derivation::Extension {
                self.collect_content(base_ct, path, acc)?;
            }
            path.pop();
        }
        if let Some(content) = &ct.content {
            let mut groups = Vec::new();
            self.walk(content, Occurs::ONCE, &ct.name, &mut groups, acc)?;
        }
        Ok(())
    }

    fn walk(
        &self,
        particle: &Particle,
        factor: Occurs,
        context: &str,
        groups: &mut Vec<String>,
        acc: &mut ChildAccumulator,
    ) -> Result<()> {
        match particle {
            Particle::Element { name, occurs } => {
                if !self.raw.has_element(name) {
                    return Err(Error::unresolved("element", name, context));
                }
                acc.add(name, factor.times(*occurs));
            }
            Particle::Sequence { items, occurs } | Particle::All { items, occurs } => {
                let factor = factor.times(*occurs);
                for item in items {
                    self.walk(item, factor, context, groups, acc)?;
                }
            }
            Particle::Choice { items, occurs } => {
                let mut factor = factor.times(*occurs);
                let alternatives = items.iter().filter(|i| !matches!(i, Particle::Any)).count();
                if alternatives > 1 {
                    factor.min = 0;
                }
                for item in items {
                    self.walk(item, factor, context, groups, acc)?;
                }
            }
            Particle::Group { name, occurs } => {
                let Some(definition) = self.raw.groups.get(name) else {
                    return Err(Error::unresolved("group", name, context));
                };
                if groups.contains(name) {
                    warn!("Circular group reference '{}' in {}", name, context);
                    return Ok(());
                }
                groups.push(name.clone());
                self.walk(definition, factor.times(*occurs), context, groups, acc)?;
                groups.pop();
            }
            Particle::Any => {}
        }
        Ok(())
    }

    fn attributes_of(
        &self,
        ct: &RawComplexType,
        path: &mut Vec<String>,
    ) -> Result<Vec<AttributeType>> {
        let mut attributes = Vec::new();
        let mut derivation = None;
        if let Some((base_ct, kind)) = self.base_type(ct, path)? {
            attributes = self.attributes_of(base_ct, path)?;
            derivation = Some(kind);
            path.pop();
        }

        let mut own = Vec::new();
        let mut prohibited = Vec::new();
        let mut visited = HashSet::new();
        self.flatten(&ct.attributes, &ct.name, &mut own, &mut prohibited, &mut visited)?;

        attributes.retain(|a: &AttributeType| !prohibited.contains(&a.name));
        for attribute in own {
            match attributes.iter_mut().find(|a| a.name == attribute.name) {
                Some(existing) if derivation == Some(Derivation::Restriction) => {
                    *existing = attribute;
                }
                Some(_) => {}
                None => attributes.push(attribute),
            }
        }
        Ok(attributes)
    }

    /// Flatten attribute uses, expanding attribute groups transitively.
    /// The first declaration of a name wins.
    fn flatten(
        &self,
        uses: &[RawAttributeUse],
        context: &str,
        out: &mut Vec<AttributeType>,
        prohibited: &mut Vec<String>,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        for attribute_use in uses {
            match attribute_use {
                RawAttributeUse::Local(attribute) => {
                    if attribute.prohibited {
                        prohibited.push(attribute.name.clone());
                    } else {
                        push_first(out, self.resolve_attribute(attribute, context)?);
                    }
                }
                RawAttributeUse::Ref { name, required } => {
                    let resolved = match name {
                        QName::Xml(local) => AttributeType {
                            name: format!("xml:{local}"),
                            kind: AttributeKind::FreeText {
                                base: "string".to_string(),
                            },
                            required: *required,
                            documentation: None,
                        },
                        QName::Local(local) | QName::Builtin(local) => {
                            let declaration = self
                                .raw
                                .attributes
                                .get(local)
                                .ok_or_else(|| Error::unresolved("attribute", local, context))?;
                            let mut resolved = self.resolve_attribute(declaration, context)?;
                            resolved.required |= *required;
                            resolved
                        }
                    };
                    push_first(out, resolved);
                }
                RawAttributeUse::Group(group) => {
                    if !visited.insert(group.clone()) {
                        continue;
                    }
                    let members = self
                        .raw
                        .attribute_groups
                        .get(group)
                        .ok_or_else(|| Error::unresolved("attributeGroup", group, context))?;
                    self.flatten(members, group, out, prohibited, visited)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_attribute(&self, attribute: &RawAttribute, context: &str) -> Result<AttributeType> {
        let mut visited = HashSet::new();
        let kind = if let Some(inline) = &attribute.inline {
            self.simple_kind(inline, context, &mut visited)?
        } else if let Some(type_ref) = &attribute.type_ref {
            self.named_kind(type_ref, context, &mut visited)?
        } else {
            AttributeKind::FreeText {
                base: "anySimpleType".to_string(),
            }
        };
        Ok(AttributeType {
            name: attribute.name.clone(),
            kind,
            required: attribute.required,
            documentation: attribute.documentation.clone(),
        })
    }

    fn named_kind(
        &self,
        type_ref: &QName,
        context: &str,
        visited: &mut HashSet<String>,
    ) -> Result<AttributeKind> {
        match type_ref {
            QName::Builtin(name) | QName::Xml(name) => Ok(AttributeKind::FreeText { base: name.clone() }),
            QName::Local(name) => {
                if !visited.insert(name.clone()) {
                    return Ok(AttributeKind::FreeText { base: name.clone() });
                }
                let simple = self
                    .raw
                    .simple_types
                    .get(name)
                    .ok_or_else(|| Error::unresolved("simpleType", name, context))?;
                self.simple_kind(simple, name, visited)
            }
        }
    }

    fn simple_kind(
        &self,
        simple: &RawSimpleType,
        context: &str,
        visited: &mut HashSet<String>,
    ) -> Result<AttributeKind> {
        if !simple.enumerations.is_empty() {
            return Ok(AttributeKind::Enumeration {
                values: simple.enumerations.clone(),
            });
        }
        if let Some(pattern) = &simple.pattern {
            return Ok(AttributeKind::Pattern {
                pattern: PatternFacet::new(pattern.clone()),
            });
        }
        if simple.composite {
            return Ok(AttributeKind::FreeText {
                base: context.to_string(),
            });
        }
        match &simple.base {
            Some(base) => self.named_kind(base, context, visited),
            None => Ok(AttributeKind::FreeText {
                base: "string".to_string(),
            }),
        }
    }
}

fn push_first(out: &mut Vec<AttributeType>, attribute: AttributeType) {
    if !out.iter().any(|a| a.name == attribute.name) {
        out.push(attribute);
    }
}

/// Flag child references that re-enter a type already on the current
/// resolution path. Returns the number of flagged references.
fn mark_back_references(elements: &mut BTreeMap<String, ElementType>) -> usize {
    fn visit(
        name: &str,
        elements: &BTreeMap<String, ElementType>,
        path: &mut Vec<String>,
        done: &mut HashSet<String>,
        marks: &mut HashSet<(String, String)>,
    ) {
        path.push(name.to_string());
        if let Some(element) = elements.get(name) {
            for child in &element.children {
                if path.contains(&child.name) {
                    marks.insert((name.to_string(), child.name.clone()));
                } else if !done.contains(&child.name) {
                    visit(&child.name, elements, path, done, marks);
                }
            }
        }
        path.pop();
        done.insert(name.to_string());
    }

    let mut done = HashSet::new();
    let mut marks = HashSet::new();
    let names: Vec<String> = elements.keys().cloned().collect();
    for name in &names {
        if !done.contains(name) {
            visit(name, elements, &mut Vec::new(), &mut done, &mut marks);
        }
    }

    for (parent, child) in &marks {
        if let Some(element) = elements.get_mut(parent) {
            for child_ref in element.children.iter_mut().filter(|c| &c.name == child) {
                child_ref.back_reference = true;
            }
        }
    }
    marks.len()
}
