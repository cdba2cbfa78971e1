//! Identity attributes and self-consistency of the profile

use super::{attribute_path, attributes_path, structure_path};
use akn_profile::{Diagnostic, ElementNode, ProfileDocument};
use akn_schema::SchemaModel;
use std::collections::HashMap;

pub const REQUIRED_IDENTITY_MISSING: &str = "identity.required-identity-missing";
pub const REQUIRED_IDENTITY_OPTIONAL: &str = "identity.required-identity-optional";
pub const DUPLICATE_STRUCTURE_ENTRY: &str = "identity.duplicate-structure-entry";
pub const DOCTYPE_WITHOUT_ELEMENT_RESTRICTION: &str = "identity.doctype-without-element-restriction";

pub fn check(document: &ProfileDocument, schema: &SchemaModel) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for element in &document.elements {
        check_identity_attributes(element, schema, &mut out);
        check_duplicate_structure(element, &mut out);
    }

    for (index, entry) in document.metadata.document_types.iter().enumerate() {
        if document.has_element(&entry.name) {
            continue;
        }
        out.push(Diagnostic::info(
            DOCTYPE_WITHOUT_ELEMENT_RESTRICTION,
            format!(
                "Document type '{}' is listed in documentTypes but has no entry under 'elements'.",
                entry.name
            ),
            format!("profile.documentTypes[{index}]"),
            entry.range,
        ));
    }
    out
}

fn check_identity_attributes(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    if element.attributes.is_empty() {
        return;
    }
    let name = element.name.as_str();
    for identity in schema.identity_attributes() {
        let Some(declared) = schema.attribute(name, identity) else {
            continue;
        };
        if !declared.required {
            continue;
        }
        match element.attribute(identity) {
            None => out.push(Diagnostic::error(
                REQUIRED_IDENTITY_MISSING,
                format!("Identity attribute '{identity}' is mandatory on <{name}> but is not listed under 'attributes'."),
                attributes_path(name),
                element.range,
            )),
            Some(attribute) if !attribute.required => out.push(Diagnostic::error(
                REQUIRED_IDENTITY_OPTIONAL,
                format!("Identity attribute '{identity}' is mandatory on <{name}> but the profile does not mark it as required."),
                attribute_path(name, identity),
                attribute.range,
            )),
            Some(_) => {}
        }
    }
}

fn check_duplicate_structure(element: &ElementNode, out: &mut Vec<Diagnostic>) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (index, entry) in element.structure.iter().enumerate() {
        if let Some(first) = seen.get(entry.name.as_str()) {
            out.push(Diagnostic::warning(
                DUPLICATE_STRUCTURE_ENTRY,
                format!(
                    "'{}' appears more than once in the structure of <{}> (first at index {first}).",
                    entry.name, element.name
                ),
                structure_path(&element.name, index),
                entry.range,
            ));
        } else {
            seen.insert(&entry.name, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixture::{codes, document, schema};
    use akn_profile::Severity;

    #[test]
    fn test_mandatory_identity_attribute() {
        let doc = document("profile:\n  elements:\n    chapter:\n      attributes:\n        wId:\n    item:\n      attributes:\n        eId:\n          required: false\n    act:\n      attributes:\n        name:\n          required: true\n");
        let diagnostics = check(&doc, schema());
        assert_eq!(
            codes(&diagnostics),
            vec![REQUIRED_IDENTITY_MISSING, REQUIRED_IDENTITY_OPTIONAL]
        );
        assert_eq!(diagnostics[0].path, "profile.elements.chapter.attributes");
        assert_eq!(diagnostics[1].path, "profile.elements.item.attributes.eId");
    }

    #[test]
    fn test_identity_is_not_checked_without_attributes_block() {
        let doc = document("profile:\n  elements:\n    chapter:\n");
        assert!(check(&doc, schema()).is_empty());
    }

    #[test]
    fn test_duplicates_and_uncovered_document_types() {
        let doc = document("profile:\n  documentTypes: [act, bill]\n  elements:\n    act:\n      structure: [chapter, section, chapter]\n");
        let diagnostics = check(&doc, schema());
        assert_eq!(
            codes(&diagnostics),
            vec![DUPLICATE_STRUCTURE_ENTRY, DOCTYPE_WITHOUT_ELEMENT_RESTRICTION]
        );
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].path, "profile.elements.act.structure[2]");
        assert_eq!(diagnostics[1].severity, Severity::Info);
        assert_eq!(diagnostics[1].path, "profile.documentTypes[1]");
    }
}
