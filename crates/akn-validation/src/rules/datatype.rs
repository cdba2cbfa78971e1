//! Attribute value restrictions must stay inside the schema datatype

use super::attribute_path;
use akn_profile::{Diagnostic, ProfileDocument};
use akn_schema::{AttributeKind, SchemaModel};

pub const INVALID_ENUM_VALUE: &str = "datatype.invalid-enum-value";
pub const PATTERN_MISMATCH: &str = "datatype.pattern-mismatch";

pub fn check(document: &ProfileDocument, schema: &SchemaModel) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for element in &document.elements {
        for attribute in &element.attributes {
            let Some(declared) = schema.attribute(&element.name, &attribute.name) else {
                continue;
            };
            let path = attribute_path(&element.name, &attribute.name);

            for (index, value) in attribute.values.iter().enumerate() {
                let value_path = format!("{path}.values[{index}]");
                match &declared.kind {
                    AttributeKind::Enumeration { values } => {
                        if !values.contains(&value.name) {
                            out.push(Diagnostic::error(
                                INVALID_ENUM_VALUE,
                                format!(
                                    "'{}' is not a valid value for attribute '{}' on <{}>. Allowed: {}",
                                    value.name,
                                    attribute.name,
                                    element.name,
                                    values.join(", ")
                                ),
                                value_path,
                                value.range,
                            ));
                        }
                    }
                    AttributeKind::Pattern { pattern } => {
                        if pattern.is_match(&value.name) == Some(false) {
                            out.push(Diagnostic::error(
                                PATTERN_MISMATCH,
                                format!(
                                    "'{}' does not match the pattern /{}/ of attribute '{}' on <{}>.",
                                    value.name,
                                    pattern.source(),
                                    attribute.name,
                                    element.name
                                ),
                                value_path,
                                value.range,
                            ));
                        }
                    }
                    // a profile may narrow free text to its own value list
                    AttributeKind::FreeText { .. } => {}
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixture::{codes, document, schema};

    #[test]
    fn test_enumeration_subset() {
        let doc = document("profile:\n  elements:\n    act:\n      attributes:\n        contains:\n          values: [singleVersion, draftVersion]\n");
        let diagnostics = check(&doc, schema());
        assert_eq!(codes(&diagnostics), vec![INVALID_ENUM_VALUE]);
        assert_eq!(diagnostics[0].path, "profile.elements.act.attributes.contains.values[1]");
        assert!(diagnostics[0].message.contains("originalVersion, singleVersion, multipleVersions"));
    }

    #[test]
    fn test_pattern_and_inherited_enumeration() {
        let doc = document("profile:\n  elements:\n    chapter:\n      attributes:\n        eId:\n          values: [chp_1, \"chp 2\"]\n        status:\n          values: [removed, pending]\n");
        let diagnostics = check(&doc, schema());
        assert_eq!(codes(&diagnostics), vec![PATTERN_MISMATCH, INVALID_ENUM_VALUE]);
        assert_eq!(diagnostics[0].path, "profile.elements.chapter.attributes.eId.values[1]");
        assert_eq!(diagnostics[1].path, "profile.elements.chapter.attributes.status.values[1]");
    }

    #[test]
    fn test_custom_values_on_free_text_are_silent() {
        let doc = document("profile:\n  elements:\n    act:\n      attributes:\n        name:\n          required: true\n          values: [act, decree]\n");
        assert!(check(&doc, schema()).is_empty());
    }
}
