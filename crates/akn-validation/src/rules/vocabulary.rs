//! Every name used in the profile must exist in the schema

use super::{attribute_path, child_path, choice_path, element_path, structure_path};
use crate::suggest::{did_you_mean, nearest};
use akn_profile::{Diagnostic, ElementNode, Fix, ProfileDocument, SourceRange};
use akn_schema::SchemaModel;

pub const UNKNOWN_ELEMENT: &str = "vocabulary.unknown-element";
pub const UNKNOWN_ATTRIBUTE: &str = "vocabulary.unknown-attribute";
pub const UNKNOWN_DOCUMENT_TYPE: &str = "vocabulary.unknown-document-type";

pub fn check(document: &ProfileDocument, schema: &SchemaModel) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    check_document_types(document, schema, &mut out);
    for element in &document.elements {
        check_element(element, schema, &mut out);
    }
    out
}

fn with_suggestion(diagnostic: Diagnostic, suggestion: Option<&str>) -> Diagnostic {
    match suggestion {
        Some(replacement) => diagnostic.with_fix(Fix::ReplaceName {
            replacement: replacement.to_string(),
        }),
        None => diagnostic,
    }
}

fn unknown_element<'a>(
    name: &str,
    path: String,
    range: SourceRange,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Diagnostic {
    positional(name, path, range, nearest(name, candidates))
}

/// Suggestion among the children permitted under `parent`, else any name
fn suggest_child<'s>(schema: &'s SchemaModel, parent: &str, child: &str) -> Option<&'s str> {
    let permitted = schema.children(parent).iter().map(|c| c.name.as_str());
    nearest(child, permitted).or_else(|| nearest(child, schema.element_names()))
}

fn check_document_types(document: &ProfileDocument, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    let mut valid = schema.document_types();
    if valid.is_empty() {
        valid = schema.element_names().collect();
    }
    for (index, entry) in document.metadata.document_types.iter().enumerate() {
        if valid.contains(&entry.name.as_str()) {
            continue;
        }
        let suggestion = nearest(&entry.name, valid.iter().copied());
        out.push(with_suggestion(
            Diagnostic::error(
                UNKNOWN_DOCUMENT_TYPE,
                format!(
                    "'{}' is not a valid document type.{}",
                    entry.name,
                    did_you_mean(suggestion)
                ),
                format!("profile.documentTypes[{index}]"),
                entry.range,
            ),
            suggestion,
        ));
    }
}

fn check_element(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    let name = element.name.as_str();
    let known = schema.has_element(name);

    if known {
        for attribute in &element.attributes {
            if schema.attribute(name, &attribute.name).is_some() {
                continue;
            }
            let suggestion = nearest(
                &attribute.name,
                schema.attributes(name).iter().map(|a| a.name.as_str()),
            );
            out.push(with_suggestion(
                Diagnostic::error(
                    UNKNOWN_ATTRIBUTE,
                    format!(
                        "'{}' is not a valid attribute on <{name}>.{}",
                        attribute.name,
                        did_you_mean(suggestion)
                    ),
                    attribute_path(name, &attribute.name),
                    attribute.range,
                ),
                suggestion,
            ));
        }
    } else {
        out.push(unknown_element(
            name,
            element_path(name),
            element.range,
            schema.element_names(),
        ));
    }

    // children of an unknown parent are still checked against the whole vocabulary
    for entry in &element.children {
        if !schema.has_element(&entry.name) {
            out.push(positional(
                &entry.name,
                child_path(name, &entry.name),
                entry.range,
                suggest_child(schema, name, &entry.name),
            ));
        }
    }
    for entry in &element.choice {
        if !schema.has_element(&entry.name) {
            out.push(positional(
                &entry.name,
                choice_path(name, &entry.name),
                entry.range,
                suggest_child(schema, name, &entry.name),
            ));
        }
    }

    for (index, entry) in element.structure.iter().enumerate() {
        if !schema.has_element(&entry.name) {
            out.push(unknown_element(
                &entry.name,
                structure_path(name, index),
                entry.range,
                schema.element_names(),
            ));
        }
    }
}

fn positional(name: &str, path: String, range: SourceRange, suggestion: Option<&str>) -> Diagnostic {
    with_suggestion(
        Diagnostic::error(
            UNKNOWN_ELEMENT,
            format!("'{name}' is not a known element.{}", did_you_mean(suggestion)),
            path,
            range,
        ),
        suggestion,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixture::{codes, document, schema};

    #[test]
    fn test_unknown_element_with_suggestion() {
        let doc = document("profile:\n  elements:\n    act:\n      children:\n        bdy: 1..1\n    chaptr:\n");
        let diagnostics = check(&doc, schema());
        assert_eq!(codes(&diagnostics), vec![UNKNOWN_ELEMENT, UNKNOWN_ELEMENT]);

        let bdy = &diagnostics[0];
        assert_eq!(bdy.path, "profile.elements.act.children.bdy");
        assert_eq!(bdy.message, "'bdy' is not a known element. Did you mean 'body'?");
        assert_eq!(
            bdy.fix,
            Some(Fix::ReplaceName {
                replacement: "body".to_string()
            })
        );
        assert_eq!(diagnostics[1].path, "profile.elements.chaptr");
    }

    #[test]
    fn test_unknown_attribute_and_document_type() {
        let doc = document(
            "profile:\n  documentTypes: [acts, judgment]\n  elements:\n    act:\n      attributes:\n        nme:\n          required: true\n",
        );
        let diagnostics = check(&doc, schema());
        assert_eq!(
            codes(&diagnostics),
            vec![UNKNOWN_DOCUMENT_TYPE, UNKNOWN_DOCUMENT_TYPE, UNKNOWN_ATTRIBUTE]
        );
        assert!(diagnostics[0].message.ends_with("Did you mean 'act'?"));
        assert_eq!(diagnostics[1].fix, None);
        assert!(diagnostics[2].message.contains("Did you mean 'name'?"));
    }

    #[test]
    fn test_structure_and_choice_entries_are_checked() {
        let doc = document(
            "profile:\n  elements:\n    body:\n      choice:\n        chapter:\n        contnt:\n      structure: [chapter, sektion]\n",
        );
        let diagnostics = check(&doc, schema());
        let paths: Vec<&str> = diagnostics.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "profile.elements.body.children.choice.contnt",
                "profile.elements.body.structure[1]"
            ]
        );
    }

    #[test]
    fn test_known_names_are_silent() {
        let doc = document("profile:\n  documentTypes: [act, bill]\n  elements:\n    act:\n      attributes:\n        name:\n      children:\n        meta:\n");
        assert!(check(&doc, schema()).is_empty());
    }
}
