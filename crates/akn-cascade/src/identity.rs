//! Bulk edits of identity attributes (`eId`, `wId`, `GUID`)

use crate::expand::attribute_node;
use crate::ordering::reorder;
use akn_profile::ProfileDocument;
use akn_schema::SchemaModel;
use serde::Serialize;
use tracing::debug;

/// One attribute touched on one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityChange {
    pub element: String,
    pub attribute: String,
}

/// Outcome of [`remove_identity_attributes`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityReport {
    /// Attributes taken out of the profile
    pub removed: Vec<IdentityChange>,
    /// Attributes left in place because the schema makes them mandatory
    pub retained: Vec<IdentityChange>,
}

/// Add the named identity attributes to every defined element whose schema
/// type supports them. Names that are not identity attributes are ignored.
///
/// Attributes the schema makes mandatory are always marked required. An
/// element that gains its first attributes block also gets the schema's
/// other required attributes, so the block stays complete.
#[must_use]
pub fn add_identity_attributes(
    schema: &SchemaModel,
    document: &ProfileDocument,
    names: &[String],
    required: bool,
) -> ProfileDocument {
    let names: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| schema.is_identity_attribute(n))
        .collect();

    let mut updated = document.clone();
    for element in &mut updated.elements {
        let Some(element_type) = schema.element(&element.name) else {
            continue;
        };
        let supported: Vec<_> = names
            .iter()
            .filter_map(|n| element_type.attribute(n))
            .collect();
        if supported.is_empty() {
            continue;
        }

        if element.attributes.is_empty() {
            element.attributes.extend(
                element_type
                    .required_attributes()
                    .filter(|a| !names.contains(&a.name.as_str()))
                    .map(|a| attribute_node(a, true)),
            );
        }
        for attribute in supported {
            let mandatory = required || attribute.required;
            match element
                .attributes
                .iter_mut()
                .find(|a| a.name == attribute.name)
            {
                Some(existing) => existing.required |= mandatory,
                None => element.attributes.push(attribute_node(attribute, mandatory)),
            }
        }
    }
    debug!("Added identity attributes {:?}", names);
    reorder(schema, &updated)
}

/// Remove the named identity attributes from every element, except where
/// the schema makes them mandatory.
#[must_use]
pub fn remove_identity_attributes(
    schema: &SchemaModel,
    document: &ProfileDocument,
    names: &[String],
) -> (ProfileDocument, IdentityReport) {
    let mut report = IdentityReport::default();
    let mut updated = document.clone();
    for element in &mut updated.elements {
        for name in names.iter().filter(|n| schema.is_identity_attribute(n)) {
            if element.attribute(name).is_none() {
                continue;
            }
            let change = IdentityChange {
                element: element.name.clone(),
                attribute: name.clone(),
            };
            let mandatory = schema
                .attribute(&element.name, name)
                .is_some_and(|a| a.required);
            if mandatory {
                report.retained.push(change);
            } else {
                element.attributes.retain(|a| &a.name != name);
                report.removed.push(change);
            }
        }
    }
    debug!(
        "Removed {} identity attribute(s), retained {}",
        report.removed.len(),
        report.retained.len()
    );
    (updated, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::document;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_add_to_supporting_elements_only() {
        let doc = document("profile:\n  elements:\n    act:\n    meta:\n    chapter:\n");
        let doc = add_identity_attributes(crate::fixture::schema(), &doc, &names(&["eId", "name"]), false);

        let act = doc.element("act").unwrap();
        assert!(!act.attribute("eId").unwrap().required);
        // new attributes block carries the other required attributes
        assert!(act.attribute("name").unwrap().required);
        assert_eq!(act.attributes[0].name, "name");

        assert!(doc.element("meta").unwrap().attributes.is_empty());
        assert!(doc.element("chapter").unwrap().attribute("eId").unwrap().required);
    }

    #[test]
    fn test_add_upgrades_existing_attribute() {
        let doc = document(
            "profile:\n  elements:\n    p:\n      attributes:\n        eId:\n          required: false\n",
        );
        let doc = add_identity_attributes(crate::fixture::schema(), &doc, &names(&["eId", "wId"]), true);
        let p = doc.element("p").unwrap();
        assert!(p.attribute("eId").unwrap().required);
        assert!(p.attribute("wId").unwrap().required);
        assert_eq!(p.attributes.len(), 2);
    }

    #[test]
    fn test_remove_retains_mandatory_identity() {
        let doc = document(
            "profile:\n  elements:\n    chapter:\n      attributes:\n        eId:\n          required: true\n        wId:\n          required: false\n    item:\n      attributes:\n        eId:\n          required: true\n    p:\n      attributes:\n        eId:\n          required: false\n        class:\n          required: false\n",
        );
        let (doc, report) =
            remove_identity_attributes(crate::fixture::schema(), &doc, &names(&["eId", "wId", "class"]));

        let retained: Vec<(&str, &str)> = report
            .retained
            .iter()
            .map(|c| (c.element.as_str(), c.attribute.as_str()))
            .collect();
        assert_eq!(retained, vec![("chapter", "eId"), ("item", "eId")]);
        let removed: Vec<(&str, &str)> = report
            .removed
            .iter()
            .map(|c| (c.element.as_str(), c.attribute.as_str()))
            .collect();
        assert_eq!(removed, vec![("chapter", "wId"), ("p", "eId")]);

        assert!(doc.element("chapter").unwrap().attribute("eId").is_some());
        assert!(doc.element("item").unwrap().attribute("eId").is_some());
        // not an identity attribute
        assert!(doc.element("p").unwrap().attribute("class").is_some());
    }
}
