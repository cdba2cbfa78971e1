//! Minimum viable profile generation

use crate::expand::expand_element;
use crate::options::{ExpansionOptions, GenerateOptions};
use crate::{CascadeError, Result};
use akn_profile::{NamedEntry, ProfileDocument, ProfileMetadata, render_with_header};
use akn_schema::SchemaModel;
use tracing::{debug, info};

/// Build the smallest profile for `root` that validates without errors.
///
/// The root is expanded first, then every defined element is expanded again
/// until a pass leaves the document unchanged.
///
/// # Errors
///
/// Returns [`CascadeError::UnknownType`] for a root the schema does not
/// declare and [`CascadeError::NoFixedPoint`] when `options.max_passes`
/// passes still change the document.
pub fn generate(
    schema: &SchemaModel,
    root: &str,
    options: &GenerateOptions,
) -> Result<ProfileDocument> {
    if !schema.has_element(root) {
        return Err(CascadeError::UnknownType(root.to_string()));
    }
    let expansion = ExpansionOptions {
        include_optional_attributes: options.include_optional_attributes
            || options.expansion.include_optional_attributes,
        ..options.expansion.clone()
    };

    let mut document = ProfileDocument {
        metadata: ProfileMetadata {
            name: Some(format!("Minimum viable profile ({root})")),
            version: Some("1.0".to_string()),
            description: Some(format!(
                "Generated from schema {} with every required element of <{root}>",
                schema.version()
            )),
            document_types: Vec::new(),
        },
        ..ProfileDocument::default()
    };
    document = expand_element(schema, &document, root, &expansion)?;

    let mut passes = 0;
    loop {
        if passes == options.max_passes {
            return Err(CascadeError::NoFixedPoint(options.max_passes));
        }
        passes += 1;
        let previous = document.clone();
        let defined: Vec<String> = previous.element_names().map(ToString::to_string).collect();
        for name in defined.iter().filter(|n| schema.has_element(n)) {
            document = expand_element(schema, &document, name, &expansion)?;
        }
        if document == previous {
            break;
        }
        debug!("Generation pass {passes} changed the document");
    }

    let types: Vec<&str> = if schema.document_types().contains(&root) {
        vec![root]
    } else {
        schema
            .document_types()
            .into_iter()
            .filter(|t| document.has_element(t))
            .collect()
    };
    document.metadata.document_types = types.into_iter().map(NamedEntry::new).collect();

    info!(
        "Generated profile for <{}>: {} elements in {} pass(es)",
        root,
        document.elements.len(),
        passes
    );
    Ok(document)
}

/// [`generate`] rendered as canonical YAML with an explanatory header
///
/// # Errors
///
/// Same as [`generate`].
pub fn generate_text(schema: &SchemaModel, root: &str, options: &GenerateOptions) -> Result<String> {
    let document = generate(schema, root, options)?;
    let title = format!("Minimum viable profile for <{root}>");
    let source = format!("Generated from schema {}", schema.version());
    Ok(render_with_header(
        &document,
        &[title.as_str(), source.as_str()],
    ))
}
