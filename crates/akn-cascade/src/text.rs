//! Text-level wrappers
//!
//! Each wrapper parses the profile text, applies one operation and returns
//! the [`Delta`] turning the text into the canonical rendering of the
//! result. Text that does not parse cleanly yields an empty delta, so a
//! broken document is never rewritten. That includes keys the profile
//! model does not carry: rendering would drop them. Blank text counts as
//! an empty document.

use crate::collapse::collapse_element;
use crate::expand::expand_element;
use crate::identity::{IdentityReport, add_identity_attributes, remove_identity_attributes};
use crate::options::ExpansionOptions;
use crate::ordering::reorder;
use crate::Result;
use akn_profile::parser::{INVALID_SHAPE, is_blank};
use akn_profile::{Delta, ProfileDocument, Severity, parse, render};
use akn_schema::SchemaModel;
use tracing::debug;

/// Parse `text` for editing, `None` when it has syntax errors or content
/// the canonical rendering would lose
fn load(text: &str) -> Option<ProfileDocument> {
    if is_blank(text) {
        return Some(ProfileDocument::new());
    }
    let outcome = parse(text);
    if outcome
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error || d.code == INVALID_SHAPE)
    {
        debug!(
            "Not editing a document with {} parse diagnostic(s)",
            outcome.diagnostics.len()
        );
        return None;
    }
    outcome.document
}

fn delta(text: &str, updated: &ProfileDocument) -> Delta {
    Delta::compute(text, &render(updated))
}

/// Delta expanding `element_type` in `text`
///
/// # Errors
///
/// See [`expand_element`].
pub fn expand_text(
    schema: &SchemaModel,
    text: &str,
    element_type: &str,
    options: &ExpansionOptions,
) -> Result<Delta> {
    let Some(document) = load(text) else {
        return Ok(Delta::empty());
    };
    let updated = expand_element(schema, &document, element_type, options)?;
    Ok(delta(text, &updated))
}

/// Delta collapsing `element_type` in `text`
///
/// # Errors
///
/// See [`collapse_element`].
pub fn collapse_text(schema: &SchemaModel, text: &str, element_type: &str) -> Result<Delta> {
    let Some(document) = load(text) else {
        return Ok(Delta::empty());
    };
    let updated = collapse_element(schema, &document, element_type)?;
    Ok(delta(text, &updated))
}

/// Delta putting `text` in canonical order
#[must_use]
pub fn reorder_text(schema: &SchemaModel, text: &str) -> Delta {
    load(text).map_or_else(Delta::empty, |document| {
        delta(text, &reorder(schema, &document))
    })
}

/// Delta adding identity attributes to `text`
#[must_use]
pub fn add_identity_text(
    schema: &SchemaModel,
    text: &str,
    names: &[String],
    required: bool,
) -> Delta {
    load(text).map_or_else(Delta::empty, |document| {
        delta(text, &add_identity_attributes(schema, &document, names, required))
    })
}

/// Delta removing identity attributes from `text`, with the report of what
/// was removed and retained
#[must_use]
pub fn remove_identity_text(
    schema: &SchemaModel,
    text: &str,
    names: &[String],
) -> (Delta, IdentityReport) {
    let Some(document) = load(text) else {
        return (Delta::empty(), IdentityReport::default());
    };
    let (updated, report) = remove_identity_attributes(schema, &document, names);
    (delta(text, &updated), report)
}
