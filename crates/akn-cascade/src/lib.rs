#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # akn-cascade
//!
//! Structural edits on profile documents that follow the schema.
//!
//! - [`expand_element`] adds an element with everything the schema requires
//!   beneath it, recursively.
//! - [`collapse_element`] removes an element and the descendants nothing
//!   else needs.
//! - [`reorder`] puts elements, children and attributes in canonical order.
//! - [`add_identity_attributes`] / [`remove_identity_attributes`] edit
//!   identity attributes in bulk.
//! - [`generate`] builds a minimum viable profile for a root type.
//!
//! Every operation takes the document by reference and returns a new one;
//! the `*_text` wrappers return a [`akn_profile::Delta`] against the source
//! text instead.

pub mod collapse;
pub mod expand;
pub mod generate;
pub mod identity;
pub mod options;
pub mod ordering;
pub mod text;

pub use collapse::collapse_element;
pub use expand::expand_element;
pub use generate::{generate, generate_text};
pub use identity::{IdentityChange, IdentityReport, add_identity_attributes, remove_identity_attributes};
pub use options::{CyclePolicy, ExpansionOptions, GenerateOptions};
pub use ordering::reorder;
pub use text::{add_identity_text, collapse_text, expand_text, remove_identity_text, reorder_text};

use thiserror::Error;

/// Errors that can occur during cascade operations
#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("Unknown element type '{0}'")]
    UnknownType(String),

    #[error("Expanding '{element}' went deeper than the limit of {max_depth} levels")]
    DepthExceeded { element: String, max_depth: usize },

    #[error("Generation did not reach a fixed point after {0} passes")]
    NoFixedPoint(usize),

    #[error(transparent)]
    Document(#[from] akn_profile::Error),
}

pub type Result<T> = std::result::Result<T, CascadeError>;

#[cfg(test)]
pub(crate) mod fixture {
    use akn_schema::{SchemaLoader, SchemaModel};
    use std::path::Path;
    use std::sync::OnceLock;

    pub(crate) fn schema() -> &'static SchemaModel {
        static SCHEMA: OnceLock<SchemaModel> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let path = Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("../akn-schema/tests/data/mini_akn.xsd");
            SchemaLoader::new().load_from_file(&path).unwrap()
        })
    }

    pub(crate) fn document(text: &str) -> akn_profile::ProfileDocument {
        akn_profile::parse_document(text).unwrap()
    }

    pub(crate) fn names(document: &akn_profile::ProfileDocument) -> Vec<&str> {
        document.element_names().collect()
    }
}
