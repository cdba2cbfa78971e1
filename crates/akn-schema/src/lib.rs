#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # akn-schema
//!
//! Queryable model of a structural XML schema (Akoma Ntoso 3.0 or any XSD
//! shaped like it).
//!
//! The loader resolves element, group, attribute group and simple type
//! references, flattens inheritance, normalizes nested `xs:choice`
//! constructs into shared [`ChoiceGroup`] values and marks recursive child
//! references. The resulting [`SchemaModel`] is immutable and meant to be
//! shared behind an `Arc`.

mod choice;
pub mod loader;
pub mod model;
pub mod registry;
mod xsd;

pub use loader::SchemaLoader;
pub use model::{
    AttributeKind, AttributeType, ChildRef, ChoiceBranch, ChoiceGroup, ChoiceUse, ElementType,
    Occurs, PatternFacet, SchemaModel, SchemaOptions,
};
pub use registry::SchemaRegistry;

use thiserror::Error;

/// Errors that can occur while loading a schema
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Unresolved {kind} reference '{name}' in '{referenced_from}'")]
    Unresolved {
        kind: &'static str,
        name: String,
        referenced_from: String,
    },

    #[error("Circular type derivation: {0}")]
    Derivation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unresolved-reference error naming the missing declaration.
    pub fn unresolved(
        kind: &'static str,
        name: impl Into<String>,
        referenced_from: impl Into<String>,
    ) -> Self {
        Self::Unresolved {
            kind,
            name: name.into(),
            referenced_from: referenced_from.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
