#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # akn-profile
//!
//! In-memory model of a YAML application profile and the plumbing shared by
//! every engine feature: source positions, diagnostics and text deltas.
//!
//! A profile restricts a structural schema. It has the shape
//!
//! ```yaml
//! profile:
//!   name: Acts only
//!   documentTypes: [act]
//!   elements:
//!     act:
//!       attributes:
//!         name: { required: true }
//!       children:
//!         meta: 1..1
//!         body: 1..1
//! ```

/// Cardinality strings such as `1..1` or `0..*`.
pub mod cardinality;
/// Line-range replacements between two versions of a document.
pub mod delta;
/// Diagnostics produced while parsing or validating a document.
pub mod diagnostic;
/// The profile document tree.
pub mod document;
/// YAML text to [`ProfileDocument`] adapter.
pub mod parser;
/// Source positions.
pub mod position;
/// Canonical YAML rendering.
pub mod writer;

pub use cardinality::Cardinality;
pub use delta::{Delta, TextEdit};
pub use diagnostic::{Diagnostic, Fix, Severity};
pub use document::{
    AttributeNode, ChildEntry, ElementNode, NamedEntry, ProfileDocument, ProfileMetadata,
};
pub use parser::{ParseOutcome, parse, parse_document};
pub use position::{Position, SourceRange};
pub use writer::{render, render_with_header};

use thiserror::Error;

/// Errors that can occur when working with profile documents
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid cardinality '{value}': {reason}")]
    InvalidCardinality { value: String, reason: String },

    #[error("Malformed profile document: {0}")]
    Malformed(String),
}

impl Error {
    /// Build an invalid-cardinality error with the offending text.
    pub fn invalid_cardinality(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCardinality {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for profile operations.
pub type Result<T> = std::result::Result<T, Error>;
