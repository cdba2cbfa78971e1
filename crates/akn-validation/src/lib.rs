#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # akn-validation
//!
//! Validation of application profiles against a schema model.
//!
//! Six independent rule modules (vocabulary, structure, datatype, identity,
//! strictness, choice) each look at the whole document and return
//! diagnostics. The engine runs them in a fixed order, isolates failures,
//! removes duplicates and sorts the result by source position.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use akn_schema::SchemaLoader;
//! use akn_validation::ValidationEngine;
//!
//! let schema = SchemaLoader::new()
//!     .load_from_file(std::path::Path::new("akomantoso30.xsd"))
//!     .unwrap();
//! let engine = ValidationEngine::new();
//! let result = engine.validate("profile:\n  elements:\n    act:\n", &schema);
//! for diagnostic in &result.diagnostics {
//!     println!("{diagnostic}");
//! }
//! ```

pub mod engine;
pub mod reporter;
pub mod rules;
pub mod suggest;

pub use engine::{ValidationConfig, ValidationEngine, ValidationResult};
pub use reporter::{ReportFormat, ValidationReporter};
pub use rules::RuleModule;

use thiserror::Error;

/// Errors that can occur around validation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown rule module: {0}")]
    UnknownModule(String),

    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to validate profile text with default settings
#[must_use]
pub fn validate(text: &str, schema: &akn_schema::SchemaModel) -> ValidationResult {
    ValidationEngine::new().validate(text, schema)
}

/// Convenience function to validate a profile file
///
/// # Errors
///
/// Returns an error when the file cannot be read.
pub fn validate_file(
    path: &std::path::Path,
    schema: &akn_schema::SchemaModel,
) -> Result<ValidationResult> {
    let text = std::fs::read_to_string(path)?;
    Ok(validate(&text, schema))
}
