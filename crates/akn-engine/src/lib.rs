#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # akn-engine
//!
//! Ties the schema model, the validator and the cascade operations to a set
//! of open documents.
//!
//! Every open document carries a version that each update bumps. Results
//! are tagged with the version they were computed from, and
//! [`Engine::publish`] drops those that a later update made stale. There is
//! no cancellation: stale work simply finishes and is discarded.

pub mod config;
pub mod engine;
pub mod state;

pub use config::{EngineConfig, LoggingConfig, SchemaConfig};
pub use engine::Engine;
pub use state::{DocumentState, Versioned};

use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Document not open: {0}")]
    NotOpen(String),

    #[error("Configuration error in '{path}': {message}")]
    Config { path: String, message: String },

    #[error("No schema configured")]
    NoSchema,

    #[error("Background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Schema(#[from] akn_schema::Error),

    #[error(transparent)]
    Validation(#[from] akn_validation::Error),

    #[error(transparent)]
    Cascade(#[from] akn_cascade::CascadeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error naming the file it came from.
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
