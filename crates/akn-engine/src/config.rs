//! Engine configuration
//!
//! Read from a YAML file; every section and field is optional.
//!
//! ```yaml
//! schema:
//!   path: schemas/akomantoso30.xsd
//!   version: akn-3.0
//!   document_root: akomaNtoso
//!   identity_attributes: [eId, wId, GUID]
//! expansion:
//!   identity_attributes: [eId]
//!   identity_required: false
//!   max_depth: 64
//!   cycle_policy: once_per_expansion
//! validation:
//!   disabled_modules: [identity]
//!   max_diagnostics: 200
//! logging:
//!   filter: info
//! ```

use crate::{Error, Result};
use akn_cascade::ExpansionOptions;
use akn_schema::{SchemaLoader, SchemaModel, SchemaOptions, SchemaRegistry};
use akn_validation::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub schema: SchemaConfig,
    pub expansion: ExpansionOptions,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

/// Where the schema comes from and how it is interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// XSD file to load
    pub path: Option<PathBuf>,

    /// Registry key; defaults to the file stem
    pub version: Option<String>,

    pub document_root: Option<String>,

    pub identity_attributes: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        let options = SchemaOptions::default();
        Self {
            path: None,
            version: None,
            document_root: options.document_root,
            identity_attributes: options.identity_attributes,
        }
    }
}

impl SchemaConfig {
    /// Loader options derived from this section
    #[must_use]
    pub fn options(&self) -> SchemaOptions {
        SchemaOptions {
            document_root: self.document_root.clone(),
            identity_attributes: self.identity_attributes.clone(),
        }
    }

    /// Registry key of the configured schema
    #[must_use]
    pub fn version_label(&self) -> Option<String> {
        self.version.clone().or_else(|| {
            self.path
                .as_deref()
                .and_then(Path::file_stem)
                .map(|stem| stem.to_string_lossy().into_owned())
        })
    }

    /// Load the configured schema through `registry`, reusing a model
    /// already registered under the same version
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSchema`] without a path, or the loader's error.
    pub fn load(&self, registry: &SchemaRegistry) -> Result<Arc<SchemaModel>> {
        let Some(path) = self.path.as_deref() else {
            return Err(Error::NoSchema);
        };
        let version = self.version_label().unwrap_or_default();
        let loader = SchemaLoader::with_options(self.options());
        Ok(registry.get_or_load(&version, || loader.load_from_file(path))?)
    }
}

/// Logging setup used by the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration text
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid YAML or unknown fields.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| Error::config("<inline>", e.to_string()))
    }

    /// Read configuration from a file. A relative schema path is resolved
    /// against the directory of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be read and
    /// [`Error::Config`] when it does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&text).map_err(|e| match e {
            Error::Config { message, .. } => Error::config(path.display().to_string(), message),
            other => other,
        })?;
        if let (Some(schema_path), Some(dir)) = (config.schema.path.as_mut(), path.parent()) {
            if schema_path.is_relative() {
                *schema_path = dir.join(&*schema_path);
            }
        }
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}
