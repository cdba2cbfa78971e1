//! Engine over open documents

use crate::config::EngineConfig;
use crate::state::{DocumentState, Versioned};
use crate::{Error, Result};
use akn_cascade::{
    GenerateOptions, IdentityReport, add_identity_text, collapse_text, expand_text,
    generate_text, remove_identity_text, reorder_text,
};
use akn_profile::Delta;
use akn_schema::{SchemaModel, SchemaRegistry};
use akn_validation::{ValidationEngine, ValidationResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::{debug, info};

/// Validation and editing services for a set of open documents sharing one
/// schema
pub struct Engine {
    schema: Arc<SchemaModel>,
    config: EngineConfig,
    validator: Arc<ValidationEngine>,
    documents: DashMap<String, DocumentState>,
    /// Last version of each closed document, so reopening never reuses one
    closed: DashMap<String, u64>,
}

impl Engine {
    /// Create an engine over an already loaded schema
    ///
    /// # Errors
    ///
    /// Returns an error when the validation section names an unknown rule
    /// module.
    pub fn new(schema: Arc<SchemaModel>, config: EngineConfig) -> Result<Self> {
        let validator = ValidationEngine::with_config(config.validation.clone())?;
        info!(
            "Engine ready on schema '{}' ({} elements)",
            schema.version(),
            schema.element_count()
        );
        Ok(Self {
            schema,
            config,
            validator: Arc::new(validator),
            documents: DashMap::new(),
            closed: DashMap::new(),
        })
    }

    /// Load the configured schema through `registry` and create an engine
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be loaded or the validation
    /// section is invalid.
    pub fn from_config(config: EngineConfig, registry: &SchemaRegistry) -> Result<Self> {
        let schema = config.schema.load(registry)?;
        Self::new(schema, config)
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a document, or replace the text of one already open. Returns
    /// the new version.
    pub fn open(&self, uri: impl Into<String>, text: impl Into<String>) -> u64 {
        match self.documents.entry(uri.into()) {
            Entry::Occupied(mut existing) => existing.get_mut().update(text),
            Entry::Vacant(slot) => {
                debug!("Opened {}", slot.key());
                let state = match self.closed.remove(slot.key()) {
                    Some((_, closed_at)) => DocumentState::reopened(text, closed_at),
                    None => DocumentState::new(text),
                };
                slot.insert(state).version
            }
        }
    }

    /// Replace the text of an open document. Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] for unknown documents.
    pub fn update(&self, uri: &str, text: impl Into<String>) -> Result<u64> {
        let mut state = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| Error::NotOpen(uri.to_string()))?;
        Ok(state.update(text))
    }

    /// Forget a document's text. Returns whether it was open.
    pub fn close(&self, uri: &str) -> bool {
        match self.documents.remove(uri) {
            Some((uri, state)) => {
                self.closed.insert(uri, state.version);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_open(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    /// Current text of a document with its version
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] for unknown documents.
    pub fn snapshot(&self, uri: &str) -> Result<Versioned<String>> {
        let state = self
            .documents
            .get(uri)
            .ok_or_else(|| Error::NotOpen(uri.to_string()))?;
        Ok(Versioned::new(uri, state.version, state.text.clone()))
    }

    /// Whether `version` is still the current version of `uri`
    #[must_use]
    pub fn is_current(&self, uri: &str, version: u64) -> bool {
        self.documents
            .get(uri)
            .is_some_and(|state| state.version == version)
    }

    /// Pass a result through if it was computed from the current version
    pub fn publish<T>(&self, result: Versioned<T>) -> Option<Versioned<T>> {
        if self.is_current(&result.uri, result.version) {
            Some(result)
        } else {
            debug!(
                "Dropping stale result for {} version {}",
                result.uri, result.version
            );
            None
        }
    }

    /// Validate the current text of a document
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] for unknown documents.
    pub fn validate(&self, uri: &str) -> Result<Versioned<ValidationResult>> {
        let snapshot = self.snapshot(uri)?;
        let schema = &self.schema;
        Ok(snapshot.map(|text| self.validator.validate(&text, schema)))
    }

    /// Validate on the blocking pool. Resolves to `None` when the document
    /// changed while the rules ran.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] for unknown documents and [`Error::Task`]
    /// when the blocking task fails.
    pub async fn validate_async(&self, uri: &str) -> Result<Option<Versioned<ValidationResult>>> {
        let snapshot = self.snapshot(uri)?;
        let schema = Arc::clone(&self.schema);
        let validator = Arc::clone(&self.validator);
        let result = tokio::task::spawn_blocking(move || {
            snapshot.map(|text| validator.validate(&text, &schema))
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?;
        Ok(self.publish(result))
    }

    /// Delta expanding `element_type` in a document
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] or the cascade error.
    pub fn expand(&self, uri: &str, element_type: &str) -> Result<Versioned<Delta>> {
        let snapshot = self.snapshot(uri)?;
        let delta = expand_text(
            &self.schema,
            &snapshot.value,
            element_type,
            &self.config.expansion,
        )?;
        Ok(snapshot.map(|_| delta))
    }

    /// Delta collapsing `element_type` in a document
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] or the cascade error.
    pub fn collapse(&self, uri: &str, element_type: &str) -> Result<Versioned<Delta>> {
        let snapshot = self.snapshot(uri)?;
        let delta = collapse_text(&self.schema, &snapshot.value, element_type)?;
        Ok(snapshot.map(|_| delta))
    }

    /// Delta putting a document in canonical order
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] for unknown documents.
    pub fn reorder(&self, uri: &str) -> Result<Versioned<Delta>> {
        let snapshot = self.snapshot(uri)?;
        let delta = reorder_text(&self.schema, &snapshot.value);
        Ok(snapshot.map(|_| delta))
    }

    /// Delta adding identity attributes to a document
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] for unknown documents.
    pub fn add_identity(
        &self,
        uri: &str,
        names: &[String],
        required: bool,
    ) -> Result<Versioned<Delta>> {
        let snapshot = self.snapshot(uri)?;
        let delta = add_identity_text(&self.schema, &snapshot.value, names, required);
        Ok(snapshot.map(|_| delta))
    }

    /// Delta removing identity attributes from a document
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] for unknown documents.
    pub fn remove_identity(
        &self,
        uri: &str,
        names: &[String],
    ) -> Result<Versioned<(Delta, IdentityReport)>> {
        let snapshot = self.snapshot(uri)?;
        let outcome = remove_identity_text(&self.schema, &snapshot.value, names);
        Ok(snapshot.map(|_| outcome))
    }

    /// Minimum viable profile for `root` as text
    ///
    /// # Errors
    ///
    /// Returns the cascade error for unknown roots.
    pub fn generate(&self, root: &str, include_optional_attributes: bool) -> Result<String> {
        let options = GenerateOptions {
            expansion: self.config.expansion.clone(),
            include_optional_attributes,
            ..GenerateOptions::default()
        };
        Ok(generate_text(&self.schema, root, &options)?)
    }

    /// Apply an edit computed from the current version. Returns the new
    /// version, or `None` when the edit is stale or empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] for unknown documents.
    pub fn apply(&self, edit: &Versioned<Delta>) -> Result<Option<u64>> {
        let mut state = self
            .documents
            .get_mut(&edit.uri)
            .ok_or_else(|| Error::NotOpen(edit.uri.clone()))?;
        if state.version != edit.version || edit.value.is_empty() {
            return Ok(None);
        }
        let text = edit.value.apply(&state.text);
        Ok(Some(state.update(text)))
    }
}
