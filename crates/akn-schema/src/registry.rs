//! Versioned registry of loaded schema models

use crate::Result;
use crate::model::SchemaModel;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::{debug, trace};

/// Holds exactly one shared model per schema version
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<String, Arc<SchemaModel>>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model unless the version is already present. Returns the
    /// instance held by the registry.
    pub fn register(&self, version: impl Into<String>, model: SchemaModel) -> Arc<SchemaModel> {
        match self.schemas.entry(version.into()) {
            Entry::Occupied(existing) => {
                debug!("Schema version '{}' already registered", existing.key());
                Arc::clone(existing.get())
            }
            Entry::Vacant(slot) => Arc::clone(slot.insert(Arc::new(model)).value()),
        }
    }

    /// Get the model for a version, loading it on first use
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; nothing is registered in that case.
    pub fn get_or_load<F>(&self, version: &str, load: F) -> Result<Arc<SchemaModel>>
    where
        F: FnOnce() -> Result<SchemaModel>,
    {
        if let Some(model) = self.get(version) {
            trace!("Cache hit for schema version: {}", version);
            return Ok(model);
        }
        // loaded without holding the map lock; a concurrent load of the same
        // version loses to whichever model was inserted first
        let model = Arc::new(load()?);
        let entry = self.schemas.entry(version.to_string()).or_insert(model);
        Ok(Arc::clone(entry.value()))
    }

    /// Get a model by version
    #[must_use]
    pub fn get(&self, version: &str) -> Option<Arc<SchemaModel>> {
        self.schemas.get(version).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a version is registered
    #[must_use]
    pub fn contains(&self, version: &str) -> bool {
        self.schemas.contains_key(version)
    }

    /// Registered versions in alphabetical order
    #[must_use]
    pub fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.schemas.iter().map(|e| e.key().clone()).collect();
        versions.sort();
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, SchemaLoader};

    const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="root" type="xs:string"/>
</xs:schema>"#;

    #[test]
    fn test_get_or_load_returns_single_instance() {
        let registry = SchemaRegistry::new();
        let first = registry
            .get_or_load("3.0", || SchemaLoader::new().load_from_str("3.0", XSD))
            .unwrap();
        let second = registry
            .get_or_load("3.0", || panic!("loader must not run twice"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.versions(), vec!["3.0".to_string()]);
    }

    #[test]
    fn test_loader_may_use_the_registry() {
        let registry = SchemaRegistry::new();
        let model = registry
            .get_or_load("3.0", || {
                assert!(!registry.contains("3.0"));
                assert!(registry.get("3.0").is_none());
                SchemaLoader::new().load_from_str("3.0", XSD)
            })
            .unwrap();
        assert!(Arc::ptr_eq(&model, &registry.get("3.0").unwrap()));
    }

    #[test]
    fn test_failed_load_is_not_registered() {
        let registry = SchemaRegistry::new();
        let result = registry.get_or_load("broken", || Err(Error::NotFound("x.xsd".into())));
        assert!(result.is_err());
        assert!(!registry.contains("broken"));
    }

    #[test]
    fn test_register_keeps_existing_instance() {
        let registry = SchemaRegistry::new();
        let loader = SchemaLoader::new();
        let first = registry.register("v", loader.load_from_str("v", XSD).unwrap());
        let second = registry.register("v", loader.load_from_str("v", XSD).unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.get("v").is_some());
    }
}
