//! Validation engine

use crate::rules::{self, RuleModule};
use crate::{Error, Result};
use akn_profile::{Diagnostic, ProfileDocument, Severity, parse};
use akn_schema::SchemaModel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error};

/// Validation configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Rule modules to skip, by family name
    pub disabled_modules: Vec<String>,

    /// Maximum diagnostics returned (0 = unlimited)
    pub max_diagnostics: usize,
}

/// Outcome of validating one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Sorted, de-duplicated diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Whether no error-level diagnostic was produced
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Diagnostics carrying a given code
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }
}

/// Main validation engine
pub struct ValidationEngine {
    modules: Vec<RuleModule>,
    config: ValidationConfig,
}

impl ValidationEngine {
    /// Create an engine running every rule module
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: rules::builtin(),
            config: ValidationConfig::default(),
        }
    }

    /// Create with specific configuration
    ///
    /// # Errors
    ///
    /// Returns an error when a disabled module name is not a rule family.
    pub fn with_config(config: ValidationConfig) -> Result<Self> {
        let mut modules = rules::builtin();
        for name in &config.disabled_modules {
            if !modules.iter().any(|m| m.name == name) {
                return Err(Error::UnknownModule(name.clone()));
            }
        }
        modules.retain(|m| !config.disabled_modules.iter().any(|d| d == m.name));
        Ok(Self { modules, config })
    }

    /// Names of the active rule modules in execution order
    pub fn module_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modules.iter().map(|m| m.name)
    }

    /// Parse and validate profile text
    #[must_use]
    pub fn validate(&self, text: &str, schema: &SchemaModel) -> ValidationResult {
        let outcome = parse(text);
        let mut diagnostics = outcome.diagnostics;
        if let Some(document) = outcome.document {
            diagnostics.extend(self.collect(&document, schema));
        }
        self.finish(diagnostics)
    }

    /// Run the rule modules on an already parsed document
    #[must_use]
    pub fn run_rules(&self, document: &ProfileDocument, schema: &SchemaModel) -> Vec<Diagnostic> {
        self.finish(self.collect(document, schema)).diagnostics
    }

    fn collect(&self, document: &ProfileDocument, schema: &SchemaModel) -> Vec<Diagnostic> {
        let mut all = Vec::new();
        for module in &self.modules {
            // a failing module is isolated and contributes nothing
            match catch_unwind(AssertUnwindSafe(|| (module.check)(document, schema))) {
                Ok(found) => {
                    debug!("Rule module {} produced {} diagnostics", module.name, found.len());
                    all.extend(found);
                }
                Err(payload) => {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!("Rule module {} panicked: {}", module.name, reason);
                }
            }
        }
        all
    }

    fn priority(&self, diagnostic: &Diagnostic) -> u8 {
        let family = diagnostic.family();
        self.modules
            .iter()
            .find(|m| m.name == family)
            .map_or(0, |m| m.priority)
    }

    fn finish(&self, diagnostics: Vec<Diagnostic>) -> ValidationResult {
        let mut seen = HashSet::new();
        let mut diagnostics: Vec<Diagnostic> = diagnostics
            .into_iter()
            .filter(|d| seen.insert((d.code.clone(), d.path.clone(), d.message.clone())))
            .collect();

        diagnostics.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then_with(|| self.priority(a).cmp(&self.priority(b)))
                .then_with(|| a.code.cmp(&b.code))
                .then_with(|| a.message.cmp(&b.message))
        });
        if self.config.max_diagnostics > 0 {
            diagnostics.truncate(self.config.max_diagnostics);
        }
        ValidationResult { diagnostics }
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}
