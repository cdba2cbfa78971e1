//! Diagnostics attached to positions in a profile document
#![allow(clippy::must_use_candidate)] // Constructor helpers are clear at call sites without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent setters are designed for chaining.

use crate::position::SourceRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// Machine-applicable suggestion carried by a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fix {
    /// Replace the offending name
    ReplaceName { replacement: String },
    /// Run a cascade expansion of an element
    ExpandElement { element: String },
    /// Add a child reference to a parent
    AddChild { parent: String, child: String },
    /// Drop an entry from its block
    RemoveEntry { name: String },
}

/// A single finding about a profile document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Namespaced rule code, e.g. `vocabulary.unknown-element`
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Severity level
    pub severity: Severity,

    /// Dotted path to the affected node, e.g. `profile.elements.act.children`
    pub path: String,

    /// Location in the source text
    pub range: SourceRange,

    /// Suggested fix (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        path: impl Into<String>,
        range: SourceRange,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
            path: path.into(),
            range,
            fix: None,
        }
    }

    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
        path: impl Into<String>,
        range: SourceRange,
    ) -> Self {
        Self::new(code, message, Severity::Error, path, range)
    }

    pub fn warning(
        code: impl Into<String>,
        message: impl Into<String>,
        path: impl Into<String>,
        range: SourceRange,
    ) -> Self {
        Self::new(code, message, Severity::Warning, path, range)
    }

    pub fn info(
        code: impl Into<String>,
        message: impl Into<String>,
        path: impl Into<String>,
        range: SourceRange,
    ) -> Self {
        Self::new(code, message, Severity::Info, path, range)
    }

    /// Attach a suggested fix
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Rule family, the part of the code before the first dot
    pub fn family(&self) -> &str {
        self.code.split('.').next().unwrap_or(&self.code)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.range.start, self.severity, self.code, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_builders() {
        let diagnostic = Diagnostic::error(
            "vocabulary.unknown-element",
            "Unknown element 'bdy'.",
            "profile.elements.bdy",
            SourceRange::at(5, 5),
        )
        .with_fix(Fix::ReplaceName {
            replacement: "body".to_string(),
        });

        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.family(), "vocabulary");
        assert_eq!(
            diagnostic.to_string(),
            "5:5: error [vocabulary.unknown-element] Unknown element 'bdy'."
        );
    }

    #[test]
    fn test_serializes_lowercase_severity_and_fix_kind() {
        let diagnostic = Diagnostic::warning("identity.duplicate-structure-entry", "dup", "p", SourceRange::default())
            .with_fix(Fix::RemoveEntry {
                name: "chapter".to_string(),
            });
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["fix"]["kind"], "remove_entry");
    }
}
