//! Validation reporter

use crate::Result;
use crate::engine::ValidationResult;
use akn_profile::Severity;
use serde_json::json;
use std::fmt::Write as _;

/// Output format of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Renders validation results for people or tools
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationReporter {
    format: ReportFormat,
}

impl ValidationReporter {
    /// Create a new validation reporter
    #[must_use]
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Render the diagnostics of `source`
    ///
    /// # Errors
    ///
    /// Returns an error when JSON serialization fails.
    pub fn report(&self, source: &str, result: &ValidationResult) -> Result<String> {
        match self.format {
            ReportFormat::Text => Ok(Self::text(source, result)),
            ReportFormat::Json => Self::json(source, result),
        }
    }

    /// One-line summary of the counts per severity
    #[must_use]
    pub fn summary(result: &ValidationResult) -> String {
        format!(
            "{} error(s), {} warning(s), {} info",
            result.count(Severity::Error),
            result.count(Severity::Warning),
            result.count(Severity::Info)
        )
    }

    fn text(source: &str, result: &ValidationResult) -> String {
        let mut out = String::new();
        for diagnostic in &result.diagnostics {
            let _ = writeln!(out, "{source}:{diagnostic}");
        }
        let _ = writeln!(out, "{source}: {}", Self::summary(result));
        out
    }

    fn json(source: &str, result: &ValidationResult) -> Result<String> {
        let report = json!({
            "source": source,
            "valid": result.is_valid(),
            "summary": {
                "errors": result.count(Severity::Error),
                "warnings": result.count(Severity::Warning),
                "info": result.count(Severity::Info),
            },
            "diagnostics": result.diagnostics,
        });
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use akn_profile::{Diagnostic, SourceRange};

    fn result() -> ValidationResult {
        ValidationResult {
            diagnostics: vec![
                Diagnostic::error("vocabulary.unknown-element", "'bdy' is not a known element.", "profile.elements.bdy", SourceRange::at(3, 5)),
                Diagnostic::info("identity.doctype-without-element-restriction", "note", "profile.documentTypes[0]", SourceRange::at(2, 5)),
            ],
        }
    }

    #[test]
    fn test_text_report() {
        let text = ValidationReporter::new(ReportFormat::Text)
            .report("act.yaml", &result())
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "act.yaml:3:5: error [vocabulary.unknown-element] 'bdy' is not a known element."
        );
        assert_eq!(lines[2], "act.yaml: 1 error(s), 0 warning(s), 1 info");
    }

    #[test]
    fn test_json_report() {
        let text = ValidationReporter::new(ReportFormat::Json)
            .report("act.yaml", &result())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["valid"], false);
        assert_eq!(value["summary"]["errors"], 1);
        assert_eq!(value["diagnostics"][0]["code"], "vocabulary.unknown-element");
        assert_eq!(value["diagnostics"][0]["range"]["start"]["line"], 3);
    }
}
