//! Non-fatal schema diagnostics
//!
//! Structural and content errors found while traversing a schema document
//! do not stop traversal. They are collected by an [`ErrorReporter`] as
//! [`Diagnostic`]s keyed by a stable message identifier.

use serde::Serialize;
use std::fmt;

use crate::documents::{SchemaElement, TextPosition};

/// Stable message keys
pub mod keys {
    pub const ELT_INVALID_CONTENT: &str = "s4s-elt-invalid-content.1";
    pub const ELT_MUST_MATCH_1: &str = "s4s-elt-must-match.1";
    pub const ELT_MUST_MATCH_2: &str = "s4s-elt-must-match.2";
    pub const ELT_CANNOT_BE_EMPTY: &str = "s4s-elt-cannot-be-empty";
    pub const ELT_SCHEMA_NS: &str = "s4s-elt-schema-ns";
    pub const ELT_INVALID: &str = "s4s-elt-invalid";
    pub const ATT_MUST_APPEAR: &str = "s4s-att-must-appear";
    pub const ATT_NOT_ALLOWED: &str = "s4s-att-not-allowed";
    pub const ATT_INVALID_VALUE: &str = "s4s-att-invalid-value";
    pub const SRC_RESOLVE: &str = "src-resolve";
    pub const SRC_RESOLVE_4_1: &str = "src-resolve.4.1";
    pub const SRC_RESOLVE_4_2: &str = "src-resolve.4.2";
    pub const COS_ALL_LIMITED_1_2: &str = "cos-all-limited.1.2";
    pub const COS_ALL_LIMITED_2: &str = "cos-all-limited.2";
    pub const P_PROPS_CORRECT_2_1: &str = "p-props-correct.2.1";
    pub const MG_PROPS_CORRECT_2: &str = "mg-props-correct.2";
    pub const SRC_ATTRIBUTE_GROUP_3: &str = "src-attribute_group.3";
    pub const SRC_ELEMENT_2_1: &str = "src-element.2.1";
    pub const SRC_ATTRIBUTE_1: &str = "src-attribute.1";
    pub const SRC_ATTRIBUTE_2: &str = "src-attribute.2";
    pub const SRC_ATTRIBUTE_3_1: &str = "src-attribute.3.1";
    pub const SRC_ELEMENT_1: &str = "src-element.1";
    pub const SRC_ELEMENT_3: &str = "src-element.3";
    pub const CT_PROPS_CORRECT_4: &str = "ct-props-correct.4";
    pub const AG_PROPS_CORRECT_2: &str = "ag-props-correct.2";
    pub const SCH_PROPS_CORRECT_2: &str = "sch-props-correct.2";
    pub const C_PROPS_CORRECT_2: &str = "c-props-correct.2";
    pub const C_SELECTOR_XPATH: &str = "c-selector-xpath";
    pub const C_FIELDS_XPATHS: &str = "c-fields-xpaths";
    pub const SRC_REDEFINE_5_A_C: &str = "src-redefine.5.a.c";
    pub const SRC_REDEFINE_6_1_1: &str = "src-redefine.6.1.1";
    pub const SRC_REDEFINE_6_1_2: &str = "src-redefine.6.1.2";
    pub const SRC_REDEFINE_6_2_2: &str = "src-redefine.6.2.2";
    pub const SRC_REDEFINE_7_1: &str = "src-redefine.7.1";
    pub const SRC_REDEFINE_7_2_2: &str = "src-redefine.7.2.2";
    pub const SRC_REDEFINE_1: &str = "src-redefine.1";
    pub const SRC_INCLUDE_2_1: &str = "src-include.2.1";
    pub const SRC_IMPORT_3_1: &str = "src-import.3.1";
    pub const SRC_IMPORT_1_1: &str = "src-import.1.1";
    pub const SCHEMA_REFERENCE_4: &str = "schema_reference.4";
    pub const SCHEMA_DEPTH_EXCEEDED: &str = "schema-depth-exceeded";
    pub const MAX_OCCUR_LIMIT: &str = "MaxOccurLimit";
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A single reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Message key, one of [`keys`]
    pub key: &'static str,
    /// Positional message arguments
    pub args: Vec<String>,
    pub severity: Severity,
    /// Local name of the offending schema element
    pub element: Option<String>,
    /// System id of the document containing the element
    pub system_id: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    /// Create an error diagnostic with no location
    pub fn error(key: &'static str, args: Vec<String>) -> Self {
        Self {
            key,
            args,
            severity: Severity::Error,
            element: None,
            system_id: None,
            line: None,
            column: None,
        }
    }

    /// Create a warning diagnostic with no location
    pub fn warning(key: &'static str, args: Vec<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(key, args)
        }
    }

    /// Attach the offending element and its position
    pub fn at(mut self, element: &SchemaElement, system_id: Option<&str>) -> Self {
        self.element = Some(element.local_name().to_string());
        self.system_id = system_id.map(str::to_string);
        let TextPosition { line, column } = element.position;
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        if let Some(ref system_id) = self.system_id {
            write!(f, "{}:", system_id)?;
        }
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, "{}:{}: ", line, column)?;
        } else if self.system_id.is_some() {
            write!(f, " ")?;
        }
        write!(f, "{} {}", level, self.key)?;
        if !self.args.is_empty() {
            write!(f, " [{}]", self.args.join(", "))?;
        }
        Ok(())
    }
}

/// Collects diagnostics in report order
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            key = diagnostic.key,
            args = ?diagnostic.args,
            element = diagnostic.element.as_deref().unwrap_or(""),
            line = diagnostic.line.unwrap_or(0),
            "schema diagnostic"
        );
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Number of diagnostics reported under `key`
    pub fn count_key(&self, key: &str) -> usize {
        self.diagnostics.iter().filter(|d| d.key == key).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_counts() {
        let mut reporter = ErrorReporter::new();
        reporter.report(Diagnostic::error(keys::SRC_RESOLVE, vec!["g1".into(), "group".into()]));
        reporter.report(Diagnostic::warning(keys::SCHEMA_REFERENCE_4, vec!["a.xsd".into()]));
        assert_eq!(reporter.len(), 2);
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.count_key(keys::SRC_RESOLVE), 1);
    }

    #[test]
    fn test_display() {
        let mut diagnostic = Diagnostic::error(keys::ATT_MUST_APPEAR, vec!["group".into(), "ref".into()]);
        diagnostic.system_id = Some("main.xsd".into());
        diagnostic.line = Some(3);
        diagnostic.column = Some(5);
        assert_eq!(
            diagnostic.to_string(),
            "main.xsd:3:5: error s4s-att-must-appear [group, ref]"
        );
        let bare = Diagnostic::warning(keys::SCHEMA_REFERENCE_4, vec![]);
        assert_eq!(bare.to_string(), "warning schema_reference.4");
    }
}
