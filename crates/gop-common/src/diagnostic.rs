use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A secondary "see also" position attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Related {
    pub span: Span,
    pub message: String,
}

/// A reported problem with a stable code and source positions.
///
/// Diagnostics are produced by the checker crates and consumed by renderers
/// or editor integrations. The code never changes for a given kind of error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Related>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            span,
            related: Vec::new(),
        }
    }

    /// Attach a secondary position.
    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(Related {
            span,
            message: message.into(),
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let diag = Diagnostic::error("E0001", "undefined: x", Span::new(0, 1));
        assert_eq!(diag.to_string(), "[E0001] undefined: x");
    }

    #[test]
    fn serializes_related_only_when_present() {
        let plain = Diagnostic::error("E0002", "x redeclared in this block", Span::new(4, 5));
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("related").is_none());
        assert_eq!(json["severity"], "error");

        let with = plain.with_related(Span::new(0, 1), "other declaration of x");
        let json = serde_json::to_value(&with).unwrap();
        assert_eq!(json["related"][0]["message"], "other declaration of x");
    }
}
