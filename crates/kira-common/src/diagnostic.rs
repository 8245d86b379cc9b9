use serde::Serialize;

use crate::span::Span;

/// How serious a diagnostic is. Only `Error` fails a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

/// A secondary span with its own message, attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// A structured message reporting an error, warning, or hint with a source
/// location.
///
/// Every stage collects these rather than aborting, so multiple problems
/// surface per run. Codes are stable per stage: `L` lexer, `P` parser,
/// `R` resolver, `E`/`W` type checker, `K` runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub span: Span,
    pub labels: Vec<Label>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            span,
            labels: Vec::new(),
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.into(),
            message: message.into(),
            span,
            labels: Vec::new(),
        }
    }

    pub fn hint(code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Hint,
            code: code.into(),
            message: message.into(),
            span,
            labels: Vec::new(),
        }
    }

    /// Attach a related span with a secondary message.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Whether any diagnostic in a batch is an error. Warnings and hints never
/// fail a stage.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Location, Span};

    fn span() -> Span {
        Span::new(Location::start(), Location::new(1, 5, 4))
    }

    #[test]
    fn error_is_error() {
        let d = Diagnostic::error("E0001", "type mismatch", span());
        assert!(d.is_error());
        assert_eq!(d.code, "E0001");
        assert!(d.labels.is_empty());
    }

    #[test]
    fn warnings_do_not_fail_a_stage() {
        let batch = vec![
            Diagnostic::warning("W0001", "unreachable match arm", span()),
            Diagnostic::hint("E0000", "consider renaming", span()),
        ];
        assert!(!has_errors(&batch));
    }

    #[test]
    fn labels_accumulate() {
        let d = Diagnostic::error("R0002", "duplicate definition of `x`", span())
            .with_label(span(), "first defined here");
        assert_eq!(d.labels.len(), 1);
        assert_eq!(d.labels[0].message, "first defined here");
    }
}
