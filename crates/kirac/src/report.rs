//! Diagnostic reporting to standard error via ariadne.

use ariadne::{Label, Report, ReportKind, Source};

use kira_common::diagnostic::{Diagnostic, Severity};

/// Report a batch of diagnostics for one source file. Returns true if any
/// of them is an error.
pub fn report_diagnostics(source: &str, path: &str, diagnostics: &[Diagnostic]) -> bool {
    let mut has_errors = false;
    for diagnostic in diagnostics {
        if diagnostic.is_error() {
            has_errors = true;
        }
        report_one(source, path, diagnostic);
    }
    has_errors
}

fn report_one(source: &str, path: &str, diagnostic: &Diagnostic) {
    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Hint => ReportKind::Advice,
    };
    let start = diagnostic.span.start.offset as usize;
    let end = (diagnostic.span.end.offset as usize).max(start + 1);
    let start = start.min(source.len());
    let end = end.min(source.len().max(1)).max(start + 1);

    // One plain location line (file:line:column), then the rendered span.
    eprintln!(
        "{path}:{}:{}: [{}] {}",
        diagnostic.span.start.line, diagnostic.span.start.column, diagnostic.code, diagnostic.message
    );
    let mut report = Report::<std::ops::Range<usize>>::build(kind, start..end)
        .with_message(&diagnostic.message)
        .with_label(Label::new(start..end).with_message(&diagnostic.message));
    for label in &diagnostic.labels {
        let label_start = (label.span.start.offset as usize).min(source.len());
        let label_end = ((label.span.end.offset as usize).max(label_start + 1))
            .min(source.len().max(1))
            .max(label_start + 1);
        report = report.with_label(Label::new(label_start..label_end).with_message(&label.message));
    }
    let _ = report.finish().eprint(Source::from(source));
}
