//! Ariadne-based rendering of checker diagnostics.
//!
//! Output is colourless so it can be compared in tests. The primary label
//! repeats the message under the offending range; related positions become
//! secondary labels.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use gop_common::{Diagnostic, Severity, Span};

use crate::error::TypeError;

/// Clamp a span to the source and make it at least one byte wide, which
/// ariadne needs to draw a label.
fn clamp(span: Span, source_len: usize) -> Range<usize> {
    let start = (span.start as usize).min(source_len);
    let end = (span.end as usize).min(source_len).max(start);
    if start == end {
        start..(end + 1).min(source_len)
    } else {
        start..end
    }
}

pub fn render_diagnostic(diag: &Diagnostic, source: &str, _filename: &str) -> String {
    let config = Config::default().with_color(false);
    let len = source.len();
    let kind = match diag.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let primary = clamp(diag.span, len);
    // Multi-line messages keep only their headline in the label.
    let headline = diag.message.lines().next().unwrap_or_default();

    let mut builder = Report::build(kind, primary.clone())
        .with_code(diag.code)
        .with_message(&diag.message)
        .with_config(config);
    builder.add_label(
        Label::new(primary)
            .with_message(headline)
            .with_color(Color::Red),
    );
    for related in &diag.related {
        builder.add_label(
            Label::new(clamp(related.span, len))
                .with_message(&related.message)
                .with_color(Color::Blue),
        );
    }

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return format!("[{}] {}", diag.code, diag.message);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render a type error with its code, message and related positions.
pub fn render_error(error: &TypeError, source: &str, filename: &str) -> String {
    render_diagnostic(&error.to_diagnostic(), source, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_code_message_and_related_label() {
        let source = "var x = 1\nvar x = 2\n";
        let err = TypeError::Redeclared {
            name: "x".into(),
            span: Span::new(14, 15),
            prev: Span::new(4, 5),
        };
        let out = render_error(&err, source, "main.gop");
        assert!(out.contains("[E0002]"), "{out}");
        assert!(out.contains("x redeclared in this block"), "{out}");
        assert!(out.contains("other declaration of x"), "{out}");
    }

    #[test]
    fn empty_span_at_end_of_source_still_renders() {
        let source = "func f() int {\n}";
        let err = TypeError::MissingReturn {
            span: Span::at(source.len() as u32),
        };
        let out = render_error(&err, source, "main.gop");
        assert!(out.contains("missing return"), "{out}");
    }
}
