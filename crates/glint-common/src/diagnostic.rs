//! Generic diagnostic record and ariadne-based rendering.
//!
//! `glint-infer` accumulates these instead of propagating `Result`s: a type
//! error never unwinds the visitor, it is recorded and inference continues
//! so that later nodes can still widen (per §7, the *compiler* aborts after
//! the first one is reported, but the engine itself does not need to stop).

use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single compiler diagnostic anchored at a primary span, with an optional
/// secondary span for "expected here, found there" style messages.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub primary: Span,
    pub secondary: Option<(Span, String)>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, primary: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            primary,
            secondary: None,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, primary: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code,
            message: message.into(),
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, span: Span, label: impl Into<String>) -> Self {
        self.secondary = Some((span, label.into()));
        self
    }
}

fn span_range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

/// Render a batch of diagnostics against `source` (all anchored at the same
/// file) into a `String`, one ariadne report per diagnostic, in order.
pub fn render(file_name: &str, source: &str, diagnostics: &[Diagnostic]) -> String {
    let mut out = Vec::new();
    for diag in diagnostics {
        let (kind, color) = match diag.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
        };
        let mut builder = Report::build(kind, file_name, diag.primary.start as usize)
            .with_code(diag.code)
            .with_message(&diag.message)
            .with_label(
                Label::new((file_name, span_range(diag.primary)))
                    .with_color(color)
                    .with_message(&diag.message),
            );
        if let Some((span, label)) = &diag.secondary {
            builder = builder.with_label(
                Label::new((file_name, span_range(*span)))
                    .with_color(Color::Blue)
                    .with_message(label),
            );
        }
        let report = builder.finish();
        let mut buf = Vec::new();
        let _ = report.write((file_name, Source::from(source)), &mut buf);
        out.push(String::from_utf8_lossy(&buf).into_owned());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_without_panicking() {
        let diags = vec![Diagnostic::error("E0001", "undefined method `foo`", Span::new(0, 3))];
        let rendered = render("test.gl", "foo.bar", &diags);
        assert!(rendered.contains("E0001"));
    }
}
