use std::fmt;

use crate::span::Span;

/// A code-generation diagnostic (error or warning).
///
/// Spans point into the kernel text emitted so far, so a report shows the
/// last statement that was written before the contract violation.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        if source.is_empty() || self.span.end as usize > source.len() {
            eprintln!("{}", self);
            return;
        }

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        if report
            .finish()
            .eprint((filename, Source::from(source)))
            .is_err()
        {
            eprintln!("{}", self);
        }
    }

    /// Report the diagnostic and abort kernel construction.
    pub fn fatal(self, filename: &str, source: &str) -> ! {
        self.render(filename, source);
        panic!("sjit: {}", self.message);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", label, self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {}", help)?;
        }
        Ok(())
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let d = Diagnostic::error("type mismatch".to_string(), Span::new(10, 15));
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "type mismatch");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_warning_construction() {
        let d = Diagnostic::warning("unused resource".to_string(), Span::dummy());
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.message, "unused resource");
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::error("bad swizzle".to_string(), Span::dummy())
            .with_note("source is f32x2".to_string())
            .with_help("use only x and y".to_string())
            .with_note("swizzle was `xw`".to_string());
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.help.as_deref(), Some("use only x and y"));
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::error("scope stack underflow".to_string(), Span::dummy())
            .with_help("balance enter_scope/exit_scope".to_string());
        assert_eq!(
            d.to_string(),
            "error: scope stack underflow\n  help: balance enter_scope/exit_scope"
        );
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "u32 tmp_1 = u32(0);\nf32 tmp_2 = tmp_1+f32(1.000000);\n";
        let d = Diagnostic::error("operand types differ".to_string(), Span::last_line(source))
            .with_note("u32 vs f32".to_string());
        d.render("kernel.hlsl", source);
    }

    #[test]
    fn test_render_empty_source_does_not_panic() {
        let d = Diagnostic::warning("nothing emitted".to_string(), Span::dummy());
        render_diagnostics(&[d], "kernel.hlsl", "");
    }

    #[test]
    #[should_panic(expected = "sjit: group size")]
    fn test_fatal_panics_with_message() {
        Diagnostic::error("group size 25 is not a multiple of 32".to_string(), Span::dummy())
            .fatal("kernel.hlsl", "");
    }
}
