//! Diagnostics library for compiler and interpreter error reporting
//!
//! This library provides rustc-style diagnostics with:
//! - Severity levels (Error, Warning, Info)
//! - The offending source line quoted from the source map
//! - Secondary locations (e.g. the macro definition behind an expansion)
//! - Help and note trailers
//! - Optional colored terminal output

use std::fmt;

// Re-export source mapping types from the source_map crate
pub use source_map::{FileId, Location, SourceFile, SourceMap};

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
        }
    }
}

/// A secondary location attached to a diagnostic
#[derive(Debug, Clone)]
pub struct Label {
    pub location: Location,
    pub message: String,
}

/// A diagnostic message with severity, location, and trailers
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub location: Option<Location>,
    /// Statement text as the compiler saw it, which may differ from the
    /// source line when the statement came out of a macro expansion
    pub statement: Option<String>,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

/// Collection of diagnostics
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(DiagnosticSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(DiagnosticSeverity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(DiagnosticSeverity::Info)
    }

    fn with_severity(&self, severity: DiagnosticSeverity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }
}

/// Builder for creating diagnostics
pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    fn with_severity(severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic {
                severity,
                code: None,
                message: message.into(),
                location: None,
                statement: None,
                labels: vec![],
                notes: vec![],
                help: vec![],
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Info, message)
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.diagnostic.code = Some(code.into());
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.diagnostic.location = Some(location);
        self
    }

    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.diagnostic.statement = Some(statement.into());
        self
    }

    pub fn label(mut self, location: Location, message: impl Into<String>) -> Self {
        self.diagnostic.labels.push(Label {
            location,
            message: message.into(),
        });
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.diagnostic.notes.push(note.into());
        self
    }

    pub fn help(mut self, help_msg: impl Into<String>) -> Self {
        self.diagnostic.help.push(help_msg.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }
}

/// Formatter for displaying diagnostics
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics, source_map: &SourceMap) -> String {
        let mut output = String::new();

        for (i, diagnostic) in diagnostics.diagnostics.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(&self.format_diagnostic(diagnostic, source_map));
        }

        output
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let mut output = String::new();

        // Header
        let color = match diagnostic.severity {
            DiagnosticSeverity::Error => "\x1b[31m",
            DiagnosticSeverity::Warning => "\x1b[33m",
            DiagnosticSeverity::Info => "\x1b[36m",
        };
        let mut head = diagnostic.severity.to_string();
        if let Some(code) = &diagnostic.code {
            head.push_str(&format!("[{}]", code));
        }
        output.push_str(&self.paint(color, &head));
        output.push_str(": ");
        output.push_str(&self.paint("\x1b[1;97m", &diagnostic.message));
        output.push('\n');

        // Source location and snippet
        if let Some(location) = diagnostic.location {
            let arrow = self.paint("\x1b[96m", "-->");
            let file = source_map.file_name(location.file_id);
            if location.is_synthetic() {
                output.push_str(&format!("  {} {}\n", arrow, file));
            } else {
                output.push_str(&format!("  {} {}:{}\n", arrow, file, location.line));
            }

            let line_text = source_map.line_at(location);
            let width = location.line.to_string().len();
            let bar = self.paint("\x1b[96m", "|");

            if let Some(line) = line_text {
                output.push_str(&format!("{:width$} {}\n", "", bar, width = width));
                output.push_str(&format!(
                    "{} {} {}\n",
                    self.paint("\x1b[96m", &location.line.to_string()),
                    bar,
                    line
                ));
            }

            // Quote the statement separately when it is not what the line says
            if let Some(statement) = &diagnostic.statement {
                let shown = line_text.map(str::trim).unwrap_or_default();
                if shown != statement.trim() {
                    output.push_str(&format!(
                        "{:width$} {} {}\n",
                        "",
                        bar,
                        self.paint("\x1b[1;31m", statement),
                        width = width
                    ));
                }
            }
        } else if let Some(statement) = &diagnostic.statement {
            output.push_str(&format!("    {}\n", statement));
        }

        // Secondary locations
        for label in &diagnostic.labels {
            let file = source_map.file_name(label.location.file_id);
            output.push_str(&format!(
                "  {} {}:{}: {}\n",
                self.paint("\x1b[96m", "-->"),
                file,
                label.location.line,
                label.message
            ));
        }

        for help_msg in &diagnostic.help {
            output.push_str(&format!(
                "     {}: {}\n",
                self.paint("\x1b[32m", "help"),
                self.paint("\x1b[33m", help_msg)
            ));
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("{}: {}\n", self.paint("\x1b[34m", "note"), note));
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Result type that includes diagnostics
pub type DiagnosticResult<T> = Result<T, Diagnostics>;
