//! Syntax errors for G programs and macro templates
//!
//! Every syntax error is fatal and carries the 1-based source line plus the
//! statement text exactly as the compiler saw it. For statements produced
//! by macro expansion the line is the call site's.

use diagnostics::{Diagnostic, DiagnosticBuilder, Location};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    TooManyTokens,
    NotEnoughTokens,
    /// `if` statement without the `not 0 goto` clause
    MalformedGoto,
    InvalidIdentifier(String),
    InvalidMacroArgument(String),
    /// A label declaration with nothing after it
    MissingStatement,
    /// A `%` line after the first statement
    MisplacedDirective,
    /// Leading token is neither a keyword nor a loaded macro prefix
    UnmatchedInitialToken(String),
    RepeatedLabel(String),
    /// Numeric goto target in a source program
    AbsoluteTarget(usize),
    TooManyMacroArguments {
        prefix: String,
        expected: usize,
        found: usize,
    },
}

impl SyntaxErrorKind {
    /// Stable error code, see `compiler::error_codes`
    pub fn code(&self) -> &'static str {
        match self {
            SyntaxErrorKind::TooManyTokens => "E0011",
            SyntaxErrorKind::NotEnoughTokens => "E0012",
            SyntaxErrorKind::MalformedGoto => "E0013",
            SyntaxErrorKind::InvalidIdentifier(_) => "E0014",
            SyntaxErrorKind::InvalidMacroArgument(_) => "E0015",
            SyntaxErrorKind::MissingStatement => "E0016",
            SyntaxErrorKind::MisplacedDirective => "E0017",
            SyntaxErrorKind::UnmatchedInitialToken(_) => "E0021",
            SyntaxErrorKind::RepeatedLabel(_) => "E0022",
            SyntaxErrorKind::AbsoluteTarget(_) => "E0023",
            SyntaxErrorKind::TooManyMacroArguments { .. } => "E0024",
        }
    }

    fn help(&self) -> Option<String> {
        match self {
            SyntaxErrorKind::MalformedGoto => {
                Some("conditional gotos are written `if V not 0 goto L`".to_string())
            }
            SyntaxErrorKind::InvalidIdentifier(_) => {
                Some("names are letters followed by optional digits, e.g. `X` or `Z12`".to_string())
            }
            SyntaxErrorKind::UnmatchedInitialToken(token) => Some(format!(
                "`{}` is not a statement keyword; if it is a macro, check that its package is loaded and its requirements are met",
                token
            )),
            SyntaxErrorKind::RepeatedLabel(label) => {
                Some(format!("rename one of the `[{}]` declarations", label))
            }
            SyntaxErrorKind::AbsoluteTarget(_) => {
                Some("use a label; addresses are assigned by the compiler".to_string())
            }
            SyntaxErrorKind::MisplacedDirective => {
                Some("move `%` directives above the first statement".to_string())
            }
            _ => None,
        }
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorKind::TooManyTokens => write!(f, "too many tokens"),
            SyntaxErrorKind::NotEnoughTokens => write!(f, "not enough tokens"),
            SyntaxErrorKind::MalformedGoto => {
                write!(f, "if statement missing `not 0 goto` clause")
            }
            SyntaxErrorKind::InvalidIdentifier(token) => {
                write!(f, "invalid identifier `{}`", token)
            }
            SyntaxErrorKind::InvalidMacroArgument(token) => {
                write!(f, "invalid macro argument `{}`", token)
            }
            SyntaxErrorKind::MissingStatement => write!(f, "label is not followed by a statement"),
            SyntaxErrorKind::MisplacedDirective => {
                write!(f, "directive after the first statement")
            }
            SyntaxErrorKind::UnmatchedInitialToken(token) => {
                write!(f, "unmatched initial token `{}`", token)
            }
            SyntaxErrorKind::RepeatedLabel(label) => write!(f, "repeated label `{}`", label),
            SyntaxErrorKind::AbsoluteTarget(index) => {
                write!(f, "absolute goto target `{}` in source program", index)
            }
            SyntaxErrorKind::TooManyMacroArguments {
                prefix,
                expected,
                found,
            } => write!(
                f,
                "too many tokens: macro `{}` takes {} argument(s), found {}",
                prefix, expected, found
            ),
        }
    }
}

/// A fatal syntax error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub location: Location,
    /// The offending statement text
    pub statement: String,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, location: Location, statement: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            statement: statement.into(),
        }
    }

    pub fn line(&self) -> usize {
        self.location.line
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = DiagnosticBuilder::error(self.kind.to_string())
            .code(self.kind.code())
            .location(self.location)
            .statement(self.statement.clone());
        if let Some(help) = self.kind.help() {
            builder = builder.help(help);
        }
        builder.build()
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error on line {}: {}\n{}",
            self.location.line, self.kind, self.statement
        )
    }
}

impl std::error::Error for SyntaxError {}
