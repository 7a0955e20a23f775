//! Runtime errors
//!
//! All runtime errors are fatal. Loading errors point at the offending line
//! of the compiled file; execution faults point at the instruction that
//! was executing.

use parser::{Diagnostic, DiagnosticBuilder, FileId, Location};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// The compiled file is not in resolved form
    MalformedProgram(String),
    /// A statement names a register missing from `%vars`
    UndeclaredVariable(String),
    /// A `%specvar` directive that cannot be applied
    InvalidSpecvar(String),
    /// Execution could not continue
    Fault(String),
}

impl RuntimeErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeErrorKind::MalformedProgram(_) => "E0901",
            RuntimeErrorKind::UndeclaredVariable(_) => "E0902",
            RuntimeErrorKind::InvalidSpecvar(_) => "E0903",
            RuntimeErrorKind::Fault(_) => "E0904",
        }
    }
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeErrorKind::MalformedProgram(reason) => write!(f, "{}", reason),
            RuntimeErrorKind::UndeclaredVariable(name) => {
                write!(f, "variable `{}` is not declared by %vars", name)
            }
            RuntimeErrorKind::InvalidSpecvar(reason) => write!(f, "%specvar {}", reason),
            RuntimeErrorKind::Fault(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Line in the compiled file, if the error belongs to one
    pub location: Option<Location>,
    pub statement: Option<String>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind) -> Self {
        Self {
            kind,
            location: None,
            statement: None,
        }
    }

    pub fn at(mut self, file_id: FileId, line: usize, statement: impl Into<String>) -> Self {
        self.location = Some(Location::new(file_id, line));
        self.statement = Some(statement.into());
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn line(&self) -> Option<usize> {
        self.location.map(|location| location.line)
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = DiagnosticBuilder::error(self.kind.to_string()).code(self.code());
        if let Some(location) = self.location {
            builder = builder.location(location);
        }
        if let Some(statement) = &self.statement {
            builder = builder.statement(statement.clone());
        }
        if matches!(
            self.kind,
            RuntimeErrorKind::MalformedProgram(_) | RuntimeErrorKind::UndeclaredVariable(_)
        ) {
            builder = builder.note("compiled programs are produced by `gmc compile`");
        }
        builder.build()
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line(), &self.statement) {
            (Some(line), Some(statement)) => {
                write!(f, "Error on line {}: {}\n{}", line, self.kind, statement)
            }
            _ => write!(f, "Runtime error, {}", self.kind),
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_line() {
        let err = RuntimeError::new(RuntimeErrorKind::UndeclaredVariable("Z".into())).at(
            FileId::new(0),
            4,
            "Z++",
        );
        assert_eq!(
            err.to_string(),
            "Error on line 4: variable `Z` is not declared by %vars\nZ++"
        );

        let err = RuntimeError::new(RuntimeErrorKind::Fault("step limit of 10 exceeded".into()));
        assert_eq!(err.to_string(), "Runtime error, step limit of 10 exceeded");
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_codes_and_diagnostic() {
        let err = RuntimeError::new(RuntimeErrorKind::InvalidSpecvar(
            "assigns a non-numeric value".into(),
        ))
        .at(FileId::new(0), 2, "%specvar X a");
        assert_eq!(err.code(), "E0903");
        let diagnostic = err.to_diagnostic();
        assert_eq!(diagnostic.code.as_deref(), Some("E0903"));
        assert_eq!(diagnostic.statement.as_deref(), Some("%specvar X a"));
        assert_eq!(
            RuntimeErrorKind::MalformedProgram(String::new()).code(),
            "E0901"
        );
        assert_eq!(RuntimeErrorKind::Fault(String::new()).code(), "E0904");
    }
}
