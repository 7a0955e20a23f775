use crate::pipeline::{CompilationError, ErrorCategory};
use diagnostics::Location;
use std::fmt;
use std::path::PathBuf;

/// Errors raised while loading the macro repository or expanding calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    /// Requested package directory does not exist under the macro root
    PackageNotFound { package: String, path: PathBuf },

    /// A package directory or macro resource could not be read
    Io { path: PathBuf, message: String },

    /// Macro resource without a `%prefix` directive
    MissingPrefix {
        macro_name: String,
        location: Location,
    },

    /// Two loaded macros declare the same prefix
    DuplicatePrefix {
        prefix: String,
        existing: String,
        duplicate: String,
        location: Location,
    },

    /// Prefix collides with statement syntax
    ReservedPrefix {
        macro_name: String,
        prefix: String,
        location: Location,
    },

    /// Malformed `%prefix`, `%input` or `%require` line
    InvalidDirective {
        macro_name: String,
        directive: String,
        reason: String,
        location: Location,
    },

    /// Template body statement that cannot be instantiated
    MalformedTemplate {
        macro_name: String,
        reason: String,
        statement: String,
        location: Location,
    },

    /// Call-site arguments do not bind to the declared arity
    ArgumentCountMismatch {
        macro_name: String,
        expected: (usize, usize),
        found: (usize, usize),
        statement: String,
        location: Location,
    },

    /// Expansion did not reach a fixpoint within the pass limit
    RecursionLimitExceeded {
        macro_name: String,
        max_passes: usize,
        statement: String,
        location: Location,
    },
}

impl MacroError {
    /// Get the source location for this error
    pub fn location(&self) -> Option<Location> {
        match self {
            MacroError::PackageNotFound { .. } | MacroError::Io { .. } => None,
            MacroError::MissingPrefix { location, .. }
            | MacroError::DuplicatePrefix { location, .. }
            | MacroError::ReservedPrefix { location, .. }
            | MacroError::InvalidDirective { location, .. }
            | MacroError::MalformedTemplate { location, .. }
            | MacroError::ArgumentCountMismatch { location, .. }
            | MacroError::RecursionLimitExceeded { location, .. } => Some(*location),
        }
    }

    /// Offending statement or directive text, when there is one
    pub fn statement(&self) -> Option<&str> {
        match self {
            MacroError::InvalidDirective { directive, .. } => Some(directive),
            MacroError::MalformedTemplate { statement, .. }
            | MacroError::ArgumentCountMismatch { statement, .. }
            | MacroError::RecursionLimitExceeded { statement, .. } => Some(statement),
            _ => None,
        }
    }

    /// Whether the error was raised before any program statement was checked
    pub fn is_load_error(&self) -> bool {
        !matches!(
            self,
            MacroError::ArgumentCountMismatch { .. } | MacroError::RecursionLimitExceeded { .. }
        )
    }

    /// Fine-grained error code for this specific macro error kind.
    ///
    /// - E0701: Package not found
    /// - E0702: Missing prefix
    /// - E0703: Duplicate prefix
    /// - E0704: Malformed header directive
    /// - E0705: Reserved prefix
    /// - E0706: Malformed template statement
    /// - E0721: Argument count mismatch
    /// - E0722: Recursion limit exceeded
    /// - E0802: I/O failure while loading
    pub fn error_code(&self) -> &'static str {
        match self {
            MacroError::PackageNotFound { .. } => "E0701",
            MacroError::MissingPrefix { .. } => "E0702",
            MacroError::DuplicatePrefix { .. } => "E0703",
            MacroError::InvalidDirective { .. } => "E0704",
            MacroError::ReservedPrefix { .. } => "E0705",
            MacroError::MalformedTemplate { .. } => "E0706",
            MacroError::ArgumentCountMismatch { .. } => "E0721",
            MacroError::RecursionLimitExceeded { .. } => "E0722",
            MacroError::Io { .. } => "E0802",
        }
    }

    /// Generate a suggestion string for this error
    fn suggestion(&self) -> Option<String> {
        match self {
            MacroError::PackageNotFound { package, .. } => Some(format!(
                "create a '{}' directory under the macro root or drop it from the package list",
                package
            )),
            MacroError::MissingPrefix { .. } => {
                Some("add a '%prefix <token>' line to the macro header".to_string())
            }
            MacroError::DuplicatePrefix { existing, .. } => Some(format!(
                "rename the prefix of one macro; '{}' already uses it",
                existing
            )),
            MacroError::ArgumentCountMismatch {
                macro_name,
                expected,
                ..
            } => Some(format!(
                "macro '{}' takes {} variable(s) and {} label(s); arguments that are neither known variables nor known labels become new variables",
                macro_name, expected.0, expected.1
            )),
            MacroError::RecursionLimitExceeded { macro_name, .. } => Some(format!(
                "check for a cycle through macro '{}', or raise max-expansion-passes",
                macro_name
            )),
            _ => None,
        }
    }

    /// Convert this macro error into a CompilationError for the pipeline
    pub fn to_compilation_error(&self) -> CompilationError {
        let category = match self {
            MacroError::Io { .. } => ErrorCategory::IoError,
            MacroError::ArgumentCountMismatch { .. } | MacroError::RecursionLimitExceeded { .. } => {
                ErrorCategory::ExpansionError
            }
            _ => ErrorCategory::LoadError,
        };
        CompilationError {
            message: self.to_string(),
            code: self.error_code().to_string(),
            category,
            location: self.location(),
            statement: self.statement().map(str::to_string),
            suggestion: self.suggestion(),
        }
    }
}

impl From<MacroError> for CompilationError {
    fn from(error: MacroError) -> Self {
        error.to_compilation_error()
    }
}

impl fmt::Display for MacroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroError::PackageNotFound { package, path } => write!(
                f,
                "macro package '{}' not found at {}",
                package,
                path.display()
            ),
            MacroError::Io { path, message } => {
                write!(f, "cannot read {}: {}", path.display(), message)
            }
            MacroError::MissingPrefix { macro_name, .. } => {
                write!(f, "macro '{}' does not define a prefix", macro_name)
            }
            MacroError::DuplicatePrefix {
                prefix,
                existing,
                duplicate,
                ..
            } => write!(
                f,
                "macro '{}' duplicates prefix '{}' of macro '{}'",
                duplicate, prefix, existing
            ),
            MacroError::ReservedPrefix {
                macro_name, prefix, ..
            } => write!(
                f,
                "macro '{}' uses reserved token '{}' as its prefix",
                macro_name, prefix
            ),
            MacroError::InvalidDirective {
                macro_name, reason, ..
            } => write!(f, "macro '{}': {}", macro_name, reason),
            MacroError::MalformedTemplate {
                macro_name, reason, ..
            } => write!(f, "malformed template in macro '{}': {}", macro_name, reason),
            MacroError::ArgumentCountMismatch {
                macro_name,
                expected,
                found,
                ..
            } => write!(
                f,
                "macro '{}' expects {} variable(s) and {} label(s), found {} and {}",
                macro_name, expected.0, expected.1, found.0, found.1
            ),
            MacroError::RecursionLimitExceeded {
                macro_name,
                max_passes,
                ..
            } => write!(
                f,
                "macro recursion limit: '{}' is still unexpanded after {} passes",
                macro_name, max_passes
            ),
        }
    }
}

impl std::error::Error for MacroError {}
