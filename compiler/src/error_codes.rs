//! Global Error Code Registry for the G compiler and interpreter
//!
//! Error codes are organized by range to avoid conflicts between phases.
//!
//! # Error Code Ranges
//!
//! - E0001-E0099: Syntax errors (statement shape, labels, macro call shape)
//! - E0700-E0799: Macro repository loading and expansion errors
//! - E0800-E0899: Configuration and I/O errors
//! - E0900-E0999: Interpreter errors
//! - E9000-E9999: Internal compiler errors and assertions

use std::collections::HashMap;
use std::fmt;

/// Error code struct containing the numeric code and human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// The numeric error code (e.g., 11)
    pub code: u16,
    /// Human-readable error category
    pub category: &'static str,
    /// Brief description of what this error means
    pub description: &'static str,
    /// Optional help text with suggestions for fixing the error
    pub help: Option<&'static str>,
}

impl ErrorCode {
    pub const fn new(
        code: u16,
        category: &'static str,
        description: &'static str,
        help: Option<&'static str>,
    ) -> Self {
        Self {
            code,
            category,
            description,
            help,
        }
    }

    /// Format the error code as "E{code:04}" (e.g., "E0011")
    pub fn format_code(&self) -> String {
        format_error_code(self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.format_code(),
            self.category,
            self.description
        )
    }
}

/// Registry containing all defined error codes
pub struct ErrorCodeRegistry {
    codes: HashMap<u16, ErrorCode>,
}

impl ErrorCodeRegistry {
    /// Create a new registry with all predefined error codes
    pub fn new() -> Self {
        let mut registry = Self {
            codes: HashMap::new(),
        };
        registry.register_all_codes();
        registry
    }

    /// Get an error code by its numeric value
    pub fn get(&self, code: u16) -> Option<&ErrorCode> {
        self.codes.get(&code)
    }

    /// Get an error code by its formatted string (e.g., "E0011")
    pub fn get_by_string(&self, code_str: &str) -> Option<&ErrorCode> {
        parse_error_code(code_str).and_then(|code| self.get(code))
    }

    fn register(&mut self, error_code: ErrorCode) {
        self.codes.insert(error_code.code, error_code);
    }

    fn register_all_codes(&mut self) {
        // ===== SYNTAX ERRORS (E0001-E0099) =====

        // Statement shape (E0010-E0019)
        self.register(ErrorCode::new(
            11,
            "Syntax",
            "Too many tokens",
            Some("Increment, decrement, skip and exit take no operands; comments start with ';'"),
        ));
        self.register(ErrorCode::new(
            12,
            "Syntax",
            "Not enough tokens",
            Some("A conditional goto has exactly six tokens: if V not 0 goto L"),
        ));
        self.register(ErrorCode::new(
            13,
            "Syntax",
            "If statement missing 'not 0 goto' clause",
            Some("Write conditional gotos as: if V not 0 goto L"),
        ));
        self.register(ErrorCode::new(
            14,
            "Syntax",
            "Invalid identifier",
            Some("Variables and labels are letters followed by optional digits"),
        ));
        self.register(ErrorCode::new(
            15,
            "Syntax",
            "Invalid macro argument",
            Some("Macro arguments must be variable or label names"),
        ));
        self.register(ErrorCode::new(
            16,
            "Syntax",
            "Label without a statement",
            Some("Attach the label to a statement, e.g. [A] skip"),
        ));
        self.register(ErrorCode::new(
            17,
            "Syntax",
            "Directive after the first statement",
            Some("All % directives must precede the program body"),
        ));

        // Program-level checks (E0020-E0029)
        self.register(ErrorCode::new(
            21,
            "Syntax",
            "Unmatched initial token",
            Some("The first token must be a statement keyword, V++, V--, or a loaded macro prefix"),
        ));
        self.register(ErrorCode::new(
            22,
            "Syntax",
            "Repeated label",
            Some("Every label may be declared only once per program"),
        ));
        self.register(ErrorCode::new(
            23,
            "Syntax",
            "Absolute goto target in source program",
            Some("Jump to a label; addresses are assigned by the compiler"),
        ));
        self.register(ErrorCode::new(
            24,
            "Syntax",
            "Too many macro arguments",
            Some("Check the macro's %input directive for its arity"),
        ));

        // ===== MACRO ERRORS (E0700-E0799) =====

        // Loading (E0700-E0719)
        self.register(ErrorCode::new(
            701,
            "Macro",
            "Macro package not found",
            Some("Packages are sub-directories of the macro root"),
        ));
        self.register(ErrorCode::new(
            702,
            "Macro",
            "Missing %prefix directive",
            Some("Every macro resource must declare '%prefix <token>'"),
        ));
        self.register(ErrorCode::new(
            703,
            "Macro",
            "Duplicate macro prefix",
            Some("Two loaded macros cannot share a prefix; rename one or load fewer packages"),
        ));
        self.register(ErrorCode::new(
            704,
            "Macro",
            "Malformed header directive",
            Some("Use '%prefix tok', '%input <vars> variable <labels> label', '%require tok'"),
        ));
        self.register(ErrorCode::new(
            705,
            "Macro",
            "Reserved prefix",
            Some("Prefixes cannot be keywords, labels, directives or V++/V-- forms"),
        ));
        self.register(ErrorCode::new(
            706,
            "Macro",
            "Malformed template statement",
            Some("Check placeholder names and positions in the macro body"),
        ));

        // Expansion (E0720-E0739)
        self.register(ErrorCode::new(
            721,
            "Macro",
            "Macro argument count mismatch",
            Some("Arguments are bound as known variables, known labels, or new variables"),
        ));
        self.register(ErrorCode::new(
            722,
            "Macro",
            "Macro recursion limit exceeded",
            Some("A macro calls itself directly or indirectly; raise max-expansion-passes if the nesting is intentional"),
        ));

        // ===== CONFIGURATION AND I/O (E0800-E0899) =====
        self.register(ErrorCode::new(
            801,
            "Config",
            "Invalid manifest",
            Some("Check gmc.toml syntax"),
        ));
        self.register(ErrorCode::new(
            802,
            "IO",
            "Cannot read or write file",
            None,
        ));

        // ===== INTERPRETER (E0900-E0999) =====
        self.register(ErrorCode::new(
            901,
            "Runtime",
            "Malformed compiled program",
            Some("Recompile the source; compiled programs contain only resolved statements"),
        ));
        self.register(ErrorCode::new(
            902,
            "Runtime",
            "Undeclared variable",
            Some("Every variable must be listed in the %vars header"),
        ));
        self.register(ErrorCode::new(
            903,
            "Runtime",
            "Invalid %specvar directive",
            Some("Write '%specvar V n' with a declared variable and a non-negative integer"),
        ));
        self.register(ErrorCode::new(
            904,
            "Runtime",
            "Execution fault",
            None,
        ));

        // ===== INTERNAL (E9000-E9999) =====
        self.register(ErrorCode::new(
            9001,
            "Internal",
            "Unresolved statement after compilation",
            Some("This is a compiler bug; please report it with the source program"),
        ));
    }

    /// Get all error codes in a specific range
    pub fn get_range(&self, start: u16, end: u16) -> Vec<&ErrorCode> {
        let mut codes: Vec<&ErrorCode> = self
            .codes
            .values()
            .filter(|code| code.code >= start && code.code <= end)
            .collect();
        codes.sort_by_key(|code| code.code);
        codes
    }
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global error code registry instance
static REGISTRY: std::sync::OnceLock<ErrorCodeRegistry> = std::sync::OnceLock::new();

/// Get the global error code registry
pub fn error_registry() -> &'static ErrorCodeRegistry {
    REGISTRY.get_or_init(ErrorCodeRegistry::new)
}

/// Helper function to format error code string (e.g., 11 -> "E0011")
pub fn format_error_code(code: u16) -> String {
    format!("E{:04}", code)
}

/// Helper function to parse error code from string (e.g., "E0011" -> Some(11))
pub fn parse_error_code(code_str: &str) -> Option<u16> {
    code_str.strip_prefix('E')?.parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::SyntaxErrorKind;

    #[test]
    fn test_registry_functionality() {
        let registry = ErrorCodeRegistry::new();

        let too_many = registry.get(11).unwrap();
        assert_eq!(too_many.description, "Too many tokens");

        let by_string = registry.get_by_string("E0721").unwrap();
        assert_eq!(by_string.code, 721);

        assert!(registry.get(65535).is_none());
        assert!(registry.get_by_string("INVALID").is_none());
    }

    #[test]
    fn test_error_code_ranges() {
        let registry = ErrorCodeRegistry::new();

        let syntax = registry.get_range(1, 99);
        assert!(!syntax.is_empty());
        assert!(syntax.iter().all(|e| e.code >= 1 && e.code <= 99));

        let macros = registry.get_range(700, 799);
        assert!(!macros.is_empty());
        assert!(macros.windows(2).all(|pair| pair[0].code < pair[1].code));

        assert_eq!(registry.get_range(0, u16::MAX).len(), registry.codes.len());
    }

    #[test]
    fn test_syntax_error_kinds_are_registered() {
        let kinds = [
            SyntaxErrorKind::TooManyTokens,
            SyntaxErrorKind::NotEnoughTokens,
            SyntaxErrorKind::MalformedGoto,
            SyntaxErrorKind::InvalidIdentifier(String::new()),
            SyntaxErrorKind::InvalidMacroArgument(String::new()),
            SyntaxErrorKind::MissingStatement,
            SyntaxErrorKind::MisplacedDirective,
            SyntaxErrorKind::UnmatchedInitialToken(String::new()),
            SyntaxErrorKind::RepeatedLabel(String::new()),
            SyntaxErrorKind::AbsoluteTarget(0),
            SyntaxErrorKind::TooManyMacroArguments {
                prefix: String::new(),
                expected: 0,
                found: 1,
            },
        ];
        for kind in kinds {
            assert!(
                error_registry().get_by_string(kind.code()).is_some(),
                "{} not registered",
                kind.code()
            );
        }
    }

    #[test]
    fn test_helper_functions() {
        assert_eq!(format_error_code(11), "E0011");
        assert_eq!(format_error_code(9001), "E9001");

        assert_eq!(parse_error_code("E0721"), Some(721));
        assert_eq!(parse_error_code("721"), None);
        assert_eq!(parse_error_code("INVALID"), None);
    }
}
