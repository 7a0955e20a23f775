//! G language AST
//!
//! A program is a flat, ordered list of statements; the position of a
//! statement in that list is its control-flow address. Every statement may
//! carry one label declaration. Conditional gotos name their target either
//! symbolically (source programs, macro templates) or by absolute index
//! (compiled programs).

use diagnostics::Location;
use smallvec::SmallVec;
use std::fmt;

/// Register reported as the program's result
pub const OUTPUT_VARIABLE: &str = "Y";

/// Label every program implicitly owns; jumping to it halts
pub const TERMINATE_LABEL: &str = "E";

/// First character of a directive line
pub const DIRECTIVE_MARKER: char = '%';

/// Starts a trailing comment
pub const COMMENT_MARKER: char = ';';

/// Directive naming every register of a compiled program
pub const VARS_DIRECTIVE: &str = "%vars";

/// Directive presetting a register before execution
pub const SPECVAR_DIRECTIVE: &str = "%specvar";

/// Leading tokens that can never be macro prefixes
pub const KEYWORDS: [&str; 3] = ["if", "skip", "exit"];

/// Operand list of a macro call. Most library macros take one to three
/// arguments.
pub type MacroArgs = SmallVec<[String; 4]>;

/// Destination of a conditional goto
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A label name, resolved during compilation
    Label(String),
    /// A zero-based statement index into a compiled program
    Address(usize),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Label(name) => write!(f, "{}", name),
            Target::Address(index) => write!(f, "{}", index),
        }
    }
}

/// The six statement forms
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// `V++`
    Increment(String),
    /// `V--`, clamped at zero
    Decrement(String),
    /// `if V not 0 goto L`
    ConditionalGoto { var: String, target: Target },
    /// `skip`
    Skip,
    /// `exit`
    Exit,
    /// `prefix arg1 arg2 ...`
    MacroCall { prefix: String, args: MacroArgs },
}

impl StatementKind {
    pub fn is_macro_call(&self) -> bool {
        matches!(self, StatementKind::MacroCall { .. })
    }

    /// Variable named by an increment, decrement or goto
    pub fn variable(&self) -> Option<&str> {
        match self {
            StatementKind::Increment(var)
            | StatementKind::Decrement(var)
            | StatementKind::ConditionalGoto { var, .. } => Some(var),
            _ => None,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Increment(var) => write!(f, "{}++", var),
            StatementKind::Decrement(var) => write!(f, "{}--", var),
            StatementKind::ConditionalGoto { var, target } => {
                write!(f, "if {} not 0 goto {}", var, target)
            }
            StatementKind::Skip => write!(f, "skip"),
            StatementKind::Exit => write!(f, "exit"),
            StatementKind::MacroCall { prefix, args } => {
                write!(f, "{}", prefix)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
        }
    }
}

/// One statement with its optional label declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub label: Option<String>,
    pub kind: StatementKind,
    /// Where the statement came from. Expanded statements point at the
    /// macro call they replaced.
    pub origin: Location,
    /// Name of the macro whose body produced this statement
    pub expanded_from: Option<String>,
    /// Trailing comment emitted with the statement
    pub note: Option<String>,
}

impl Statement {
    pub fn new(kind: StatementKind, origin: Location) -> Self {
        Self {
            label: None,
            kind,
            origin,
            expanded_from: None,
            note: None,
        }
    }

    pub fn labeled(label: impl Into<String>, kind: StatementKind, origin: Location) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::new(kind, origin)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Statement text including any trailing note, as written to output
    pub fn render(&self) -> String {
        match &self.note {
            Some(note) => format!("{} {} {}", self, COMMENT_MARKER, note),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "[{}] ", label)?;
        }
        write!(f, "{}", self.kind)
    }
}

/// Which identifier grammar a line is parsed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Source and compiled programs: `[A-Za-z]+[0-9]*`
    Program,
    /// Macro bodies: identifiers may also start with `_` (placeholders)
    Template,
}
