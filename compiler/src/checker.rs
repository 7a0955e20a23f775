//! Symbol collection and syntax checking
//!
//! The checker walks the whole program after parsing and again after every
//! expansion pass. Each walk validates program-level rules the statement
//! parser cannot see (unique labels, known macro prefixes, coarse macro
//! argument counts, no absolute targets) and merges every name it meets
//! into the run's [`SymbolTable`].

use crate::macro_system::MacroRepository;
use fxhash::{FxBuildHasher, FxHashSet};
use indexmap::IndexSet;
use log::trace;
use parser::{Statement, StatementKind, SyntaxError, SyntaxErrorKind, Target, OUTPUT_VARIABLE};

pub type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// Prefix of generated variable names
pub const FRESH_VARIABLE_PREFIX: &str = "V";
/// Prefix of generated label names
pub const FRESH_LABEL_PREFIX: &str = "L";

/// Every name known to one compilation run.
///
/// Variables and labels keep insertion order; the variable order is the
/// order of the compiled `%vars` manifest.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    variables: FxIndexSet<String>,
    labels: FxIndexSet<String>,
    /// Goto targets, declared or not
    targets: FxHashSet<String>,
    /// Tokens passed to macro calls, before they are classified
    arguments: FxHashSet<String>,
    next_variable: usize,
    next_label: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding only the output variable
    pub fn new() -> Self {
        let mut variables = FxIndexSet::default();
        variables.insert(OUTPUT_VARIABLE.to_string());
        Self {
            variables,
            labels: FxIndexSet::default(),
            targets: FxHashSet::default(),
            arguments: FxHashSet::default(),
            next_variable: 0,
            next_label: 0,
        }
    }

    /// Returns true if the variable was not known before
    pub fn declare_variable(&mut self, name: &str) -> bool {
        if self.variables.contains(name) {
            return false;
        }
        self.variables.insert(name.to_string())
    }

    /// Returns true if the label was not known before
    pub fn declare_label(&mut self, name: &str) -> bool {
        if self.labels.contains(name) {
            return false;
        }
        self.labels.insert(name.to_string())
    }

    pub fn reference_target(&mut self, name: &str) {
        if !self.targets.contains(name) {
            self.targets.insert(name.to_string());
        }
    }

    pub fn mention_argument(&mut self, name: &str) {
        if !self.arguments.contains(name) {
            self.arguments.insert(name.to_string());
        }
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.variables.contains(name)
    }

    pub fn is_label(&self, name: &str) -> bool {
        self.labels.contains(name)
    }

    /// A name is taken if it appears anywhere in the program, in either
    /// namespace
    pub fn is_taken(&self, name: &str) -> bool {
        self.variables.contains(name)
            || self.labels.contains(name)
            || self.targets.contains(name)
            || self.arguments.contains(name)
    }

    /// First unused name in `V0, V1, ...`, declared as a variable
    pub fn fresh_variable(&mut self) -> String {
        // Names are never removed, so every index below the counter stays
        // taken and probing can resume where it stopped.
        let name = loop {
            let candidate = format!("{}{}", FRESH_VARIABLE_PREFIX, self.next_variable);
            self.next_variable += 1;
            if !self.is_taken(&candidate) {
                break candidate;
            }
        };
        self.variables.insert(name.clone());
        name
    }

    /// First unused name in `L0, L1, ...`, declared as a label
    pub fn fresh_label(&mut self) -> String {
        let name = loop {
            let candidate = format!("{}{}", FRESH_LABEL_PREFIX, self.next_label);
            self.next_label += 1;
            if !self.is_taken(&candidate) {
                break candidate;
            }
        };
        self.labels.insert(name.clone());
        name
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

/// Result of one checker walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckReport {
    /// Macro calls still present
    pub macro_calls: usize,
    pub statements: usize,
}

impl CheckReport {
    pub fn has_macro_calls(&self) -> bool {
        self.macro_calls > 0
    }
}

/// Validate a program and merge its names into `symbols`.
///
/// Label uniqueness is checked against this walk only: the program is the
/// authority on which labels are declared right now.
pub fn check_program(
    program: &[Statement],
    repository: &MacroRepository,
    symbols: &mut SymbolTable,
) -> Result<CheckReport, SyntaxError> {
    let mut declared: FxHashSet<&str> = FxHashSet::default();
    let mut report = CheckReport {
        macro_calls: 0,
        statements: program.len(),
    };

    for statement in program {
        let fail = |kind: SyntaxErrorKind| {
            SyntaxError::new(kind, statement.origin, statement.to_string())
        };

        if let Some(label) = &statement.label {
            if !declared.insert(label.as_str()) {
                return Err(fail(SyntaxErrorKind::RepeatedLabel(label.clone())));
            }
            symbols.declare_label(label);
        }

        match &statement.kind {
            StatementKind::Increment(var) | StatementKind::Decrement(var) => {
                symbols.declare_variable(var);
            }
            StatementKind::ConditionalGoto { var, target } => {
                symbols.declare_variable(var);
                match target {
                    Target::Label(label) => symbols.reference_target(label),
                    Target::Address(index) => {
                        return Err(fail(SyntaxErrorKind::AbsoluteTarget(*index)))
                    }
                }
            }
            StatementKind::Skip | StatementKind::Exit => {}
            StatementKind::MacroCall { prefix, args } => {
                let definition = repository
                    .get(prefix)
                    .ok_or_else(|| fail(SyntaxErrorKind::UnmatchedInitialToken(prefix.clone())))?;
                // Exact binding is verified during expansion
                if args.len() > definition.argument_count() {
                    return Err(fail(SyntaxErrorKind::TooManyMacroArguments {
                        prefix: prefix.clone(),
                        expected: definition.argument_count(),
                        found: args.len(),
                    }));
                }
                for arg in args {
                    symbols.mention_argument(arg);
                }
                report.macro_calls += 1;
            }
        }
    }

    trace!(
        "checked {} statement(s): {} variable(s), {} label(s), {} macro call(s)",
        report.statements,
        symbols.variable_count(),
        symbols.label_count(),
        report.macro_calls
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagnostics::SourceMap;
    use parser::{parse_program, preprocess, Dialect, FileId};

    fn program(text: &str) -> Vec<Statement> {
        parse_program(&preprocess(text), FileId::new(0), Dialect::Program).unwrap()
    }

    fn repository() -> MacroRepository {
        let mut repo = MacroRepository::new();
        let mut map = SourceMap::new();
        repo.add_source(
            "zero",
            "%prefix zero\n%input 1 variable 0 label\n[_label1] _V1--\nif _V1 not 0 goto _label1\n",
            &mut map,
        )
        .unwrap();
        repo
    }

    #[test]
    fn test_collects_variables_in_order_with_output_first() {
        let mut symbols = SymbolTable::new();
        let report = check_program(
            &program("[A] X++\nZ--\nif X not 0 goto A\nskip\n"),
            &MacroRepository::new(),
            &mut symbols,
        )
        .unwrap();
        assert!(!report.has_macro_calls());
        assert_eq!(symbols.variables().collect::<Vec<_>>(), vec!["Y", "X", "Z"]);
        assert_eq!(symbols.labels().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_repeated_label() {
        let mut symbols = SymbolTable::new();
        let err = check_program(
            &program("[A] X++\n[A] skip\n"),
            &MacroRepository::new(),
            &mut symbols,
        )
        .unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::RepeatedLabel("A".to_string()));
        assert_eq!(err.line(), 2);
        assert_eq!(err.statement, "[A] skip");
    }

    #[test]
    fn test_unknown_prefix() {
        let mut symbols = SymbolTable::new();
        let err = check_program(&program("clear X\n"), &repository(), &mut symbols).unwrap_err();
        assert_eq!(
            err.kind,
            SyntaxErrorKind::UnmatchedInitialToken("clear".to_string())
        );
    }

    #[test]
    fn test_macro_calls_are_counted_and_arguments_are_not_variables() {
        let mut symbols = SymbolTable::new();
        let report =
            check_program(&program("zero X\nzero Y\n"), &repository(), &mut symbols).unwrap();
        assert_eq!(report.macro_calls, 2);
        assert!(!symbols.is_variable("X"));
        assert!(symbols.is_taken("X"));
    }

    #[test]
    fn test_too_many_macro_arguments() {
        let mut symbols = SymbolTable::new();
        let err = check_program(&program("zero X Z\n"), &repository(), &mut symbols).unwrap_err();
        assert_eq!(err.kind.code(), "E0024");
    }

    #[test]
    fn test_absolute_target_rejected() {
        let mut symbols = SymbolTable::new();
        let err = check_program(
            &program("if X not 0 goto 3\n"),
            &MacroRepository::new(),
            &mut symbols,
        )
        .unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::AbsoluteTarget(3));
    }

    #[test]
    fn test_fresh_names_skip_every_namespace() {
        let mut symbols = SymbolTable::new();
        check_program(
            &program("V0++\n[L0] skip\nif V1 not 0 goto V2\nif X not 0 goto L1\n"),
            &MacroRepository::new(),
            &mut symbols,
        )
        .unwrap();
        assert_eq!(symbols.fresh_variable(), "V3");
        assert_eq!(symbols.fresh_variable(), "V4");
        assert_eq!(symbols.fresh_label(), "L2");
        assert!(symbols.is_label("L2"));
        assert!(symbols.is_variable("V3"));
    }

    #[test]
    fn test_fresh_names_are_deterministic() {
        let text = "X++\n[L1] skip\n";
        let mut first = SymbolTable::new();
        let mut second = SymbolTable::new();
        check_program(&program(text), &MacroRepository::new(), &mut first).unwrap();
        check_program(&program(text), &MacroRepository::new(), &mut second).unwrap();
        for _ in 0..3 {
            assert_eq!(first.fresh_label(), second.fresh_label());
        }
        assert_eq!(first.labels().collect::<Vec<_>>(), vec!["L1", "L0", "L2", "L3"]);
    }
}
