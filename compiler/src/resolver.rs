//! Label resolution
//!
//! Runs once on the macro-free program. Pass one maps every declared label
//! to its zero-based statement index and strips the declaration. Pass two
//! rewrites goto targets to those indices; a target that was never
//! declared means "terminate" and gets the index of `[E] exit`.

use crate::pipeline::CompilationError;
use fxhash::FxHashMap;
use log::debug;
use parser::{Statement, StatementKind, Target, TERMINATE_LABEL};

/// A label-free program plus the addresses its labels resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProgram {
    pub statements: Vec<Statement>,
    /// Declared labels with their addresses, in program order
    pub addresses: Vec<(String, usize)>,
}

pub fn resolve_labels(mut program: Vec<Statement>) -> Result<ResolvedProgram, CompilationError> {
    let mut lookup: FxHashMap<String, usize> = FxHashMap::default();
    let mut addresses = Vec::new();
    for (index, statement) in program.iter_mut().enumerate() {
        if let Some(label) = statement.label.take() {
            lookup.insert(label.clone(), index);
            addresses.push((label, index));
        }
    }
    let terminate = lookup.get(TERMINATE_LABEL).copied();

    for statement in program.iter_mut() {
        let address = match &statement.kind {
            StatementKind::ConditionalGoto {
                target: Target::Label(label),
                ..
            } => match lookup.get(label.as_str()).copied().or(terminate) {
                Some(address) => address,
                None => {
                    return Err(CompilationError::internal(
                        format!("goto target `{}` has no address", label),
                        statement,
                    ))
                }
            },
            StatementKind::ConditionalGoto {
                target: Target::Address(_),
                ..
            } => {
                return Err(CompilationError::internal(
                    "absolute goto target reached label resolution",
                    statement,
                ))
            }
            StatementKind::MacroCall { prefix, .. } => {
                return Err(CompilationError::internal(
                    format!("unexpanded macro call `{}` reached label resolution", prefix),
                    statement,
                ))
            }
            _ => continue,
        };
        if let StatementKind::ConditionalGoto { target, .. } = &mut statement.kind {
            *target = Target::Address(address);
        }
    }

    debug!("resolved {} label(s)", addresses.len());
    Ok(ResolvedProgram {
        statements: program,
        addresses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorCategory;
    use parser::{parse_program, preprocess, Dialect, FileId};

    fn resolve(text: &str) -> Result<ResolvedProgram, CompilationError> {
        let program = parse_program(&preprocess(text), FileId::new(0), Dialect::Program).unwrap();
        resolve_labels(program)
    }

    fn lines(resolved: &ResolvedProgram) -> Vec<String> {
        resolved.statements.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_labels_become_addresses() {
        let resolved = resolve("[A] X++\nif X not 0 goto A\n[E] exit\n").unwrap();
        assert_eq!(lines(&resolved), vec!["X++", "if X not 0 goto 0", "exit"]);
        assert_eq!(
            resolved.addresses,
            vec![("A".to_string(), 0), ("E".to_string(), 2)]
        );
    }

    #[test]
    fn test_forward_reference() {
        let resolved = resolve("if X not 0 goto B\nY++\n[B] skip\n[E] exit\n").unwrap();
        assert_eq!(
            lines(&resolved),
            vec!["if X not 0 goto 2", "Y++", "skip", "exit"]
        );
    }

    #[test]
    fn test_undeclared_target_terminates() {
        let resolved = resolve("[A] Y++\nif Y not 0 goto B\n[E] exit\n").unwrap();
        assert_eq!(lines(&resolved), vec!["Y++", "if Y not 0 goto 2", "exit"]);
    }

    #[test]
    fn test_macro_call_is_internal_error() {
        let err = resolve("zero X\n[E] exit\n").unwrap_err();
        assert_eq!(err.category, ErrorCategory::InternalError);
        assert_eq!(err.code, "E9001");
        assert_eq!(err.statement.as_deref(), Some("zero X"));
    }

    #[test]
    fn test_missing_terminate_label_is_internal_error() {
        let err = resolve("if X not 0 goto Nowhere\n").unwrap_err();
        assert_eq!(err.code, "E9001");
    }
}
