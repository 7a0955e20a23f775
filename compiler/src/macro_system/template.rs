//! Macro body templates
//!
//! A macro body is parsed once, when its resource is loaded, with the
//! template dialect of the statement parser. Every name in it is then
//! classified as an [`Operand`]; instantiation only has to substitute
//! operands and never looks at text again.
//!
//! Placeholder conventions:
//!
//! | token      | meaning                                   |
//! |------------|-------------------------------------------|
//! | `_V<n>`    | n-th formal variable (1-based)            |
//! | `_L<n>`    | n-th formal label (1-based)               |
//! | `_var...`  | macro-local temporary variable            |
//! | `_label...`| macro-local temporary label               |
//! | `E`        | exit site of the current expansion        |

use super::errors::MacroError;
use diagnostics::{FileId, Location};
use parser::{
    parse_statement, Dialect, SourceLine, StatementKind, Target, KEYWORDS, TERMINATE_LABEL,
};
use smallvec::SmallVec;
use std::fmt;

pub const FORMAL_VARIABLE_PREFIX: &str = "_V";
pub const FORMAL_LABEL_PREFIX: &str = "_L";
pub const TEMP_VARIABLE_PREFIX: &str = "_var";
pub const TEMP_LABEL_PREFIX: &str = "_label";

/// A classified name inside a template statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// `_V<n>`, bound to the n-th variable argument
    FormalVariable(usize),
    /// `_L<n>`, bound to the n-th label argument
    FormalLabel(usize),
    /// `_var...`, renamed to a fresh variable once per expansion
    TempVariable(String),
    /// `_label...`, renamed to a fresh label once per expansion
    TempLabel(String),
    /// `E`, the label following the inlined body
    Exit,
    /// Any other name, copied verbatim
    Name(String),
}

impl Operand {
    /// Classify a template token. Returns `None` for an underscore token
    /// that follows none of the placeholder conventions.
    pub fn classify(token: &str) -> Option<Operand> {
        if token == TERMINATE_LABEL {
            Some(Operand::Exit)
        } else if token.starts_with(TEMP_VARIABLE_PREFIX) {
            Some(Operand::TempVariable(token.to_string()))
        } else if token.starts_with(TEMP_LABEL_PREFIX) {
            Some(Operand::TempLabel(token.to_string()))
        } else if let Some(index) = token.strip_prefix(FORMAL_VARIABLE_PREFIX) {
            formal_index(index).map(Operand::FormalVariable)
        } else if let Some(index) = token.strip_prefix(FORMAL_LABEL_PREFIX) {
            formal_index(index).map(Operand::FormalLabel)
        } else if token.starts_with('_') {
            None
        } else {
            Some(Operand::Name(token.to_string()))
        }
    }

    fn is_label_like(&self) -> bool {
        matches!(
            self,
            Operand::FormalLabel(_) | Operand::TempLabel(_) | Operand::Exit
        )
    }
}

fn formal_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|&index| index >= 1)
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::FormalVariable(index) => write!(f, "{}{}", FORMAL_VARIABLE_PREFIX, index),
            Operand::FormalLabel(index) => write!(f, "{}{}", FORMAL_LABEL_PREFIX, index),
            Operand::TempVariable(name) | Operand::TempLabel(name) | Operand::Name(name) => {
                write!(f, "{}", name)
            }
            Operand::Exit => write!(f, "{}", TERMINATE_LABEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    Increment(Operand),
    Decrement(Operand),
    ConditionalGoto { var: Operand, target: Operand },
    Skip,
    Exit,
    /// Nested call, left unexpanded until the next pass
    MacroCall {
        prefix: String,
        args: SmallVec<[Operand; 4]>,
    },
}

/// One statement of a macro body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStatement {
    pub label: Option<Operand>,
    pub kind: TemplateKind,
    /// Line inside the macro resource
    pub location: Location,
    /// Body line as written
    pub text: String,
}

/// Where an operand sits in a statement; each position admits a different
/// subset of placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Declaration,
    Variable,
    Target,
    Argument,
}

struct TemplateParser<'a> {
    macro_name: &'a str,
    arity: (usize, usize),
}

impl<'a> TemplateParser<'a> {
    fn malformed(&self, line: &SourceLine, location: Location, reason: String) -> MacroError {
        MacroError::MalformedTemplate {
            macro_name: self.macro_name.to_string(),
            reason,
            statement: line.text.clone(),
            location,
        }
    }

    fn operand(
        &self,
        token: &str,
        position: Position,
        line: &SourceLine,
        location: Location,
    ) -> Result<Operand, MacroError> {
        let operand = Operand::classify(token).ok_or_else(|| {
            self.malformed(
                line,
                location,
                format!("`{}` is not a recognized placeholder", token),
            )
        })?;

        match (&operand, position) {
            (Operand::FormalVariable(index), _) if *index > self.arity.0 => {
                return Err(self.malformed(
                    line,
                    location,
                    format!(
                        "`{}` exceeds the declared {} variable input(s)",
                        operand, self.arity.0
                    ),
                ))
            }
            (Operand::FormalLabel(index), _) if *index > self.arity.1 => {
                return Err(self.malformed(
                    line,
                    location,
                    format!(
                        "`{}` exceeds the declared {} label input(s)",
                        operand, self.arity.1
                    ),
                ))
            }
            _ => {}
        }

        let allowed = match position {
            Position::Argument => true,
            Position::Target => !matches!(
                operand,
                Operand::FormalVariable(_) | Operand::TempVariable(_)
            ),
            Position::Variable => !operand.is_label_like() || operand == Operand::Exit,
            Position::Declaration => {
                matches!(operand, Operand::TempLabel(_) | Operand::Name(_))
            }
        };

        if !allowed {
            let role = match position {
                Position::Declaration => "declared as a label",
                Position::Variable => "used as a variable",
                Position::Target => "used as a goto target",
                Position::Argument => "used as an argument",
            };
            return Err(self.malformed(
                line,
                location,
                format!("`{}` cannot be {}", operand, role),
            ));
        }

        // `E` in variable position is an ordinary variable name
        if position == Position::Variable && operand == Operand::Exit {
            return Ok(Operand::Name(TERMINATE_LABEL.to_string()));
        }
        Ok(operand)
    }

    fn statement(&self, line: &SourceLine, file_id: FileId) -> Result<TemplateStatement, MacroError> {
        let location = Location::new(file_id, line.number);
        let parsed = parse_statement(line, file_id, Dialect::Template)
            .map_err(|err| self.malformed(line, location, err.kind.to_string()))?;

        let label = parsed
            .label
            .as_deref()
            .map(|name| self.operand(name, Position::Declaration, line, location))
            .transpose()?;

        let kind = match parsed.kind {
            StatementKind::Increment(var) => {
                TemplateKind::Increment(self.operand(&var, Position::Variable, line, location)?)
            }
            StatementKind::Decrement(var) => {
                TemplateKind::Decrement(self.operand(&var, Position::Variable, line, location)?)
            }
            StatementKind::ConditionalGoto { var, target } => {
                let target = match target {
                    Target::Label(name) => name,
                    Target::Address(index) => {
                        return Err(self.malformed(
                            line,
                            location,
                            format!("absolute goto target `{}`", index),
                        ))
                    }
                };
                TemplateKind::ConditionalGoto {
                    var: self.operand(&var, Position::Variable, line, location)?,
                    target: self.operand(&target, Position::Target, line, location)?,
                }
            }
            StatementKind::Skip => TemplateKind::Skip,
            StatementKind::Exit => TemplateKind::Exit,
            StatementKind::MacroCall { prefix, args } => {
                if prefix.starts_with('_') || KEYWORDS.contains(&prefix.as_str()) {
                    return Err(self.malformed(
                        line,
                        location,
                        format!("`{}` cannot be a macro prefix", prefix),
                    ));
                }
                let args = args
                    .iter()
                    .map(|arg| self.operand(arg, Position::Argument, line, location))
                    .collect::<Result<SmallVec<[Operand; 4]>, _>>()?;
                TemplateKind::MacroCall { prefix, args }
            }
        };

        Ok(TemplateStatement {
            label,
            kind,
            location,
            text: line.text.clone(),
        })
    }
}

/// Parse and classify a macro body.
///
/// `arity` is the declared (variable, label) input count; formal
/// placeholders beyond it are rejected here rather than at expansion time.
pub fn parse_template(
    macro_name: &str,
    lines: &[SourceLine],
    file_id: FileId,
    arity: (usize, usize),
) -> Result<Vec<TemplateStatement>, MacroError> {
    let parser = TemplateParser { macro_name, arity };
    lines
        .iter()
        .map(|line| parser.statement(line, file_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(text: &str, arity: (usize, usize)) -> Result<Vec<TemplateStatement>, MacroError> {
        let lines = parser::preprocess(text);
        parse_template("test", &lines, FileId::new(0), arity)
    }

    fn reason(err: MacroError) -> String {
        match err {
            MacroError::MalformedTemplate { reason, .. } => reason,
            other => panic!("expected malformed template, got {:?}", other),
        }
    }

    #[test]
    fn test_operand_classification() {
        assert_eq!(Operand::classify("_V2"), Some(Operand::FormalVariable(2)));
        assert_eq!(Operand::classify("_L1"), Some(Operand::FormalLabel(1)));
        assert_eq!(
            Operand::classify("_var1"),
            Some(Operand::TempVariable("_var1".to_string()))
        );
        assert_eq!(
            Operand::classify("_labelLoop"),
            Some(Operand::TempLabel("_labelLoop".to_string()))
        );
        assert_eq!(Operand::classify("E"), Some(Operand::Exit));
        assert_eq!(Operand::classify("Y"), Some(Operand::Name("Y".to_string())));
        assert_eq!(Operand::classify("_V0"), None);
        assert_eq!(Operand::classify("_Vx"), None);
        assert_eq!(Operand::classify("_tmp"), None);
    }

    #[test]
    fn test_zero_body() {
        let stmts = body("[_label1] _V1--\nif _V1 not 0 goto _label1\n", (1, 0)).unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(
            stmts[0].label,
            Some(Operand::TempLabel("_label1".to_string()))
        );
        assert_eq!(
            stmts[0].kind,
            TemplateKind::Decrement(Operand::FormalVariable(1))
        );
        assert_eq!(
            stmts[1].kind,
            TemplateKind::ConditionalGoto {
                var: Operand::FormalVariable(1),
                target: Operand::TempLabel("_label1".to_string()),
            }
        );
        assert_eq!(stmts[1].location.line, 2);
    }

    #[test]
    fn test_nested_call_arguments_are_classified() {
        let stmts = body("goto E\nzero _var1\n", (0, 0)).unwrap();
        assert_eq!(
            stmts[0].kind,
            TemplateKind::MacroCall {
                prefix: "goto".to_string(),
                args: SmallVec::from_vec(vec![Operand::Exit]),
            }
        );
        match &stmts[1].kind {
            TemplateKind::MacroCall { args, .. } => {
                assert_eq!(args[0], Operand::TempVariable("_var1".to_string()))
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_formal_out_of_range() {
        let err = body("_V2++", (1, 0)).unwrap_err();
        assert!(reason(err).contains("_V2"));
        let err = body("if X not 0 goto _L1", (1, 0)).unwrap_err();
        assert!(reason(err).contains("_L1"));
    }

    #[test]
    fn test_wrong_positions() {
        assert!(reason(body("_L1++", (0, 1)).unwrap_err()).contains("variable"));
        assert!(reason(body("[_V1] skip", (1, 0)).unwrap_err()).contains("declared"));
        assert!(reason(body("[E] skip", (0, 0)).unwrap_err()).contains("declared"));
        assert!(reason(body("if _V1 not 0 goto _var1", (1, 0)).unwrap_err())
            .contains("goto target"));
    }

    #[test]
    fn test_syntax_errors_become_malformed_template() {
        let err = body("_V1++ extra", (1, 0)).unwrap_err();
        assert_eq!(err.error_code(), "E0706");
        assert_eq!(err.statement(), Some("_V1++ extra"));
    }

    #[test]
    fn test_e_in_variable_position_is_a_name() {
        let stmts = body("E++", (0, 0)).unwrap();
        assert_eq!(
            stmts[0].kind,
            TemplateKind::Increment(Operand::Name("E".to_string()))
        );
    }
}
