//! Statement parser
//!
//! Statements are whitespace-tokenized; the shape of each token (label
//! declaration, `V++`, `V--`, identifier, address) is recognized with nom
//! combinators. Every line is parsed exactly once into a [`Statement`]; later
//! compiler phases match on the variant and never re-split text.

use nom::{
    bytes::complete::tag,
    character::complete::{alpha1, char, digit1},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{delimited, pair, terminated},
    Parser,
};

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::g_ast::*;
use crate::preprocessor::SourceLine;
use crate::NomParseResult;
use diagnostics::{FileId, Location};

/// `[A-Za-z]+[0-9]*`
pub fn identifier(input: &str) -> NomParseResult<'_, &str> {
    recognize(pair(alpha1, opt(digit1))).parse(input)
}

/// An identifier with an optional leading underscore, as used by macro
/// placeholders (`_V1`, `_var2`, `_label1`)
pub fn placeholder_identifier(input: &str) -> NomParseResult<'_, &str> {
    recognize(pair(opt(char('_')), identifier)).parse(input)
}

fn name_parser(dialect: Dialect) -> fn(&str) -> NomParseResult<'_, &str> {
    match dialect {
        Dialect::Program => identifier,
        Dialect::Template => placeholder_identifier,
    }
}

/// The whole token is a name in the given dialect
pub fn name_token(dialect: Dialect, token: &str) -> Option<&str> {
    all_consuming(name_parser(dialect))
        .parse(token)
        .ok()
        .map(|(_, name)| name)
}

fn suffixed<'a>(dialect: Dialect, token: &'a str, suffix: &'static str) -> Option<&'a str> {
    all_consuming(terminated(name_parser(dialect), tag(suffix)))
        .parse(token)
        .ok()
        .map(|(_, name)| name)
}

/// `[L]`
pub fn label_declaration(dialect: Dialect, token: &str) -> Option<&str> {
    all_consuming(delimited(char('['), name_parser(dialect), char(']')))
        .parse(token)
        .ok()
        .map(|(_, name)| name)
}

fn decimal(input: &str) -> NomParseResult<'_, usize> {
    map_res(digit1, str::parse::<usize>).parse(input)
}

/// Unsigned decimal statement index
pub fn address(token: &str) -> Option<usize> {
    all_consuming(decimal)
        .parse(token)
        .ok()
        .map(|(_, index)| index)
}

/// Parse one preprocessed line
pub fn parse_statement(
    line: &SourceLine,
    file_id: FileId,
    dialect: Dialect,
) -> Result<Statement, SyntaxError> {
    let location = Location::new(file_id, line.number);
    let fail = |kind: SyntaxErrorKind| SyntaxError::new(kind, location, line.text.clone());

    if line.is_directive() {
        return Err(fail(SyntaxErrorKind::MisplacedDirective));
    }

    let tokens: Vec<&str> = line.text.split_whitespace().collect();

    let (label, rest) = match tokens.split_first() {
        Some((first, rest)) if first.starts_with('[') => {
            let name = label_declaration(dialect, first)
                .ok_or_else(|| fail(SyntaxErrorKind::InvalidIdentifier(first.to_string())))?;
            (Some(name.to_string()), rest)
        }
        _ => (None, tokens.as_slice()),
    };

    let (first, operands) = rest
        .split_first()
        .ok_or_else(|| fail(SyntaxErrorKind::MissingStatement))?;

    let no_operands = |kind: StatementKind| {
        if operands.is_empty() {
            Ok(kind)
        } else {
            Err(fail(SyntaxErrorKind::TooManyTokens))
        }
    };

    let kind = if let Some(var) = suffixed(dialect, first, "++") {
        no_operands(StatementKind::Increment(var.to_string()))?
    } else if let Some(var) = suffixed(dialect, first, "--") {
        no_operands(StatementKind::Decrement(var.to_string()))?
    } else if *first == "if" {
        parse_goto(operands, dialect).map_err(fail)?
    } else if *first == "skip" {
        no_operands(StatementKind::Skip)?
    } else if *first == "exit" {
        no_operands(StatementKind::Exit)?
    } else if first.ends_with("++") || first.ends_with("--") {
        return Err(fail(SyntaxErrorKind::InvalidIdentifier(
            first[..first.len() - 2].to_string(),
        )));
    } else {
        let mut args = MacroArgs::new();
        for arg in operands {
            let name = name_token(dialect, arg)
                .ok_or_else(|| fail(SyntaxErrorKind::InvalidMacroArgument(arg.to_string())))?;
            args.push(name.to_string());
        }
        StatementKind::MacroCall {
            prefix: first.to_string(),
            args,
        }
    };

    Ok(Statement {
        label,
        kind,
        origin: location,
        expanded_from: None,
        note: None,
    })
}

/// Operands of `if V not 0 goto L`, i.e. everything after `if`
fn parse_goto(operands: &[&str], dialect: Dialect) -> Result<StatementKind, SyntaxErrorKind> {
    match operands.len() {
        n if n < 5 => return Err(SyntaxErrorKind::NotEnoughTokens),
        n if n > 5 => return Err(SyntaxErrorKind::TooManyTokens),
        _ => {}
    }

    if operands[1] != "not" || operands[2] != "0" || operands[3] != "goto" {
        return Err(SyntaxErrorKind::MalformedGoto);
    }

    let var = name_token(dialect, operands[0])
        .ok_or_else(|| SyntaxErrorKind::InvalidIdentifier(operands[0].to_string()))?;

    let target_token = operands[4];
    let target = if let Some(index) = address(target_token) {
        Target::Address(index)
    } else if let Some(label) = name_token(dialect, target_token) {
        Target::Label(label.to_string())
    } else {
        return Err(SyntaxErrorKind::InvalidIdentifier(target_token.to_string()));
    };

    Ok(StatementKind::ConditionalGoto {
        var: var.to_string(),
        target,
    })
}

/// Parse a run of preprocessed lines, stopping at the first error
pub fn parse_program(
    lines: &[SourceLine],
    file_id: FileId,
    dialect: Dialect,
) -> Result<Vec<Statement>, SyntaxError> {
    lines
        .iter()
        .map(|line| parse_statement(line, file_id, dialect))
        .collect()
}

/// Parse a single line of text as line 1 of file 0
pub fn parse_statement_str(text: &str, dialect: Dialect) -> Result<Statement, SyntaxError> {
    parse_statement(&SourceLine::new(1, text.trim()), FileId::new(0), dialect)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(text: &str) -> Result<StatementKind, SyntaxErrorKind> {
        parse_statement_str(text, Dialect::Program)
            .map(|s| s.kind)
            .map_err(|e| e.kind)
    }

    #[test]
    fn test_token_grammars() {
        assert_eq!(name_token(Dialect::Program, "X12"), Some("X12"));
        assert_eq!(name_token(Dialect::Program, "X1a"), None);
        assert_eq!(name_token(Dialect::Program, "_V1"), None);
        assert_eq!(name_token(Dialect::Template, "_V1"), Some("_V1"));
        assert_eq!(name_token(Dialect::Template, "__V1"), None);
        assert_eq!(label_declaration(Dialect::Program, "[LOOP2]"), Some("LOOP2"));
        assert_eq!(label_declaration(Dialect::Program, "[2]"), None);
        assert_eq!(address("17"), Some(17));
        assert_eq!(address("1x"), None);
    }

    #[test]
    fn test_names_keep_their_digits() {
        assert_eq!(identifier("X12"), Ok(("", "X12")));
        assert_eq!(identifier("Loop3 rest"), Ok((" rest", "Loop3")));
        assert_eq!(placeholder_identifier("_V1"), Ok(("", "_V1")));
        assert_ne!(
            name_token(Dialect::Template, "_var1"),
            name_token(Dialect::Template, "_var2")
        );
        assert_eq!(
            program("if X12 not 0 goto L3"),
            Ok(StatementKind::ConditionalGoto {
                var: "X12".into(),
                target: Target::Label("L3".into())
            })
        );
    }

    #[test]
    fn test_basic_forms() {
        assert_eq!(program("X++"), Ok(StatementKind::Increment("X".into())));
        assert_eq!(program("Z2--"), Ok(StatementKind::Decrement("Z2".into())));
        assert_eq!(program("skip"), Ok(StatementKind::Skip));
        assert_eq!(program("exit"), Ok(StatementKind::Exit));
        assert_eq!(
            program("if X not 0 goto A"),
            Ok(StatementKind::ConditionalGoto {
                var: "X".into(),
                target: Target::Label("A".into())
            })
        );
        assert_eq!(
            program("if X not 0 goto 4"),
            Ok(StatementKind::ConditionalGoto {
                var: "X".into(),
                target: Target::Address(4)
            })
        );
    }

    #[test]
    fn test_label_is_extracted_before_classification() {
        let stmt = parse_statement_str("[A1] Y++", Dialect::Program).unwrap();
        assert_eq!(stmt.label.as_deref(), Some("A1"));
        assert_eq!(stmt.kind, StatementKind::Increment("Y".into()));
    }

    #[test]
    fn test_macro_call_form() {
        let kind = program("assign Y X").unwrap();
        match kind {
            StatementKind::MacroCall { prefix, args } => {
                assert_eq!(prefix, "assign");
                assert_eq!(args.to_vec(), vec!["Y".to_string(), "X".to_string()]);
            }
            other => panic!("expected macro call, got {:?}", other),
        }
    }

    #[test]
    fn test_token_count_errors() {
        assert_eq!(program("X++ Y"), Err(SyntaxErrorKind::TooManyTokens));
        assert_eq!(program("skip now"), Err(SyntaxErrorKind::TooManyTokens));
        assert_eq!(program("if X not 0"), Err(SyntaxErrorKind::NotEnoughTokens));
        assert_eq!(
            program("if X not 0 goto A B"),
            Err(SyntaxErrorKind::TooManyTokens)
        );
        assert_eq!(program("[A]"), Err(SyntaxErrorKind::MissingStatement));
    }

    #[test]
    fn test_malformed_goto_clause() {
        assert_eq!(
            program("if X is 0 goto A"),
            Err(SyntaxErrorKind::MalformedGoto)
        );
        assert_eq!(
            program("if X not 1 goto A"),
            Err(SyntaxErrorKind::MalformedGoto)
        );
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(
            program("1X++"),
            Err(SyntaxErrorKind::InvalidIdentifier("1X".into()))
        );
        assert_eq!(
            program("[_A] skip"),
            Err(SyntaxErrorKind::InvalidIdentifier("[_A]".into()))
        );
        assert_eq!(
            program("zero 5"),
            Err(SyntaxErrorKind::InvalidMacroArgument("5".into()))
        );
    }

    #[test]
    fn test_template_dialect_accepts_placeholders() {
        let stmt = parse_statement_str("[_label1] if _var1 not 0 goto E", Dialect::Template)
            .unwrap();
        assert_eq!(stmt.label.as_deref(), Some("_label1"));
        assert_eq!(
            stmt.kind,
            StatementKind::ConditionalGoto {
                var: "_var1".into(),
                target: Target::Label("E".into())
            }
        );
    }

    #[test]
    fn test_directive_inside_program_is_rejected() {
        assert_eq!(
            program("%specvar X 1"),
            Err(SyntaxErrorKind::MisplacedDirective)
        );
    }

    #[test]
    fn test_parse_program_keeps_line_numbers() {
        let lines = vec![SourceLine::new(2, "X++"), SourceLine::new(5, "bad token here++")];
        let err = parse_program(&lines, FileId::new(0), Dialect::Program).unwrap_err();
        assert_eq!(err.line(), 5);
    }
}
