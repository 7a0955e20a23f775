use nom::IResult;

// G language AST and parser
pub mod g_ast;
pub mod g_parser;
pub mod preprocessor;

// Syntax errors, reported through the diagnostics crate
pub mod error;

// Re-export diagnostics from the diagnostics crate
pub use diagnostics::*;

pub use error::{SyntaxError, SyntaxErrorKind};
pub use g_ast::*;
pub use g_parser::{
    address, identifier, label_declaration, name_token, parse_program, parse_statement,
    parse_statement_str, placeholder_identifier,
};
pub use preprocessor::{preprocess, split_directives, SourceLine};

// Plain nom result type used by the token grammars
pub type NomParseResult<'a, T> = IResult<&'a str, T, nom::error::Error<&'a str>>;
