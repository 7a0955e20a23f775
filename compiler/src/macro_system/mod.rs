//! G Macro System
//!
//! Reusable macros live in `.gmacro` resources grouped into packages
//! (sub-directories of a macro root). This module covers:
//!
//! - **Repository**: loading packages, parsing header directives
//!   (`%prefix`, `%input`, `%require`) and the single-pass dependency filter
//! - **Templates**: macro bodies parsed once at load time into typed
//!   statements whose operands are classified placeholders
//! - **Expander**: hygienic instantiation of one macro call at a time,
//!   with a synthesized exit-site label per call

pub mod errors;
pub mod expander;
pub mod registry;
pub mod template;

pub use errors::MacroError;
pub use expander::MacroExpander;
pub use registry::{MacroDefinition, MacroRepository, MACRO_EXTENSION};
pub use template::{Operand, TemplateKind, TemplateStatement};
