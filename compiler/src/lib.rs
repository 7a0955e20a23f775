//! G macro compiler
//!
//! Turns a G source program into the resolved, macro-free and label-free
//! form executed by `gmc-runtime`:
//!
//! source → preprocess → directives → macro repository (load + filter)
//! → append `[E] exit` → [check → expand one pass] to fixpoint
//! → label resolution → `%vars` header + passthrough directives + statements

pub mod checker;
pub mod directives;
pub mod error_codes;
pub mod logging;
pub mod macro_system;
pub mod pipeline;
pub mod resolver;
pub mod workspace;

pub use checker::{check_program, CheckReport, SymbolTable};
pub use macro_system::{MacroDefinition, MacroError, MacroExpander, MacroRepository};
pub use pipeline::{
    compile_file, CompilationConfig, CompilationError, CompilationUnit, CompileSummary,
    CompiledProgram, ErrorCategory,
};
pub use resolver::resolve_labels;
