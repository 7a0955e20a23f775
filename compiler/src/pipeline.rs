//! Compilation pipeline
//!
//! A [`CompilationUnit`] owns everything one compilation run needs: the
//! configuration, the source map, the macro repository and the notices
//! gathered along the way. Nothing is shared between runs.

use crate::checker::{check_program, SymbolTable};
use crate::directives::{collect_directives, render_header, Directive};
use crate::macro_system::{MacroError, MacroExpander, MacroRepository};
use crate::resolver::resolve_labels;
use diagnostics::{Diagnostic, DiagnosticBuilder, Diagnostics, Location, SourceMap};
use gmc_runtime::RuntimeError;
use log::{debug, info};
use parser::{
    parse_program, preprocess, split_directives, Dialect, Statement, StatementKind, SyntaxError,
    TERMINATE_LABEL,
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_MACRO_ROOT: &str = "macro";
pub const DEFAULT_PACKAGE: &str = "stdlib";
pub const DEFAULT_MAX_EXPANSION_PASSES: usize = 256;
/// Extension of compiled programs
pub const COMPILED_EXTENSION: &str = "g";

/// Configuration for one compilation run
#[derive(Debug, Clone)]
pub struct CompilationConfig {
    /// Directory holding one sub-directory per macro package
    pub macro_root: PathBuf,

    /// Packages loaded, in order
    pub packages: Vec<String>,

    /// Emit `start of macro` / `end of macro` comments
    pub annotate: bool,

    /// Stop with a recursion error after this many expansion passes;
    /// 0 removes the limit
    pub max_expansion_passes: usize,

    /// Keep the program text after every expansion pass
    pub keep_pass_snapshots: bool,
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self {
            macro_root: PathBuf::from(DEFAULT_MACRO_ROOT),
            packages: vec![DEFAULT_PACKAGE.to_string()],
            annotate: false,
            max_expansion_passes: DEFAULT_MAX_EXPANSION_PASSES,
            keep_pass_snapshots: false,
        }
    }
}

impl CompilationConfig {
    /// No packages: macros are registered with
    /// [`CompilationUnit::add_macro_source`]
    pub fn in_memory() -> Self {
        Self {
            packages: Vec::new(),
            ..Self::default()
        }
    }

    /// Annotated output and pass snapshots
    pub fn debug() -> Self {
        Self {
            annotate: true,
            keep_pass_snapshots: true,
            ..Self::default()
        }
    }
}

/// Categories of compilation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    /// Macro repository could not be built
    LoadError,

    /// Statement or program-level syntax error
    SyntaxError,

    /// Macro call could not be instantiated
    ExpansionError,

    /// Broken compiler invariant
    InternalError,

    /// File could not be read or written
    IoError,

    /// Invalid `gmc.toml`
    ConfigError,

    /// Compiled program failed to load or run
    RuntimeError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::LoadError => "load error",
            ErrorCategory::SyntaxError => "syntax error",
            ErrorCategory::ExpansionError => "expansion error",
            ErrorCategory::InternalError => "internal error",
            ErrorCategory::IoError => "I/O error",
            ErrorCategory::ConfigError => "configuration error",
            ErrorCategory::RuntimeError => "runtime error",
        };
        write!(f, "{}", name)
    }
}

/// A fatal compilation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationError {
    /// Error message
    pub message: String,

    /// Registry code, e.g. `E0022`
    pub code: String,

    /// Error category
    pub category: ErrorCategory,

    /// Source location of the error
    pub location: Option<Location>,

    /// Offending statement as the compiler saw it
    pub statement: Option<String>,

    /// Optional suggestion for fixing the error
    pub suggestion: Option<String>,
}

impl CompilationError {
    /// Broken postcondition, reported with code E9001
    pub fn internal(message: impl Into<String>, statement: &Statement) -> Self {
        Self {
            message: message.into(),
            code: "E9001".to_string(),
            category: ErrorCategory::InternalError,
            location: Some(statement.origin),
            statement: Some(statement.to_string()),
            suggestion: Some("this is a compiler bug; please report it with the source program".to_string()),
        }
    }

    pub fn io(path: &Path, error: &std::io::Error) -> Self {
        Self {
            message: format!("cannot access {}: {}", path.display(), error),
            code: "E0802".to_string(),
            category: ErrorCategory::IoError,
            location: None,
            statement: None,
            suggestion: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: "E0801".to_string(),
            category: ErrorCategory::ConfigError,
            location: None,
            statement: None,
            suggestion: Some("check gmc.toml syntax".to_string()),
        }
    }

    /// 1-based source line, when the error has one
    pub fn line(&self) -> Option<usize> {
        self.location
            .filter(|location| !location.is_synthetic())
            .map(|location| location.line)
    }

    /// Convert to a standard Diagnostic for formatted output
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = DiagnosticBuilder::error(self.message.clone()).code(self.code.clone());
        if let Some(location) = self.location {
            builder = builder.location(location);
        }
        if let Some(statement) = &self.statement {
            builder = builder.statement(statement.clone());
        }
        if let Some(suggestion) = &self.suggestion {
            builder = builder.help(suggestion.clone());
        }
        builder.build()
    }
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line() {
            Some(line) => write!(f, "Error on line {}: {}", line, self.message)?,
            None => write!(f, "{}: {}", self.category, self.message)?,
        }
        if let Some(statement) = &self.statement {
            write!(f, "\n{}", statement)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilationError {}

impl From<SyntaxError> for CompilationError {
    fn from(error: SyntaxError) -> Self {
        let diagnostic = error.to_diagnostic();
        Self {
            message: error.kind.to_string(),
            code: error.kind.code().to_string(),
            category: ErrorCategory::SyntaxError,
            location: Some(error.location),
            statement: Some(error.statement),
            suggestion: diagnostic.help.into_iter().next(),
        }
    }
}

impl From<RuntimeError> for CompilationError {
    fn from(error: RuntimeError) -> Self {
        Self {
            message: error.kind.to_string(),
            code: error.code().to_string(),
            category: ErrorCategory::RuntimeError,
            location: error.location,
            statement: error.statement,
            suggestion: None,
        }
    }
}

/// Output of a successful compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    /// `%vars` manifest, output variable first
    pub variables: Vec<String>,
    /// Source directives passed through verbatim
    pub directives: Vec<Directive>,
    /// Resolved statements; the last one is always `exit`
    pub statements: Vec<Statement>,
    /// Every declared label with its resolved address
    pub labels: Vec<(String, usize)>,
    /// Number of expansion passes run
    pub passes: usize,
    /// Number of macro calls expanded across all passes
    pub expansions: usize,
    /// Program text after each expansion pass, when requested
    pub snapshots: Vec<String>,
}

impl CompiledProgram {
    /// The compiled file: header lines then one statement per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in render_header(self.variables.iter().map(String::as_str), &self.directives) {
            out.push_str(&line);
            out.push('\n');
        }
        for statement in &self.statements {
            out.push_str(&statement.render());
            out.push('\n');
        }
        out
    }

    pub fn summary(&self) -> CompileSummary {
        CompileSummary {
            variables: self.variables.clone(),
            labels: self
                .labels
                .iter()
                .map(|(label, address)| LabelAddress {
                    label: label.clone(),
                    address: *address,
                })
                .collect(),
            directives: self.directives.iter().map(|d| d.text.clone()).collect(),
            statements: self.statements.len(),
            passes: self.passes,
            expansions: self.expansions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelAddress {
    pub label: String,
    pub address: usize,
}

/// Serializable overview printed by `gmc check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileSummary {
    pub variables: Vec<String>,
    pub labels: Vec<LabelAddress>,
    pub directives: Vec<String>,
    pub statements: usize,
    pub passes: usize,
    pub expansions: usize,
}

impl CompileSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One compilation run
pub struct CompilationUnit {
    pub config: CompilationConfig,
    source_map: SourceMap,
    repository: MacroRepository,
    macros_filtered: bool,
}

impl CompilationUnit {
    pub fn new(config: CompilationConfig) -> Self {
        Self {
            config,
            source_map: SourceMap::new(),
            repository: MacroRepository::new(),
            macros_filtered: false,
        }
    }

    /// Load the configured packages and run the dependency filter
    pub fn load_macros(&mut self) -> Result<(), CompilationError> {
        info!(
            "Loading macro packages {:?} from {}",
            self.config.packages,
            self.config.macro_root.display()
        );
        for package in &self.config.packages {
            self.repository
                .load_package(&self.config.macro_root, package, &mut self.source_map)?;
        }
        self.filter_macros();
        Ok(())
    }

    /// Register an in-memory macro resource
    pub fn add_macro_source(&mut self, name: &str, source: &str) -> Result<(), CompilationError> {
        self.repository
            .add_source(name, source, &mut self.source_map)?;
        Ok(())
    }

    /// Run the single-pass dependency filter once for this unit
    pub fn filter_macros(&mut self) {
        if self.macros_filtered {
            return;
        }
        let removed = self.repository.filter_unsatisfied();
        if !removed.is_empty() {
            debug!("{} macro(s) unloaded by the dependency filter", removed.len());
        }
        self.macros_filtered = true;
    }

    pub fn repository(&self) -> &MacroRepository {
        &self.repository
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Warnings and informational notices from loading and filtering
    pub fn notices(&self) -> &Diagnostics {
        self.repository.notices()
    }

    /// Compile one source program
    pub fn compile(&mut self, name: &str, source: &str) -> Result<CompiledProgram, CompilationError> {
        self.filter_macros();
        info!("Compiling {}", name);

        let file_id = self.source_map.add_file(name, source);
        let (header, body) = split_directives(preprocess(source));
        let directives = collect_directives(&header, file_id);

        let mut program = parse_program(&body, file_id, Dialect::Program)?;
        program.push(Statement::labeled(
            TERMINATE_LABEL,
            StatementKind::Exit,
            Location::synthetic(file_id),
        ));

        let mut symbols = SymbolTable::new();
        let mut report = check_program(&program, &self.repository, &mut symbols)?;

        let expander = MacroExpander::new(&self.repository).with_annotations(self.config.annotate);
        let mut passes = 0;
        let mut expansions = 0;
        let mut snapshots = Vec::new();

        while report.has_macro_calls() {
            let limit = self.config.max_expansion_passes;
            if limit > 0 && passes >= limit {
                return Err(recursion_limit(&program, limit).into());
            }
            expansions += expander.expand_pass(&mut program, &mut symbols)?;
            passes += 1;
            if self.config.keep_pass_snapshots {
                snapshots.push(render_statements(&program));
            }
            report = check_program(&program, &self.repository, &mut symbols)?;
            debug!(
                "pass {}: {} statement(s), {} call(s) left",
                passes, report.statements, report.macro_calls
            );
        }

        let resolved = resolve_labels(program)?;
        info!(
            "Compiled {}: {} statement(s), {} variable(s), {} expansion pass(es)",
            name,
            resolved.statements.len(),
            symbols.variable_count(),
            passes
        );

        Ok(CompiledProgram {
            variables: symbols.variables().map(str::to_string).collect(),
            directives,
            statements: resolved.statements,
            labels: resolved.addresses,
            passes,
            expansions,
            snapshots,
        })
    }
}

fn render_statements(program: &[Statement]) -> String {
    let mut out = String::new();
    for statement in program {
        out.push_str(&statement.render());
        out.push('\n');
    }
    out
}

fn recursion_limit(program: &[Statement], max_passes: usize) -> MacroError {
    let pending = program
        .iter()
        .find(|statement| statement.kind.is_macro_call());
    let macro_name = match pending.map(|statement| &statement.kind) {
        Some(StatementKind::MacroCall { prefix, .. }) => prefix.clone(),
        _ => String::new(),
    };
    MacroError::RecursionLimitExceeded {
        macro_name,
        max_passes,
        statement: pending.map(|s| s.to_string()).unwrap_or_default(),
        location: pending
            .map(|s| s.origin)
            .unwrap_or_else(|| Location::synthetic(diagnostics::FileId::new(0))),
    }
}

/// Read and compile a source file with an already loaded unit
pub fn compile_file(
    unit: &mut CompilationUnit,
    path: &Path,
) -> Result<CompiledProgram, CompilationError> {
    let source =
        std::fs::read_to_string(path).map_err(|e| CompilationError::io(path, &e))?;
    unit.compile(&path.display().to_string(), &source)
}

/// `dir/prog.gc` → `dir/prog.g`
pub fn compiled_path(source: &Path) -> PathBuf {
    source.with_extension(COMPILED_EXTENSION)
}

/// `dir/prog.gc`, pass 2 → `dir/prog.g2`
pub fn snapshot_path(source: &Path, pass: usize) -> PathBuf {
    source.with_extension(format!("{}{}", COMPILED_EXTENSION, pass))
}
