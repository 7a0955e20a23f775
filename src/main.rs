//! gmc - G register-machine macro compiler
//!
//! # Usage
//!
//! ```bash
//! # Compile prog.gc to prog.g using the stdlib macro package
//! gmc compile prog.gc
//!
//! # Compile and keep every expansion pass as prog.g1, prog.g2, ...
//! gmc compile --dump-passes --annotate prog.gc
//!
//! # Run a compiled program
//! gmc run prog.g
//!
//! # Compile and run in one step
//! gmc exec prog.gc
//!
//! # List the macros that survive dependency filtering
//! gmc macros --format json
//! ```

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use compiler::error_codes::error_registry;
use compiler::logging;
use compiler::pipeline::{compiled_path, snapshot_path};
use compiler::workspace::{self, Project};
use compiler::{CompilationConfig, CompilationError, CompilationUnit, CompiledProgram};
use gmc_runtime::{ExecutionReport, Machine, ProgramImage, StepOutcome};
use parser::{Diagnostic, DiagnosticSeverity, ErrorFormatter, SourceMap};
use serde::Serialize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "gmc")]
#[command(version = "0.1.0")]
#[command(about = "G register-machine macro compiler and interpreter", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to gmc.toml (defaults to the nearest one above the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a G source file to a resolved `.g` program
    Compile {
        /// Path to the G source file
        file: PathBuf,

        /// Output file path (defaults to the source path with a `.g` extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the program after every expansion pass as `.g1`, `.g2`, ...
        #[arg(long)]
        dump_passes: bool,

        #[command(flatten)]
        macros: MacroOptions,
    },

    /// Compile without writing output and print a summary
    Check {
        /// Path to the G source file
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        macros: MacroOptions,
    },

    /// Interpret a compiled `.g` program
    Run {
        /// Path to the compiled program
        file: PathBuf,

        /// Log every executed instruction
        #[arg(long)]
        trace: bool,

        /// Pause before every instruction
        #[arg(long)]
        step: bool,

        /// Stop with an error after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Compile a source file and run the result
    Exec {
        /// Path to the G source file
        file: PathBuf,

        /// Stop with an error after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        macros: MacroOptions,
    },

    /// List the loaded macro repository
    Macros {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        macros: MacroOptions,
    },

    /// Describe an error code, e.g. `gmc explain E0022`
    Explain {
        /// Error code; lists every code when omitted
        code: Option<String>,
    },
}

/// Macro loading and expansion flags shared by the compiling subcommands
#[derive(Args, Clone, Debug, Default)]
struct MacroOptions {
    /// Directory holding the macro packages
    #[arg(long)]
    macro_root: Option<PathBuf>,

    /// Macro package to load (repeatable; replaces the configured list)
    #[arg(long = "package", short = 'p')]
    packages: Vec<String>,

    /// Annotate expanded macros with start/end comments
    #[arg(long)]
    annotate: bool,

    /// Expansion pass limit (0 disables the limit)
    #[arg(long)]
    max_passes: Option<usize>,
}

impl MacroOptions {
    fn apply(&self, config: &mut CompilationConfig) {
        if let Some(root) = &self.macro_root {
            config.macro_root = root.clone();
        }
        if !self.packages.is_empty() {
            config.packages = self.packages.clone();
        }
        if self.annotate {
            config.annotate = true;
        }
        if let Some(limit) = self.max_passes {
            config.max_expansion_passes = limit;
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

/// Settings shared by every subcommand
struct Context {
    project: Project,
    verbose: u8,
    formatter: ErrorFormatter,
}

fn main() {
    let cli = Cli::parse();

    let tracing = matches!(cli.command, Commands::Run { trace: true, .. });
    if tracing {
        logging::init_with_level(log::LevelFilter::Trace);
    } else if cli.verbose > 0 {
        logging::init_with_level(logging::level_for_verbosity(cli.verbose));
    } else {
        logging::init_from_env();
    }

    let formatter = if std::io::stderr().is_terminal() {
        ErrorFormatter::with_colors()
    } else {
        ErrorFormatter::new()
    };

    let result = load_project(cli.config.as_deref())
        .map_err(|e| render_error(&formatter, &e, &SourceMap::new()))
        .and_then(|project| {
            let ctx = Context {
                project,
                verbose: cli.verbose,
                formatter,
            };
            dispatch(cli.command, &ctx)
        });

    if let Err(e) = result {
        eprintln!("{}", e.trim_end());
        process::exit(1);
    }
}

fn dispatch(command: Commands, ctx: &Context) -> Result<(), String> {
    match command {
        Commands::Compile {
            file,
            output,
            dump_passes,
            macros,
        } => compile_command(ctx, &file, output, dump_passes, &macros),
        Commands::Check {
            file,
            format,
            macros,
        } => check_command(ctx, &file, format, &macros),
        Commands::Run {
            file,
            trace: _,
            step,
            max_steps,
            format,
        } => run_command(ctx, &file, step, max_steps, format),
        Commands::Exec {
            file,
            max_steps,
            format,
            macros,
        } => exec_command(ctx, &file, max_steps, format, &macros),
        Commands::Macros { format, macros } => macros_command(ctx, format, &macros),
        Commands::Explain { code } => explain_command(code.as_deref()),
    }
}

fn load_project(config: Option<&Path>) -> Result<Project, CompilationError> {
    match config {
        Some(path) => workspace::load_project(path),
        None => {
            let cwd = std::env::current_dir().map_err(|e| CompilationError::io(Path::new("."), &e))?;
            workspace::discover_project(&cwd)
        }
    }
}

fn render_error(formatter: &ErrorFormatter, error: &CompilationError, source_map: &SourceMap) -> String {
    formatter.format_diagnostic(&error.to_diagnostic(), source_map)
}

fn print_notice(ctx: &Context, diagnostic: &Diagnostic, source_map: &SourceMap) {
    let visible = match diagnostic.severity {
        DiagnosticSeverity::Info => ctx.verbose > 0,
        _ => true,
    };
    if visible {
        eprint!("{}", ctx.formatter.format_diagnostic(diagnostic, source_map));
    }
}

/// A compilation unit with the configured packages loaded and filtered
fn load_unit(ctx: &Context, options: &MacroOptions, snapshots: bool) -> Result<CompilationUnit, String> {
    let mut config = ctx.project.compilation_config();
    options.apply(&mut config);
    config.keep_pass_snapshots = snapshots;

    let mut unit = CompilationUnit::new(config);
    let loaded = unit.load_macros();
    for notice in &unit.notices().diagnostics {
        print_notice(ctx, notice, unit.source_map());
    }
    loaded.map_err(|e| render_error(&ctx.formatter, &e, unit.source_map()))?;
    Ok(unit)
}

fn compile(ctx: &Context, file: &Path, options: &MacroOptions, snapshots: bool) -> Result<CompiledProgram, String> {
    let mut unit = load_unit(ctx, options, snapshots)?;
    compiler::compile_file(&mut unit, file).map_err(|e| render_error(&ctx.formatter, &e, unit.source_map()))
}

fn write_file(path: &Path, contents: &str) -> Result<(), String> {
    std::fs::write(path, contents)
        .map_err(|e| CompilationError::io(path, &e).to_string())
}

fn compile_command(
    ctx: &Context,
    file: &Path,
    output: Option<PathBuf>,
    dump_passes: bool,
    options: &MacroOptions,
) -> Result<(), String> {
    let program = compile(ctx, file, options, dump_passes)?;

    for (index, snapshot) in program.snapshots.iter().enumerate() {
        let path = snapshot_path(file, index + 1);
        write_file(&path, snapshot)?;
        log::info!("Wrote pass {} to {}", index + 1, path.display());
    }

    let output = output.unwrap_or_else(|| compiled_path(file));
    write_file(&output, &program.render())?;
    println!("Wrote compiled code to {}", output.display());
    Ok(())
}

fn check_command(ctx: &Context, file: &Path, format: OutputFormat, options: &MacroOptions) -> Result<(), String> {
    let program = compile(ctx, file, options, false)?;
    let summary = program.summary();

    match format {
        OutputFormat::Text => {
            println!("✓ {}: OK", file.display());
            println!("  Variables:  {}", summary.variables.join(","));
            println!("  Labels:     {}", summary.labels.len());
            println!("  Directives: {}", summary.directives.len());
            println!("  Statements: {}", summary.statements);
            println!(
                "  Expansion:  {} pass(es), {} macro call(s)",
                summary.passes, summary.expansions
            );
        }
        OutputFormat::Json => {
            let json = summary.to_json().map_err(|e| format!("Failed to serialize summary: {}", e))?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_command(
    ctx: &Context,
    file: &Path,
    step: bool,
    max_steps: Option<u64>,
    format: OutputFormat,
) -> Result<(), String> {
    let text = std::fs::read_to_string(file).map_err(|e| CompilationError::io(file, &e).to_string())?;
    let mut source_map = SourceMap::new();
    let file_id = source_map.add_file(file.display().to_string(), text.clone());
    let report = execute(ctx, &text, file_id, max_steps, step)
        .map_err(|e| render_error(&ctx.formatter, &e, &source_map))?;
    print_report(&report, format)
}

fn exec_command(
    ctx: &Context,
    file: &Path,
    max_steps: Option<u64>,
    format: OutputFormat,
    options: &MacroOptions,
) -> Result<(), String> {
    let compiled = compile(ctx, file, options, false)?.render();
    let mut source_map = SourceMap::new();
    let name = compiled_path(file).display().to_string();
    let file_id = source_map.add_file(name, compiled.clone());
    let report = execute(ctx, &compiled, file_id, max_steps, false)
        .map_err(|e| render_error(&ctx.formatter, &e, &source_map))?;
    print_report(&report, format)
}

fn execute(
    ctx: &Context,
    text: &str,
    file_id: parser::FileId,
    max_steps: Option<u64>,
    step: bool,
) -> Result<ExecutionReport, CompilationError> {
    let image = ProgramImage::parse_with_file(text, file_id)?;
    let limit = max_steps.or_else(|| ctx.project.max_steps());
    let mut machine = Machine::new(&image).with_max_steps(limit);
    if !step {
        return Ok(machine.run()?);
    }

    let stdin = std::io::stdin();
    let mut input = String::new();
    while let Some(next) = machine.next_instruction() {
        println!("State: {}", format_state(&machine.report()));
        println!("Next instruction: {}", next);
        print!("Enter to proceed");
        std::io::stdout()
            .flush()
            .map_err(|e| CompilationError::io(Path::new("<stdout>"), &e))?;
        input.clear();
        stdin
            .lock()
            .read_line(&mut input)
            .map_err(|e| CompilationError::io(Path::new("<stdin>"), &e))?;
        println!();
        if machine.step()? == StepOutcome::Halted {
            break;
        }
    }
    Ok(machine.report())
}

fn format_state(report: &ExecutionReport) -> String {
    let cells: Vec<String> = report
        .state
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect();
    format!("{{{}}}", cells.join(", "))
}

fn print_report(report: &ExecutionReport, format: OutputFormat) -> Result<(), String> {
    match format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| format!("Failed to serialize report: {}", e))?;
            println!("{}", json);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct MacroListing<'a> {
    name: &'a str,
    prefix: &'a str,
    variables: usize,
    labels: usize,
    requires: &'a [String],
    package: Option<&'a str>,
}

fn macros_command(ctx: &Context, format: OutputFormat, options: &MacroOptions) -> Result<(), String> {
    let unit = load_unit(ctx, options, false)?;
    let listings: Vec<MacroListing> = unit
        .repository()
        .iter()
        .map(|definition| MacroListing {
            name: &definition.name,
            prefix: &definition.prefix,
            variables: definition.var_count,
            labels: definition.label_count,
            requires: &definition.requires,
            package: definition.package.as_deref(),
        })
        .collect();

    match format {
        OutputFormat::Text => {
            if listings.is_empty() {
                println!("No macros loaded");
            }
            for listing in &listings {
                print!(
                    "{:<12} {} variable(s), {} label(s)",
                    listing.prefix, listing.variables, listing.labels
                );
                if !listing.requires.is_empty() {
                    print!("  requires {}", listing.requires.join(", "));
                }
                if let Some(package) = listing.package {
                    print!("  [{}/{}]", package, listing.name);
                }
                println!();
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&listings)
                .map_err(|e| format!("Failed to serialize macro list: {}", e))?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn explain_command(code: Option<&str>) -> Result<(), String> {
    let Some(code) = code else {
        for entry in error_registry().get_range(0, u16::MAX) {
            println!("{}", entry);
        }
        return Ok(());
    };
    let normalized = code.trim().to_ascii_uppercase();
    let entry = error_registry()
        .get_by_string(&normalized)
        .ok_or_else(|| format!("Unknown error code `{}`", code))?;
    println!("{}", entry);
    if let Some(help) = entry.help {
        println!("  help: {}", help);
    }
    Ok(())
}
