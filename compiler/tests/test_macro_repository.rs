//! Integration tests for macro packages on disk: loading, dependency
//! filtering and the shipped standard library.

use compiler::pipeline::{compile_file, compiled_path};
use compiler::{CompilationConfig, CompilationUnit, ErrorCategory, MacroRepository};
use diagnostics::{DiagnosticSeverity, SourceMap};
use gmc_runtime::execute;
use std::fs;
use std::path::{Path, PathBuf};

// ================================================================
// HELPERS
// ================================================================

fn write_package(root: &Path, package: &str, macros: &[(&str, &str)]) {
    let dir = root.join(package);
    fs::create_dir_all(&dir).unwrap();
    for (name, source) in macros {
        fs::write(dir.join(format!("{}.gmacro", name)), source).unwrap();
    }
}

fn unit_for(root: &Path, packages: &[&str]) -> CompilationUnit {
    compiler::logging::init_test();
    CompilationUnit::new(CompilationConfig {
        macro_root: root.to_path_buf(),
        packages: packages.iter().map(|p| p.to_string()).collect(),
        ..CompilationConfig::default()
    })
}

fn shipped_macro_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("macro")
}

// ================================================================
// LOADING
// ================================================================

#[test]
fn test_load_order_follows_file_names() {
    let dir = tempfile::tempdir().unwrap();
    write_package(
        dir.path(),
        "lib",
        &[
            ("zz", "%prefix last\nskip\n"),
            ("aa", "%prefix first\nskip\n"),
            ("mm", "%prefix middle\nskip\n"),
            ("notes", "not a macro"),
        ],
    );
    // Only .gmacro files are resources
    fs::write(dir.path().join("lib").join("readme.txt"), "ignored").unwrap();

    let mut map = SourceMap::new();
    let repo = MacroRepository::load(dir.path(), &["lib".to_string()], &mut map);
    let err = repo.unwrap_err();
    // notes.gmacro has no %prefix
    assert_eq!(err.error_code(), "E0702");

    fs::remove_file(dir.path().join("lib").join("notes.gmacro")).unwrap();
    let repo = MacroRepository::load(dir.path(), &["lib".to_string()], &mut map).unwrap();
    let prefixes: Vec<&str> = repo.prefixes().collect();
    assert_eq!(prefixes, vec!["first", "middle", "last"]);
    assert_eq!(repo.get("first").unwrap().package.as_deref(), Some("lib"));
}

#[test]
fn test_packages_load_in_configured_order() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "one", &[("a", "%prefix a\nskip\n")]);
    write_package(dir.path(), "two", &[("b", "%prefix b\n%require a\nskip\n")]);

    let mut unit = unit_for(dir.path(), &["two", "one"]);
    unit.load_macros().unwrap();
    let prefixes: Vec<&str> = unit.repository().prefixes().collect();
    assert_eq!(prefixes, vec!["b", "a"]);
}

#[test]
fn test_missing_package() {
    let dir = tempfile::tempdir().unwrap();
    let err = unit_for(dir.path(), &["nope"]).load_macros().unwrap_err();
    assert_eq!(err.code, "E0701");
    assert_eq!(err.category, ErrorCategory::LoadError);
}

#[test]
fn test_duplicate_prefix_across_packages() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "one", &[("clear", "%prefix zero\nskip\n")]);
    write_package(dir.path(), "two", &[("zero", "%prefix zero\nskip\n")]);
    let err = unit_for(dir.path(), &["one", "two"]).load_macros().unwrap_err();
    assert_eq!(err.code, "E0703");
    assert!(err.message.contains("clear"));
    assert!(err.message.contains("zero"));
}

#[test]
fn test_malformed_template_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    write_package(
        dir.path(),
        "lib",
        &[("bad", "%prefix bad\n%input 1 variable 0 labels\n_V2++\n")],
    );
    let err = unit_for(dir.path(), &["lib"]).load_macros().unwrap_err();
    assert_eq!(err.code, "E0706");
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_unknown_header_directive_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    write_package(
        dir.path(),
        "lib",
        &[("inc", "%prefix inc\n%input 1 0\n%author someone\n_V1++\n")],
    );
    let mut unit = unit_for(dir.path(), &["lib"]);
    unit.load_macros().unwrap();
    assert!(unit.repository().contains("inc"));
    let warnings: Vec<_> = unit.notices().warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, DiagnosticSeverity::Warning);
}

// ================================================================
// DEPENDENCY FILTER
// ================================================================

#[test]
fn test_filter_is_single_pass() {
    let dir = tempfile::tempdir().unwrap();
    write_package(
        dir.path(),
        "lib",
        &[
            ("a", "%prefix a\n%require b\nb\n"),
            ("b", "%prefix b\n%require c\nskip\n"),
            ("d", "%prefix d\nskip\n"),
        ],
    );
    let mut unit = unit_for(dir.path(), &["lib"]);
    unit.load_macros().unwrap();

    // b is unloaded for missing c; a survives because b was present when
    // the filter looked
    assert!(unit.repository().contains("a"));
    assert!(!unit.repository().contains("b"));
    assert!(unit.repository().contains("d"));
    assert_eq!(unit.notices().infos().count(), 1);

    // ...and a call to a then fails on the next pass
    let err = unit.compile("p.gc", "Y++\na\n").unwrap_err();
    assert_eq!(err.code, "E0021");
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.statement.as_deref(), Some("b"));
}

// ================================================================
// SHIPPED STANDARD LIBRARY
// ================================================================

#[test]
fn test_stdlib_loads_completely() {
    let mut unit = unit_for(&shipped_macro_root(), &["stdlib"]);
    unit.load_macros().unwrap();
    let mut prefixes: Vec<&str> = unit.repository().prefixes().collect();
    prefixes.sort_unstable();
    assert_eq!(prefixes, vec!["add", "assign", "goto", "zero"]);
    assert_eq!(unit.notices().len(), 0);
}

#[test]
fn test_stdlib_arithmetic_program() {
    let mut unit = unit_for(&shipped_macro_root(), &["stdlib"]);
    unit.load_macros().unwrap();
    let program = unit
        .compile(
            "sum.gc",
            "%specvar X1 3\n%specvar X2 4\nassign Y X1\nadd Y X2\n",
        )
        .unwrap();
    assert!(program.passes >= 2);
    assert_eq!(program.variables[0], "Y");
    assert_eq!(program.statements.last().map(|s| s.to_string()).as_deref(), Some("exit"));

    let report = execute(&program.render(), Some(100_000)).unwrap();
    assert_eq!(report.output, 7);
    assert_eq!(report.state.get("X1"), Some(&3));
    assert_eq!(report.state.get("X2"), Some(&4));
}

#[test]
fn test_compile_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clear.gc");
    fs::write(&source, "%specvar X 9\nzero X\nY++\n").unwrap();

    let mut unit = unit_for(&shipped_macro_root(), &["stdlib"]);
    unit.load_macros().unwrap();
    let program = compile_file(&mut unit, &source).unwrap();
    fs::write(compiled_path(&source), program.render()).unwrap();

    let compiled = fs::read_to_string(dir.path().join("clear.g")).unwrap();
    let report = execute(&compiled, None).unwrap();
    assert_eq!(report.output, 1);
    assert_eq!(report.state.get("X"), Some(&0));

    let err = compile_file(&mut unit, &dir.path().join("missing.gc")).unwrap_err();
    assert_eq!(err.category, ErrorCategory::IoError);
}
