//! Macro repository
//!
//! Maps prefixes to macro definitions. A repository is built fresh for
//! every compilation run from the packages named in the configuration and
//! discarded afterwards.

use super::errors::MacroError;
use super::template::{parse_template, TemplateStatement};
use crate::directives::{collect_directives, Directive};
use diagnostics::{DiagnosticBuilder, Diagnostics, FileId, Location, SourceMap};
use fxhash::FxBuildHasher;
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::{debug, info, warn};
use parser::{preprocess, split_directives, DIRECTIVE_MARKER, KEYWORDS};
use std::path::Path;
use walkdir::WalkDir;

/// File extension of macro resources
pub const MACRO_EXTENSION: &str = "gmacro";

/// A loaded macro
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    /// Resource file stem
    pub name: String,
    pub prefix: String,
    /// Number of formal variable inputs (`_V1.._Vn`)
    pub var_count: usize,
    /// Number of formal label inputs (`_L1.._Ln`)
    pub label_count: usize,
    /// Prefixes this macro depends on
    pub requires: Vec<String>,
    pub body: Vec<TemplateStatement>,
    /// Package the resource was loaded from; `None` for in-memory sources
    pub package: Option<String>,
    /// The `%prefix` line
    pub location: Location,
}

impl MacroDefinition {
    /// Parse a macro resource.
    ///
    /// Unknown header directives are skipped; a warning is pushed onto
    /// `notices` for each.
    pub fn parse(
        name: &str,
        source: &str,
        file_id: FileId,
        package: Option<&str>,
        notices: &mut Diagnostics,
    ) -> Result<Self, MacroError> {
        let (header, body) = split_directives(preprocess(source));
        let header = collect_directives(&header, file_id);

        let mut prefix: Option<(String, Location)> = None;
        let mut arity: Option<(usize, usize)> = None;
        let mut requires = Vec::new();

        let invalid = |directive: &Directive, reason: &str| MacroError::InvalidDirective {
            macro_name: name.to_string(),
            directive: directive.text.clone(),
            reason: reason.to_string(),
            location: directive.location,
        };

        for directive in &header {
            let args = directive.arguments();
            match directive.name() {
                "prefix" => {
                    if prefix.is_some() {
                        return Err(invalid(directive, "prefix declared more than once"));
                    }
                    let [token] = args.as_slice() else {
                        return Err(invalid(
                            directive,
                            "incorrect argument count for prefix directive",
                        ));
                    };
                    if is_reserved_prefix(token) {
                        return Err(MacroError::ReservedPrefix {
                            macro_name: name.to_string(),
                            prefix: token.to_string(),
                            location: directive.location,
                        });
                    }
                    prefix = Some((token.to_string(), directive.location));
                }
                "input" => {
                    if arity.is_some() {
                        return Err(invalid(directive, "input declared more than once"));
                    }
                    arity = Some(parse_input(&args).ok_or_else(|| {
                        invalid(
                            directive,
                            "input directive must read `%input <n> variable(s) <m> label(s)` with non-negative integers",
                        )
                    })?);
                }
                "require" | "requires" => {
                    let [token] = args.as_slice() else {
                        return Err(invalid(
                            directive,
                            "incorrect argument count for require directive",
                        ));
                    };
                    requires.push(token.to_string());
                }
                other => {
                    warn!("macro '{}': ignoring unknown directive %{}", name, other);
                    notices.push(
                        DiagnosticBuilder::warning(format!(
                            "macro '{}': unknown directive `%{}` ignored",
                            name, other
                        ))
                        .location(directive.location)
                        .statement(directive.text.clone())
                        .build(),
                    );
                }
            }
        }

        let (prefix, location) = prefix.ok_or_else(|| MacroError::MissingPrefix {
            macro_name: name.to_string(),
            location: Location::new(file_id, 1),
        })?;
        let (var_count, label_count) = arity.unwrap_or((0, 0));
        let body = parse_template(name, &body, file_id, (var_count, label_count))?;

        Ok(Self {
            name: name.to_string(),
            prefix,
            var_count,
            label_count,
            requires,
            body,
            package: package.map(str::to_string),
            location,
        })
    }

    pub fn arity(&self) -> (usize, usize) {
        (self.var_count, self.label_count)
    }

    /// Total number of call-site arguments
    pub fn argument_count(&self) -> usize {
        self.var_count + self.label_count
    }
}

/// `<n> variable(s) <m> label(s)` or the bare `<n> <m>` form
fn parse_input(args: &[&str]) -> Option<(usize, usize)> {
    let (vars, labels) = match args {
        [vars, _, labels, _] | [vars, labels] => (vars, labels),
        _ => return None,
    };
    let count = |token: &str| {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            token.parse::<usize>().ok()
        } else {
            None
        }
    };
    Some((count(*vars)?, count(*labels)?))
}

/// Tokens that would be read as something other than a macro call
fn is_reserved_prefix(token: &str) -> bool {
    KEYWORDS.contains(&token)
        || token.starts_with('[')
        || token.starts_with(DIRECTIVE_MARKER)
        || token.ends_with("++")
        || token.ends_with("--")
}

/// Prefix → definition, in load order
#[derive(Debug, Default)]
pub struct MacroRepository {
    macros: IndexMap<String, MacroDefinition, FxBuildHasher>,
    notices: Diagnostics,
}

impl MacroRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every package under `root`, in the order given
    pub fn load(
        root: &Path,
        packages: &[String],
        source_map: &mut SourceMap,
    ) -> Result<Self, MacroError> {
        let mut repository = Self::new();
        for package in packages {
            repository.load_package(root, package, source_map)?;
        }
        info!(
            "Loaded {} macro(s) from {} package(s)",
            repository.len(),
            packages.len()
        );
        Ok(repository)
    }

    /// Load all `.gmacro` resources of one package directory, in file-name
    /// order. Returns the number of macros added.
    pub fn load_package(
        &mut self,
        root: &Path,
        package: &str,
        source_map: &mut SourceMap,
    ) -> Result<usize, MacroError> {
        let dir = root.join(package);
        if !dir.is_dir() {
            return Err(MacroError::PackageNotFound {
                package: package.to_string(),
                path: dir,
            });
        }
        debug!("Loading macro package '{}' from {}", package, dir.display());

        let mut loaded = 0;
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| MacroError::Io {
                path: dir.clone(),
                message: e.to_string(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(MACRO_EXTENSION)
            {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let source = std::fs::read_to_string(path).map_err(|e| MacroError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let file_id = source_map.add_file(path.display().to_string(), source.as_str());
            let definition =
                MacroDefinition::parse(name, &source, file_id, Some(package), &mut self.notices)?;
            let definition = self.insert(definition)?;
            debug!(
                "  macro '{}' prefix '{}' input ({}, {})",
                definition.name, definition.prefix, definition.var_count, definition.label_count
            );
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Register an in-memory macro resource
    pub fn add_source(
        &mut self,
        name: &str,
        source: &str,
        source_map: &mut SourceMap,
    ) -> Result<&MacroDefinition, MacroError> {
        let file_id = source_map.add_file(format!("{}.{}", name, MACRO_EXTENSION), source);
        let definition = MacroDefinition::parse(name, source, file_id, None, &mut self.notices)?;
        self.insert(definition)
    }

    fn insert(&mut self, definition: MacroDefinition) -> Result<&MacroDefinition, MacroError> {
        match self.macros.entry(definition.prefix.clone()) {
            Entry::Occupied(existing) => Err(MacroError::DuplicatePrefix {
                prefix: definition.prefix,
                existing: existing.get().name.clone(),
                duplicate: definition.name,
                location: definition.location,
            }),
            Entry::Vacant(slot) => Ok(&*slot.insert(definition)),
        }
    }

    /// Unload every macro with a requirement missing from the repository.
    ///
    /// A single pass: requirements are checked against the repository as it
    /// was before this call, so a macro depending on a macro removed here
    /// survives until the next run.
    pub fn filter_unsatisfied(&mut self) -> Vec<MacroDefinition> {
        let unsatisfied: Vec<(String, String)> = self
            .macros
            .values()
            .filter_map(|definition| {
                definition
                    .requires
                    .iter()
                    .find(|requirement| !self.macros.contains_key(requirement.as_str()))
                    .map(|requirement| (definition.prefix.clone(), requirement.clone()))
            })
            .collect();

        let mut removed = Vec::new();
        for (prefix, requirement) in unsatisfied {
            if let Some(definition) = self.macros.shift_remove(&prefix) {
                warn!(
                    "Unloading macro '{}': missing requirement '{}'",
                    definition.name, requirement
                );
                self.notices.push(
                    DiagnosticBuilder::info(format!(
                        "macro '{}' unloaded: requirement '{}' is not loaded",
                        definition.name, requirement
                    ))
                    .location(definition.location)
                    .build(),
                );
                removed.push(definition);
            }
        }
        removed
    }

    pub fn get(&self, prefix: &str) -> Option<&MacroDefinition> {
        self.macros.get(prefix)
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.macros.contains_key(prefix)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Definitions in load order
    pub fn iter(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.macros.values()
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(String::as_str)
    }

    /// Warnings and informational notices gathered while loading and
    /// filtering
    pub fn notices(&self) -> &Diagnostics {
        &self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macro_system::template::{Operand, TemplateKind};
    use std::fs;

    fn repo_with(sources: &[(&str, &str)]) -> Result<MacroRepository, MacroError> {
        let mut map = SourceMap::new();
        let mut repo = MacroRepository::new();
        for (name, source) in sources {
            repo.add_source(name, source, &mut map)?;
        }
        Ok(repo)
    }

    #[test]
    fn test_header_directives() {
        let repo = repo_with(&[(
            "assign",
            "%prefix assign\n%input 2 variables 0 labels\n%require zero\n%requires goto\n_V1++\n",
        )])
        .unwrap();
        let def = repo.get("assign").unwrap();
        assert_eq!(def.name, "assign");
        assert_eq!(def.arity(), (2, 0));
        assert_eq!(def.requires, vec!["zero", "goto"]);
        assert_eq!(def.body.len(), 1);
        assert_eq!(def.location.line, 1);
    }

    #[test]
    fn test_input_short_form_and_default() {
        let repo = repo_with(&[
            ("a", "%prefix a\n%input 1 1\nif _V1 not 0 goto _L1\n"),
            ("b", "%prefix b\nskip\n"),
        ])
        .unwrap();
        assert_eq!(repo.get("a").unwrap().arity(), (1, 1));
        assert_eq!(repo.get("b").unwrap().arity(), (0, 0));
    }

    #[test]
    fn test_missing_prefix() {
        let err = repo_with(&[("nothing", "%input 1 variable 0 label\n_V1++\n")]).unwrap_err();
        assert!(matches!(err, MacroError::MissingPrefix { ref macro_name, .. } if macro_name == "nothing"));
    }

    #[test]
    fn test_duplicate_prefix_names_both_macros() {
        let err = repo_with(&[("first", "%prefix inc\n"), ("second", "%prefix inc\n")])
            .unwrap_err();
        match err {
            MacroError::DuplicatePrefix {
                prefix,
                existing,
                duplicate,
                ..
            } => {
                assert_eq!(prefix, "inc");
                assert_eq!(existing, "first");
                assert_eq!(duplicate, "second");
            }
            other => panic!("expected duplicate prefix, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_prefixes() {
        for prefix in ["if", "skip", "exit", "[A]", "X++", "X--"] {
            let source = format!("%prefix {}\n", prefix);
            let err = repo_with(&[("bad", source.as_str())]).unwrap_err();
            assert_eq!(err.error_code(), "E0705", "prefix {}", prefix);
        }
    }

    #[test]
    fn test_malformed_input_directive() {
        for input in ["%input 1", "%input x variable 0 label", "%input -1 0"] {
            let source = format!("%prefix m\n{}\n", input);
            let err = repo_with(&[("m", source.as_str())]).unwrap_err();
            assert_eq!(err.error_code(), "E0704", "{}", input);
        }
    }

    #[test]
    fn test_unknown_directive_is_a_warning() {
        let repo = repo_with(&[("m", "%prefix m\n%author someone\nskip\n")]).unwrap();
        assert_eq!(repo.notices().warnings().count(), 1);
        assert!(repo.contains("m"));
    }

    #[test]
    fn test_template_body_is_preparsed() {
        let repo = repo_with(&[(
            "zero",
            "%prefix zero\n%input 1 variable 0 label\n[_label1] _V1--  ; clear\nif _V1 not 0 goto _label1\n",
        )])
        .unwrap();
        let body = &repo.get("zero").unwrap().body;
        assert_eq!(
            body[0].kind,
            TemplateKind::Decrement(Operand::FormalVariable(1))
        );
        assert_eq!(body[0].location.line, 3);
    }

    #[test]
    fn test_filter_is_single_pass() {
        // c -> b -> a, and a is missing: only b is removed in one pass
        let mut repo = repo_with(&[
            ("b", "%prefix b\n%require a\nskip\n"),
            ("c", "%prefix c\n%require b\nskip\n"),
            ("d", "%prefix d\nskip\n"),
        ])
        .unwrap();

        let removed = repo.filter_unsatisfied();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].prefix, "b");
        assert!(repo.contains("c"));
        assert_eq!(repo.notices().infos().count(), 1);

        let removed = repo.filter_unsatisfied();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].prefix, "c");
        assert_eq!(repo.prefixes().collect::<Vec<_>>(), vec!["d"]);
    }

    #[test]
    fn test_load_package_from_disk_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        let pkg = root.path().join("stdlib");
        fs::create_dir(&pkg).unwrap();
        fs::write(pkg.join("zz.gmacro"), "%prefix zz\nskip\n").unwrap();
        fs::write(pkg.join("aa.gmacro"), "%prefix aa\nskip\n").unwrap();
        fs::write(pkg.join("readme.txt"), "not a macro").unwrap();
        fs::create_dir(pkg.join("nested")).unwrap();
        fs::write(pkg.join("nested").join("deep.gmacro"), "%prefix deep\n").unwrap();

        let mut map = SourceMap::new();
        let repo =
            MacroRepository::load(root.path(), &["stdlib".to_string()], &mut map).unwrap();
        assert_eq!(repo.prefixes().collect::<Vec<_>>(), vec!["aa", "zz"]);
        assert_eq!(repo.get("aa").unwrap().package.as_deref(), Some("stdlib"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_missing_package() {
        let root = tempfile::tempdir().unwrap();
        let mut map = SourceMap::new();
        let err = MacroRepository::load(root.path(), &["extra".to_string()], &mut map)
            .unwrap_err();
        assert!(matches!(err, MacroError::PackageNotFound { ref package, .. } if package == "extra"));
    }
}
