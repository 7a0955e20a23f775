//! Project configuration.
//!
//! A project is a directory with an optional `gmc.toml` manifest naming the
//! macro root, the packages to load and compile/run defaults. Relative
//! paths in the manifest are resolved against the manifest's directory.

pub mod manifest;

use crate::pipeline::{CompilationConfig, CompilationError};
use std::path::{Path, PathBuf};

pub use manifest::{CompileConfig, GmcManifest, MacrosConfig, RunConfig};

/// The manifest file name.
pub const MANIFEST_FILE: &str = "gmc.toml";

/// A resolved project
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing the manifest, or the working directory when
    /// there is none
    pub root: PathBuf,
    /// Parsed manifest
    pub manifest: GmcManifest,
}

impl Project {
    /// A project with no manifest
    pub fn bare(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            manifest: GmcManifest::default(),
        }
    }

    /// Resolve the macro root relative to the project root.
    pub fn macro_root(&self) -> Option<PathBuf> {
        self.manifest
            .macros
            .root
            .as_ref()
            .map(|root| self.root.join(root))
    }

    /// Compilation settings from the manifest, on top of the defaults.
    pub fn compilation_config(&self) -> CompilationConfig {
        let mut config = CompilationConfig::default();
        config.macro_root = self
            .macro_root()
            .unwrap_or_else(|| self.root.join(&config.macro_root));
        if let Some(packages) = &self.manifest.macros.packages {
            config.packages = packages.clone();
        }
        if let Some(annotate) = self.manifest.compile.annotate {
            config.annotate = annotate;
        }
        if let Some(limit) = self.manifest.compile.max_expansion_passes {
            config.max_expansion_passes = limit;
        }
        config
    }

    /// Interpreter step limit, if configured
    pub fn max_steps(&self) -> Option<u64> {
        self.manifest.run.max_steps
    }
}

/// Find the project root by walking up from `start_dir`.
///
/// Returns the directory containing `gmc.toml`, or None.
pub fn find_project_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        if current.join(MANIFEST_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load a manifest.
///
/// If `path` points to a file, uses that file. If it points to a directory,
/// looks for `gmc.toml` inside it.
pub fn load_project(path: &Path) -> Result<Project, CompilationError> {
    let (root, manifest_path) = if path.is_file() {
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        (root, path.to_path_buf())
    } else {
        (path.to_path_buf(), path.join(MANIFEST_FILE))
    };

    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| CompilationError::io(&manifest_path, &e))?;
    let manifest = manifest::parse_manifest(&content).map_err(CompilationError::config)?;

    Ok(Project { root, manifest })
}

/// The project around `start_dir`, or a bare project rooted there when no
/// manifest is found.
pub fn discover_project(start_dir: &Path) -> Result<Project, CompilationError> {
    match find_project_root(start_dir) {
        Some(root) => load_project(&root),
        None => Ok(Project::bare(start_dir)),
    }
}
