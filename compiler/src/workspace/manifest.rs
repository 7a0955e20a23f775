//! TOML manifest parsing for `gmc.toml`.

use serde::Deserialize;

/// Top-level manifest. Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GmcManifest {
    #[serde(default)]
    pub macros: MacrosConfig,
    #[serde(default)]
    pub compile: CompileConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// `[macros]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MacrosConfig {
    /// Macro root directory (relative to the manifest)
    pub root: Option<String>,
    /// Packages to load, in order
    pub packages: Option<Vec<String>>,
}

/// `[compile]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompileConfig {
    /// Emit start/end comments around expanded macros
    pub annotate: Option<bool>,
    /// Expansion pass limit, 0 for none
    pub max_expansion_passes: Option<usize>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RunConfig {
    /// Instruction limit for the interpreter
    pub max_steps: Option<u64>,
}

/// Parse a `gmc.toml` string into a `GmcManifest`.
pub fn parse_manifest(content: &str) -> Result<GmcManifest, String> {
    toml::from_str(content).map_err(|e| format!("Failed to parse gmc.toml: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let toml = r#"
[macros]
root = "lib/macro"
packages = ["stdlib", "arith"]

[compile]
annotate = true
max-expansion-passes = 64

[run]
max-steps = 1000
"#;
        let manifest = parse_manifest(toml).unwrap();
        assert_eq!(manifest.macros.root.as_deref(), Some("lib/macro"));
        assert_eq!(
            manifest.macros.packages,
            Some(vec!["stdlib".to_string(), "arith".to_string()])
        );
        assert_eq!(manifest.compile.annotate, Some(true));
        assert_eq!(manifest.compile.max_expansion_passes, Some(64));
        assert_eq!(manifest.run.max_steps, Some(1000));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = parse_manifest("").unwrap();
        assert!(manifest.macros.root.is_none());
        assert!(manifest.compile.annotate.is_none());
        assert!(manifest.run.max_steps.is_none());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = parse_manifest("[compile]\noptimize = true\n").unwrap_err();
        assert!(err.starts_with("Failed to parse gmc.toml"));
    }
}
