//! `%` directives
//!
//! Source programs may open with any number of directive lines. The
//! compiler does not interpret them: they are copied into the compiled
//! output right after the generated `%vars` manifest, in source order.
//! Macro resources use the same line shape for their headers.

use diagnostics::{FileId, Location};
use parser::{SourceLine, DIRECTIVE_MARKER, VARS_DIRECTIVE};

/// A directive line and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub text: String,
    pub location: Location,
}

impl Directive {
    pub fn from_line(line: &SourceLine, file_id: FileId) -> Self {
        Self {
            text: line.text.clone(),
            location: Location::new(file_id, line.number),
        }
    }

    /// Directive name without the marker, e.g. `specvar`
    pub fn name(&self) -> &str {
        self.text
            .trim_start_matches(DIRECTIVE_MARKER)
            .split_whitespace()
            .next()
            .unwrap_or("")
    }

    /// Whitespace-separated tokens after the name
    pub fn arguments(&self) -> Vec<&str> {
        self.text.split_whitespace().skip(1).collect()
    }
}

pub fn collect_directives(lines: &[SourceLine], file_id: FileId) -> Vec<Directive> {
    lines
        .iter()
        .map(|line| Directive::from_line(line, file_id))
        .collect()
}

/// `%vars A,B,C`
pub fn vars_directive<'a>(variables: impl IntoIterator<Item = &'a str>) -> String {
    let names: Vec<&str> = variables.into_iter().collect();
    format!("{} {}", VARS_DIRECTIVE, names.join(","))
}

/// Output header: the variable manifest followed by passthrough directives
pub fn render_header<'a>(
    variables: impl IntoIterator<Item = &'a str>,
    passthrough: &[Directive],
) -> Vec<String> {
    std::iter::once(vars_directive(variables))
        .chain(passthrough.iter().map(|directive| directive.text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_name_and_arguments() {
        let directive = Directive::from_line(&SourceLine::new(2, "%specvar X 5"), FileId::new(0));
        assert_eq!(directive.name(), "specvar");
        assert_eq!(directive.arguments(), vec!["X", "5"]);
        assert_eq!(directive.location.line, 2);
    }

    #[test]
    fn test_header_keeps_directive_order() {
        let lines = vec![
            SourceLine::new(1, "%specvar X 3"),
            SourceLine::new(2, "%note anything goes"),
        ];
        let directives = collect_directives(&lines, FileId::new(0));
        let header = render_header(["Y", "X"], &directives);
        assert_eq!(
            header,
            vec!["%vars Y,X", "%specvar X 3", "%note anything goes"]
        );
    }

    #[test]
    fn test_vars_directive_with_only_output() {
        assert_eq!(vars_directive(["Y"]), "%vars Y");
    }
}
