//! Line preprocessing shared by programs, macro resources and compiled files
//!
//! Comments run from `;` to the end of the line. After stripping them every
//! line is trimmed and blank lines are dropped; surviving lines keep their
//! original 1-based line number so later errors can point back at the file.

use crate::g_ast::{COMMENT_MARKER, DIRECTIVE_MARKER};

/// A non-blank, comment-free source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number in the original text
    pub number: usize,
    pub text: String,
}

impl SourceLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    pub fn is_directive(&self) -> bool {
        self.text.starts_with(DIRECTIVE_MARKER)
    }
}

/// Strip comments and blank lines, keeping line numbers
pub fn preprocess(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, raw)| {
            let code = match raw.find(COMMENT_MARKER) {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let code = code.trim();
            if code.is_empty() {
                None
            } else {
                Some(SourceLine::new(index + 1, code))
            }
        })
        .collect()
}

/// Split off the maximal leading run of directive lines.
///
/// Returns `(directives, rest)`. Directives appearing later are left in
/// `rest`; the statement parser rejects them.
pub fn split_directives(lines: Vec<SourceLine>) -> (Vec<SourceLine>, Vec<SourceLine>) {
    let header_len = lines
        .iter()
        .position(|line| !line.is_directive())
        .unwrap_or(lines.len());
    let mut directives = lines;
    let rest = directives.split_off(header_len);
    (directives, rest)
}
