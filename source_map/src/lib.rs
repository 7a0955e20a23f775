//! Source tracking for G programs and macro library files
//!
//! G is a line-oriented language: every statement occupies exactly one
//! source line, so locations are (file, line) pairs rather than byte spans.
//! The map owns the text of every file taking part in a compilation run
//! (the program itself and every loaded `.gmacro` resource) so that
//! diagnostics can quote the offending line.

use std::fmt;

/// Unique identifier for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

impl FileId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// A 1-based line inside a registered file.
///
/// Line `0` marks a synthetic location: statements the compiler creates
/// itself (the terminating `exit`) have no source line of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub file_id: FileId,
    pub line: usize,
}

impl Location {
    pub fn new(file_id: FileId, line: usize) -> Self {
        Self { file_id, line }
    }

    pub fn synthetic(file_id: FileId) -> Self {
        Self { file_id, line: 0 }
    }

    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            write!(f, "<generated>")
        } else {
            write!(f, "line {}", self.line)
        }
    }
}

/// Information about a source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    pub line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file with precomputed line starts
    pub fn new(name: String, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            name,
            content,
            line_starts,
        }
    }

    /// Get a specific line from the source file (1-based line numbers)
    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || line_number > self.line_starts.len() {
            return None;
        }

        let start = self.line_starts[line_number - 1];
        let end = self
            .line_starts
            .get(line_number)
            .copied()
            .unwrap_or(self.content.len());

        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Number of lines, counting a final line without a trailing newline
    pub fn line_count(&self) -> usize {
        if self.content.ends_with('\n') {
            self.line_starts.len() - 1
        } else {
            self.line_starts.len()
        }
    }

    /// Iterate over `(line_number, text)` pairs, 1-based
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        (1..=self.line_count()).filter_map(move |n| self.get_line(n).map(|l| (n, l)))
    }
}

/// Manages the files of one compilation run
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create a new empty source map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source file and return its FileId
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) -> FileId {
        let file_id = FileId(self.files.len());
        self.files.push(SourceFile::new(name.into(), content.into()));
        file_id
    }

    /// Get a source file by its FileId
    pub fn get_file(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(file_id.0)
    }

    /// Name of a file, or `<unknown>` for ids from another map
    pub fn file_name(&self, file_id: FileId) -> &str {
        self.get_file(file_id)
            .map(|f| f.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// Get a specific line from a file (1-based line numbers)
    pub fn get_line(&self, file_id: FileId, line_number: usize) -> Option<&str> {
        self.get_file(file_id)?.get_line(line_number)
    }

    /// Text of the line a location points at
    pub fn line_at(&self, location: Location) -> Option<&str> {
        self.get_line(location.file_id, location.line)
    }

    /// Get all file IDs in the source map
    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        (0..self.files.len()).map(FileId)
    }

    /// Get the number of files in the source map
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the source map is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Compute line start offsets for a source text
fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut line_starts = vec![0];

    for (i, ch) in source.char_indices() {
        if ch == '\n' {
            line_starts.push(i + 1);
        }
    }

    line_starts
}
