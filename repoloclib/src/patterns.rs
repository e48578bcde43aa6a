//! Newline-delimited pattern files (ignore globs, repository name lists).

use std::fs;
use std::path::Path;

use crate::error::RepolocError;
use crate::Result;

/// Parse pattern file content: one entry per line, surrounding whitespace
/// trimmed, blank lines and `#` comments skipped.
pub fn parse_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Read and parse a pattern file.
pub fn read_pattern_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| RepolocError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse_patterns(&content))
}
