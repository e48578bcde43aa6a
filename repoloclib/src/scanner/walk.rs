//! Directory walking with glob ignore patterns.

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::RepolocError;
use crate::Result;

/// Glob patterns for paths to leave out of a scan.
///
/// Patterns are matched against the path relative to the scan root, using `/`
/// as separator. A pattern without a `/` also matches any single path
/// component, so `node_modules` prunes every `node_modules` directory.
#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    patterns: Vec<Pattern>,
}

impl IgnorePatterns {
    /// Create an empty set (ignores nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern.
    pub fn add(mut self, pattern: &str) -> Result<Self> {
        let pat = Pattern::new(pattern).map_err(|e| RepolocError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.patterns.push(pat);
        Ok(self)
    }

    /// Build from a list of patterns, e.g. the lines of an ignore file.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut ignore = Self::new();
        for pattern in patterns {
            ignore = ignore.add(pattern.as_ref())?;
        }
        Ok(ignore)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check a root-relative path against the patterns.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let path_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        self.patterns.iter().any(|pattern| {
            if pattern.matches(&path_str) {
                return true;
            }
            !pattern.as_str().contains('/')
                && relative
                    .file_name()
                    .map(|name| pattern.matches(&name.to_string_lossy()))
                    .unwrap_or(false)
        })
    }
}

/// Check if a directory should be skipped during traversal.
fn should_skip_dir(name: &str) -> bool {
    // Hidden directories, which includes .git
    name.starts_with('.')
}

/// Walk `root` and return the files that are not ignored and pass `accept`.
///
/// Ignored directories are pruned rather than descended into. A `root` that is
/// a file is returned on its own when accepted.
pub fn walk_directory(
    root: impl AsRef<Path>,
    ignore: &IgnorePatterns,
    accept: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();

    if !root.exists() {
        return Err(RepolocError::PathNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();

    if root.is_file() {
        if accept(root) {
            files.push(root.to_path_buf());
        }
        return Ok(files);
    }

    let walker = WalkDir::new(root).follow_links(false).into_iter();

    for entry in walker.filter_entry(|e| {
        if e.depth() == 0 {
            return true;
        }
        let relative = e.path().strip_prefix(root).unwrap_or(e.path());
        if ignore.is_ignored(relative) {
            return false;
        }
        if e.file_type().is_dir() {
            let name = e.file_name().to_str().unwrap_or("");
            return !should_skip_dir(name);
        }
        true
    }) {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let path = entry.path();

        if entry.file_type().is_file() && accept(path) {
            files.push(path.to_path_buf());
        }
    }

    // Sort for deterministic output
    files.sort();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_files(dir: &Path) {
        fs::create_dir_all(dir.join("src/utils")).unwrap();
        fs::create_dir_all(dir.join("node_modules/lodash")).unwrap();
        fs::create_dir_all(dir.join("web/node_modules/react")).unwrap();
        fs::create_dir_all(dir.join(".git/objects")).unwrap();
        fs::create_dir_all(dir.join("vendor")).unwrap();

        fs::write(dir.join("src/main.go"), "package main").unwrap();
        fs::write(dir.join("src/utils/helper.go"), "package utils").unwrap();
        fs::write(dir.join("node_modules/lodash/index.js"), "module.exports = {}").unwrap();
        fs::write(dir.join("web/node_modules/react/index.js"), "x").unwrap();
        fs::write(dir.join("web/app.js"), "let a = 1;").unwrap();
        fs::write(dir.join(".git/objects/pack"), "binary").unwrap();
        fs::write(dir.join("vendor/lib.go"), "package vendor").unwrap();
        fs::write(dir.join("README.md"), "# Readme").unwrap();
    }

    fn relative(files: &[PathBuf], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_walk_skips_hidden_directories() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let files = walk_directory(temp.path(), &IgnorePatterns::new(), |_| true).unwrap();
        let files = relative(&files, temp.path());

        assert!(files.contains(&"src/main.go".to_string()));
        assert!(files.contains(&"README.md".to_string()));
        assert!(!files.iter().any(|f| f.starts_with(".git")));
    }

    #[test]
    fn test_bare_name_prunes_at_any_depth() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let ignore = IgnorePatterns::new().add("node_modules").unwrap();
        let files = walk_directory(temp.path(), &ignore, |_| true).unwrap();
        let files = relative(&files, temp.path());

        assert!(!files.iter().any(|f| f.contains("node_modules")));
        assert!(files.contains(&"web/app.js".to_string()));
    }

    #[test]
    fn test_path_patterns_match_relative_paths() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let ignore = IgnorePatterns::from_patterns(&["vendor/*", "**/*.md"]).unwrap();
        let files = walk_directory(temp.path(), &ignore, |_| true).unwrap();
        let files = relative(&files, temp.path());

        assert!(!files.contains(&"vendor/lib.go".to_string()));
        assert!(!files.contains(&"README.md".to_string()));
        assert!(files.contains(&"src/utils/helper.go".to_string()));
    }

    #[test]
    fn test_accept_filters_files() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let files = walk_directory(temp.path(), &IgnorePatterns::new(), |p| {
            p.extension().is_some_and(|e| e == "go")
        })
        .unwrap();

        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_walk_single_file() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("main.go");
        fs::write(&file_path, "package main").unwrap();

        let files = walk_directory(&file_path, &IgnorePatterns::new(), |_| true).unwrap();
        assert_eq!(files, vec![file_path]);
    }

    #[test]
    fn test_walk_nonexistent() {
        let result = walk_directory("/nonexistent/path", &IgnorePatterns::new(), |_| true);
        assert!(matches!(result, Err(RepolocError::PathNotFound(_))));
    }

    #[test]
    fn test_invalid_glob_pattern() {
        let result = IgnorePatterns::new().add("[invalid");

        if let Err(RepolocError::InvalidGlob { pattern, .. }) = result {
            assert_eq!(pattern, "[invalid");
        } else {
            panic!("Expected InvalidGlob error");
        }
    }
}
