//! Walking a materialized repository and measuring its files.
//!
//! The pipeline only depends on the [`Scanner`] trait. [`LineScanner`] is the
//! default implementation: it walks with `walkdir`, prunes ignored and hidden
//! paths, keeps files of recognized languages, and classifies each line from
//! the language's comment markers.

pub mod lines;
pub mod walk;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::RepolocError;
use crate::stats::{FileScanResult, LineCounts};
use crate::Result;

pub use lines::{count_lines, language_for, Language, LANGUAGES};
pub use walk::{walk_directory, IgnorePatterns};

/// Something that can enumerate and measure source files.
pub trait Scanner {
    /// Files under `root` worth scanning, excluding `ignore` matches.
    fn walk_directory(&self, root: &Path, ignore: &IgnorePatterns) -> Result<Vec<PathBuf>>;

    /// Blank/comment/code counts for one file.
    fn scan_file(&self, path: &Path) -> Result<FileScanResult>;
}

/// Default scanner based on per-language comment markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineScanner;

impl Scanner for LineScanner {
    fn walk_directory(&self, root: &Path, ignore: &IgnorePatterns) -> Result<Vec<PathBuf>> {
        walk_directory(root, ignore, |path| language_for(path).is_some())
    }

    fn scan_file(&self, path: &Path) -> Result<FileScanResult> {
        let counts = match language_for(path) {
            Some(lang) => {
                let file = File::open(path).map_err(|e| RepolocError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                count_lines(BufReader::new(file), lang).map_err(|e| RepolocError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                })?
            }
            None => LineCounts::new(),
        };
        Ok(FileScanResult::new(path, counts))
    }
}

/// Scan every file under `root`.
///
/// Result paths are relative to `root` (or the file name when `root` is a
/// file). A file that cannot be read is logged and skipped; it does not fail
/// the repository.
pub fn scan_tree(
    scanner: &dyn Scanner,
    root: &Path,
    ignore: &IgnorePatterns,
) -> Result<Vec<FileScanResult>> {
    let files = scanner.walk_directory(root, ignore)?;
    debug!(files = files.len(), "scanning {}", root.display());

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        match scanner.scan_file(&path) {
            Ok(mut result) => {
                result.path = relative_to(root, &path);
                results.push(result);
            }
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }

    Ok(results)
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
    }
}
