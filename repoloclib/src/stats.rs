//! Core data structures for line counts

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};
use std::path::PathBuf;

/// Blank, comment and code line counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounts {
    /// Blank lines (whitespace only)
    pub blank: u64,
    /// Comment-only lines
    pub comment: u64,
    /// Lines with code on them
    pub code: u64,
}

impl LineCounts {
    /// Create a new LineCounts with all zeros
    pub fn new() -> Self {
        Self::default()
    }

    /// Total lines
    pub fn total(&self) -> u64 {
        self.blank + self.comment + self.code
    }
}

impl Add for LineCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            blank: self.blank + other.blank,
            comment: self.comment + other.comment,
            code: self.code + other.code,
        }
    }
}

impl AddAssign for LineCounts {
    fn add_assign(&mut self, other: Self) {
        self.blank += other.blank;
        self.comment += other.comment;
        self.code += other.code;
    }
}

impl std::iter::Sum for LineCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::new(), |acc, c| acc + c)
    }
}

/// Scan result for a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileScanResult {
    /// Path to the file
    pub path: PathBuf,
    /// Line counts for this file
    pub counts: LineCounts,
}

impl FileScanResult {
    /// Create new file result
    pub fn new(path: impl Into<PathBuf>, counts: LineCounts) -> Self {
        Self {
            path: path.into(),
            counts,
        }
    }
}

/// Code line total for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTotal {
    /// Repository id (`organization-[project-]repository`)
    pub repository: String,
    /// Code lines across all scanned files
    pub code: u64,
}

impl RepoTotal {
    pub fn new(repository: impl Into<String>, code: u64) -> Self {
        Self {
            repository: repository.into(),
            code,
        }
    }
}
