//! Per-repository and combined CSV reports.
//!
//! Per-repository report (`<id>.csv`):
//!
//! ```text
//! filePath,blank,comment,code
//! src/main.rs,10,4,120
//! total,10,4,120
//! ```
//!
//! Combined report (`AAA_combined_results.csv`):
//!
//! ```text
//! repository,lineOfCodeCount
//! acme-widgets,120
//! total,120
//! ```
//!
//! Rows are sorted by code lines, descending, and the trailing `total` row is
//! always the sum of the rows above it. The combined report can be rebuilt from
//! a directory of per-repository reports; both paths give the same total.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::RepolocError;
use crate::stats::{FileScanResult, LineCounts, RepoTotal};
use crate::Result;

/// File name of the combined report inside a results directory.
pub const COMBINED_REPORT_NAME: &str = "AAA_combined_results.csv";

const TOTAL_ROW: &str = "total";
const REPOSITORY_HEADER: [&str; 4] = ["filePath", "blank", "comment", "code"];
const COMBINED_HEADER: [&str; 2] = ["repository", "lineOfCodeCount"];

/// Where the report of repository `id` lives inside `dir`.
pub fn repository_report_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.csv", id))
}

/// File-level results of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReport {
    rows: Vec<FileScanResult>,
    total: LineCounts,
}

impl RepositoryReport {
    pub fn new(mut rows: Vec<FileScanResult>) -> Self {
        rows.sort_by(|a, b| b.counts.code.cmp(&a.counts.code));
        let total = rows.iter().map(|r| r.counts).sum();
        Self { rows, total }
    }

    pub fn rows(&self) -> &[FileScanResult] {
        &self.rows
    }

    pub fn total(&self) -> LineCounts {
        self.total
    }

    pub fn to_csv(&self) -> String {
        let mut output = csv_row(&REPOSITORY_HEADER);
        for row in &self.rows {
            output.push_str(&counts_row(&row.path.to_string_lossy(), row.counts));
        }
        output.push_str(&counts_row(TOTAL_ROW, self.total));
        output
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), rows = self.rows.len(), "writing repository report");
        fs::write(path, self.to_csv())?;
        Ok(())
    }
}

/// Ranked code totals of every measured repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedReport {
    entries: Vec<RepoTotal>,
    total: u64,
}

impl CombinedReport {
    pub fn new(mut entries: Vec<RepoTotal>) -> Self {
        entries.sort_by(|a, b| b.code.cmp(&a.code));
        let total = entries.iter().map(|e| e.code).sum();
        Self { entries, total }
    }

    pub fn entries(&self) -> &[RepoTotal] {
        &self.entries
    }

    /// The grand total: sum of every entry.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_csv(&self) -> String {
        let mut output = csv_row(&COMBINED_HEADER);
        for entry in &self.entries {
            output.push_str(&csv_row(&[entry.repository.clone(), entry.code.to_string()]));
        }
        output.push_str(&csv_row(&[TOTAL_ROW.to_string(), self.total.to_string()]));
        output
    }

    /// Write `AAA_combined_results.csv` into `dir` and return its path.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(COMBINED_REPORT_NAME);
        fs::write(&path, self.to_csv())?;
        info!(path = %path.display(), total = self.total, "wrote combined report");
        Ok(path)
    }

    /// Rebuild from the per-repository reports in `dir`.
    ///
    /// Every `*.csv` other than the combined report is read; each contributes
    /// the code count of its `total` row under its file stem.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(RepolocError::PathNotFound(dir.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_csv = path.extension().is_some_and(|e| e == "csv");
            let is_combined = path
                .file_name()
                .is_some_and(|n| n == COMBINED_REPORT_NAME);
            if path.is_file() && is_csv && !is_combined {
                paths.push(path);
            }
        }
        paths.sort();

        let totals = paths
            .iter()
            .map(|p| read_repository_total(p))
            .collect::<Result<Vec<_>>>()?;

        debug!(reports = totals.len(), "rebuilt combined report from {}", dir.display());
        Ok(Self::new(totals))
    }
}

/// Read the code total of one per-repository report.
pub fn read_repository_total(path: &Path) -> Result<RepoTotal> {
    let malformed = |message: String| RepolocError::MalformedReport {
        path: path.to_path_buf(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| RepolocError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let records = parse_csv(&content).map_err(malformed)?;

    match records.first() {
        Some(header) if header.iter().map(String::as_str).eq(REPOSITORY_HEADER) => {}
        _ => return Err(malformed("missing filePath,blank,comment,code header".into())),
    }

    let last = match records.last() {
        Some(row) if records.len() > 1 && row.len() == 4 && row[0] == TOTAL_ROW => row,
        _ => return Err(malformed("missing trailing total row".into())),
    };
    let code = last[3]
        .parse::<u64>()
        .map_err(|e| malformed(format!("bad code total '{}': {}", last[3], e)))?;

    let repository = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(RepoTotal::new(repository, code))
}

fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn csv_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

fn counts_row(name: &str, counts: LineCounts) -> String {
    csv_row(&[
        name.to_string(),
        counts.blank.to_string(),
        counts.comment.to_string(),
        counts.code.to_string(),
    ])
}

/// Parse CSV records, honoring quoted fields (which may span lines).
fn parse_csv(content: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn file(path: &str, blank: u64, comment: u64, code: u64) -> FileScanResult {
        FileScanResult::new(
            path,
            LineCounts {
                blank,
                comment,
                code,
            },
        )
    }

    #[test]
    fn test_repository_report_sorted_with_total() {
        let report = RepositoryReport::new(vec![
            file("a.go", 1, 2, 10),
            file("b.go", 3, 0, 50),
            file("c.go", 0, 1, 5),
        ]);

        assert_eq!(
            report.to_csv(),
            "filePath,blank,comment,code\nb.go,3,0,50\na.go,1,2,10\nc.go,0,1,5\ntotal,4,3,65\n"
        );
    }

    #[test]
    fn test_empty_repository_report() {
        let report = RepositoryReport::new(Vec::new());
        assert_eq!(report.to_csv(), "filePath,blank,comment,code\ntotal,0,0,0\n");
    }

    #[test]
    fn test_combined_report_total_is_sum() {
        let report = CombinedReport::new(vec![
            RepoTotal::new("acme-small", 7),
            RepoTotal::new("acme-big", 900),
            RepoTotal::new("acme-mid", 93),
        ]);

        let order: Vec<&str> = report.entries().iter().map(|e| e.repository.as_str()).collect();
        assert_eq!(order, vec!["acme-big", "acme-mid", "acme-small"]);
        assert_eq!(report.total(), 1000);
        assert_eq!(
            report.to_csv(),
            "repository,lineOfCodeCount\nacme-big,900\nacme-mid,93\nacme-small,7\ntotal,1000\n"
        );
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let report = RepositoryReport::new(vec![file("docs/a,b \"x\".md", 0, 0, 1)]);
        let csv = report.to_csv();
        assert!(csv.contains("\"docs/a,b \"\"x\"\".md\",0,0,1\n"));

        let records = parse_csv(&csv).unwrap();
        assert_eq!(records[1][0], "docs/a,b \"x\".md");
    }

    #[test]
    fn test_parse_csv_multiline_and_crlf() {
        let records = parse_csv("a,b\r\n\"line\nbreak\",2\r\n").unwrap();
        assert_eq!(records, vec![vec!["a", "b"], vec!["line\nbreak", "2"]]);
        assert!(parse_csv("\"open").is_err());
    }

    #[test]
    fn test_read_back_matches_in_memory_total() {
        let dir = tempdir().unwrap();
        let repos = [
            ("acme-api", vec![file("main.go", 2, 1, 40), file("x.go", 0, 0, 2)]),
            ("acme-web", vec![file("app.ts", 5, 5, 300)]),
            ("acme-empty", vec![]),
        ];

        let mut totals = Vec::new();
        for (id, files) in repos {
            let report = RepositoryReport::new(files);
            report.write(&repository_report_path(dir.path(), id)).unwrap();
            totals.push(RepoTotal::new(id, report.total().code));
        }
        let in_memory = CombinedReport::new(totals);
        in_memory.write(dir.path()).unwrap();

        let read_back = CombinedReport::from_directory(dir.path()).unwrap();

        assert_eq!(read_back.total(), 342);
        assert_eq!(read_back.total(), in_memory.total());
        assert_eq!(read_back.entries(), in_memory.entries());
    }

    #[test]
    fn test_read_back_rejects_malformed_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acme-bad.csv");
        fs::write(&path, "filePath,blank,comment,code\nmain.go,1,1,1\n").unwrap();

        let result = read_repository_total(&path);
        assert!(matches!(result, Err(RepolocError::MalformedReport { .. })));

        fs::write(&path, "filePath,blank,comment,code\ntotal,1,1,many\n").unwrap();
        assert!(read_repository_total(&path).is_err());
    }

    #[test]
    fn test_read_back_missing_directory() {
        let result = CombinedReport::from_directory(Path::new("/nonexistent/results"));
        assert!(matches!(result, Err(RepolocError::PathNotFound(_))));
    }
}
