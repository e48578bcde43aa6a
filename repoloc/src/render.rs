//! Plain-text rendering of run results for the terminal

use console::Style;
use repoloclib::{CombinedReport, RunSummary};

const NAME_WIDTH: usize = 48;
const CELL_WIDTH: usize = 12;

/// Truncate a name to fit within max_len, adding ".." prefix if needed
fn truncate_name(name: &str, max_len: usize) -> String {
    let count = name.chars().count();
    if count > max_len {
        let tail: String = name.chars().skip(count - max_len + 2).collect();
        format!("..{}", tail)
    } else {
        name.to_string()
    }
}

fn table_row(name: &str, code: u64) -> String {
    format!(
        "{:<name_width$}{:>cell_width$}\n",
        truncate_name(name, NAME_WIDTH - 2),
        code,
        name_width = NAME_WIDTH,
        cell_width = CELL_WIDTH
    )
}

/// Render the ranked repositories, showing at most `top` rows.
pub fn render_report(report: &CombinedReport, top: usize) -> String {
    let header = Style::new().bold();
    let dim = Style::new().dim();
    let mut output = String::new();

    output.push_str(&format!(
        "{}\n",
        header.apply_to(format!(
            "{:<name_width$}{:>cell_width$}",
            "Repository",
            "Code",
            name_width = NAME_WIDTH,
            cell_width = CELL_WIDTH
        ))
    ));
    let separator = "-".repeat(NAME_WIDTH + CELL_WIDTH);
    output.push_str(&separator);
    output.push('\n');

    for entry in report.entries().iter().take(top) {
        output.push_str(&table_row(&entry.repository, entry.code));
    }
    let hidden = report.entries().len().saturating_sub(top);
    if hidden > 0 {
        output.push_str(&format!(
            "{}\n",
            dim.apply_to(format!("... {} more", hidden))
        ));
    }

    output.push_str(&separator);
    output.push('\n');
    output.push_str(&format!(
        "{}",
        header.apply_to(table_row(
            &format!("Total ({} repositories)", report.entries().len()),
            report.total()
        ))
    ));
    output
}

/// Render a finished run: ranking, failures and where the reports went.
pub fn render_summary(summary: &RunSummary, top: usize) -> String {
    let mut output = render_report(&summary.report, top);

    let failed = format!(
        "Failed {}/{} repositories",
        summary.failures.len(),
        summary.selected
    );
    output.push('\n');
    if summary.failures.is_empty() {
        output.push_str(&format!("{}\n", Style::new().green().apply_to(failed)));
    } else {
        let red = Style::new().red().bold();
        output.push_str(&format!("{}\n", red.apply_to(format!("{}:", failed))));
        for failure in &summary.failures {
            output.push_str(&format!(
                "  - {} ({}): {}\n",
                failure.descriptor.name(),
                failure.descriptor.id(),
                failure.reason
            ));
        }
    }

    if let Some(path) = &summary.report_path {
        output.push('\n');
        output.push_str(&format!("Combined report: {}\n", path.display()));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoloclib::{AcquisitionFailure, RepoTotal, RepositoryDescriptor};

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short", 10), "short");
        assert_eq!(truncate_name("a-very-long-repository", 10), "..pository");
        assert!(truncate_name("a-very-long-repository", 10).chars().count() <= 10);
    }

    #[test]
    fn test_render_report_limits_rows() {
        let report = CombinedReport::new(vec![
            RepoTotal::new("acme-a", 30),
            RepoTotal::new("acme-b", 20),
            RepoTotal::new("acme-c", 10),
        ]);

        let output = render_report(&report, 2);
        assert!(output.contains("acme-a"));
        assert!(output.contains("acme-b"));
        assert!(!output.contains("acme-c"));
        assert!(output.contains("1 more"));
        assert!(output.contains("Total (3 repositories)"));
        assert!(output.contains("60"));
    }

    #[test]
    fn test_render_summary_reports_zero_failures() {
        let summary = RunSummary {
            discovered: 3,
            selected: 2,
            failures: Vec::new(),
            report: CombinedReport::new(vec![
                RepoTotal::new("acme-a", 3),
                RepoTotal::new("acme-b", 1),
            ]),
            report_path: None,
        };

        let output = render_summary(&summary, 10);
        assert!(output.contains("Failed 0/2 repositories"));
        assert!(!output.contains("  - "));
    }

    #[test]
    fn test_render_summary_lists_failures() {
        let failed = RepositoryDescriptor::new("acme", None, "broken", None);
        let summary = RunSummary {
            discovered: 2,
            selected: 2,
            failures: vec![AcquisitionFailure::new(&failed, "HTTP 404")],
            report: CombinedReport::new(vec![RepoTotal::new("acme-ok", 5)]),
            report_path: None,
        };

        let output = render_summary(&summary, 10);
        assert!(output.contains("Failed 1/2 repositories"));
        assert!(output.contains("broken (acme-broken): HTTP 404"));
    }
}
