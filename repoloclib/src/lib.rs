//! # repoloclib
//!
//! Lines-of-code inventory across every repository of an organization.
//!
//! ## Overview
//!
//! A run enumerates the repositories an access token can see on a hosting
//! platform, narrows them with include/exclude lists, then handles them one at
//! a time:
//!
//! 1. **Acquire**: shallow `git clone` or zip archive download into a work directory
//! 2. **Scan**: walk the tree and classify each line as blank, comment or code
//! 3. **Aggregate**: write a per-repository CSV and keep the repository's code total
//! 4. **Clean up**: remove the materialized tree
//!
//! The run ends with a combined report ranking every repository by code lines,
//! whose trailing `total` row is the grand total.
//!
//! ## Providers
//!
//! - **GitHub**, **GitLab**: page-numbered listings continued through the `Link` header
//! - **Bitbucket**: page-numbered listings continued while the body has a `next` field
//! - **AzureDevOps**: projects, then the repositories of each project
//! - **Local**: a single path already on disk, scanned in place and never deleted
//!
//! ## Failure handling
//!
//! A discovery failure aborts the run. A repository that cannot be cloned,
//! downloaded or extracted is recorded in [`RunSummary::failures`] and skipped.
//! Failing to remove a materialized tree is only logged.
//!
//! ## Logging
//!
//! The library reports progress through [`tracing`] spans and events and
//! never installs a subscriber; that is left to the application.
//!
//! ## Example
//!
//! ```rust
//! use repoloclib::{LineScanner, Pipeline, Provider, ReqwestClient, RunOptions};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! fs::write(dir.path().join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
//!
//! let http = ReqwestClient::new().unwrap();
//! let options = RunOptions::new(Provider::Local).local_path(dir.path());
//! let summary = Pipeline::new(&http, &LineScanner).run(&options).unwrap();
//!
//! assert_eq!(summary.total(), 2);
//! assert_eq!(summary.report.entries()[0].repository, "local-org-local");
//! ```

pub mod acquire;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod http;
pub mod patterns;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod scanner;
pub mod stats;

pub use acquire::{Acquired, Acquirer, AcquisitionFailure, AcquisitionStrategy};
pub use descriptor::{Credential, RepositoryDescriptor};
pub use error::{RepolocError, RequestContext};
pub use filter::{RepositoryFilter, Selection};
pub use http::{Auth, HttpClient, HttpRequest, HttpResponse, ReqwestClient, TransportError};
pub use patterns::{parse_patterns, read_pattern_file};
pub use pipeline::{Pipeline, RunOptions, RunSummary, Stage};
pub use provider::{host_for, DiscoveryFailure, Provider, RepositoryHost};
pub use report::{
    read_repository_total, repository_report_path, CombinedReport, RepositoryReport,
    COMBINED_REPORT_NAME,
};
pub use scanner::{scan_tree, IgnorePatterns, LineScanner, Scanner};
pub use stats::{FileScanResult, LineCounts, RepoTotal};

/// Result type for repoloclib operations
pub type Result<T> = std::result::Result<T, RepolocError>;
