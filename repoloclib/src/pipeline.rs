//! The end-to-end run: discover, filter, then acquire, scan, aggregate and
//! clean up one repository at a time.
//!
//! Repositories are processed strictly in sequence, so at most one extra
//! working tree exists on disk at any moment. A repository that cannot be
//! acquired is recorded and skipped; only a failed discovery aborts the run.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, error, info, info_span, warn};

use crate::acquire::{Acquirer, AcquisitionFailure, AcquisitionStrategy};
use crate::descriptor::{Credential, RepositoryDescriptor};
use crate::error::RepolocError;
use crate::filter::RepositoryFilter;
use crate::http::HttpClient;
use crate::provider::local::LOCAL_ORGANIZATION;
use crate::provider::{host_for, Provider};
use crate::report::{repository_report_path, CombinedReport, RepositoryReport};
use crate::scanner::{scan_tree, IgnorePatterns, Scanner};
use crate::stats::RepoTotal;
use crate::Result;

/// Everything a run needs to know.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub provider: Provider,
    pub organization: String,
    pub credential: Credential,
    /// Path scanned in `Local` mode
    pub local_path: Option<PathBuf>,
    pub strategy: AcquisitionStrategy,
    pub filter: RepositoryFilter,
    pub ignore: IgnorePatterns,
    /// Where CSV reports go (`None` aggregates in memory only)
    pub results_dir: Option<PathBuf>,
    /// Parent directory of remote materializations
    pub work_dir: PathBuf,
    /// Continue with the repositories found before a discovery failure
    pub keep_partial_discovery: bool,
}

impl RunOptions {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            work_dir: PathBuf::from("."),
            ..Self::default()
        }
    }

    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn strategy(mut self, strategy: AcquisitionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn filter(mut self, filter: RepositoryFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn ignore(mut self, ignore: IgnorePatterns) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn keep_partial_discovery(mut self, keep: bool) -> Self {
        self.keep_partial_discovery = keep;
        self
    }

    /// Check that the options describe a runnable configuration.
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_remote() {
            if self.organization.trim().is_empty() {
                return Err(RepolocError::InvalidOptions(format!(
                    "{} mode needs an organization",
                    self.provider
                )));
            }
            if self.credential.is_empty() {
                return Err(RepolocError::InvalidOptions(format!(
                    "{} mode needs an access token",
                    self.provider
                )));
            }
        } else if self.local_path.is_none() {
            return Err(RepolocError::InvalidOptions(
                "Local mode needs a local file path".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovering,
    Filtering,
    Acquiring,
    Scanning,
    Aggregating,
    CleaningUp,
    Finalizing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovering => "discovering",
            Stage::Filtering => "filtering",
            Stage::Acquiring => "acquiring",
            Stage::Scanning => "scanning",
            Stage::Aggregating => "aggregating",
            Stage::CleaningUp => "cleaning up",
            Stage::Finalizing => "finalizing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Descriptors produced by discovery
    pub discovered: usize,
    /// Descriptors left after filtering
    pub selected: usize,
    /// Repositories that could not be acquired or scanned, in run order
    pub failures: Vec<AcquisitionFailure>,
    pub report: CombinedReport,
    /// Path of the combined CSV, when reports were written
    pub report_path: Option<PathBuf>,
}

impl RunSummary {
    /// Grand total of code lines.
    pub fn total(&self) -> u64 {
        self.report.total()
    }

    pub fn succeeded(&self) -> usize {
        self.report.entries().len()
    }
}

/// Drives a run against an HTTP transport and a scanner.
pub struct Pipeline<'a> {
    http: &'a dyn HttpClient,
    scanner: &'a dyn Scanner,
}

impl<'a> Pipeline<'a> {
    pub fn new(http: &'a dyn HttpClient, scanner: &'a dyn Scanner) -> Self {
        Self { http, scanner }
    }

    pub fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        options.validate()?;

        let organization = match options.provider {
            Provider::Local => LOCAL_ORGANIZATION,
            _ => options.organization.as_str(),
        };
        let _run = info_span!("run", provider = %options.provider, organization).entered();

        let host = host_for(options.provider, self.http);

        info!(stage = %Stage::Discovering);
        let discovered = match host.discover(organization, &options.credential) {
            Ok(descriptors) => descriptors,
            Err(failure) if options.keep_partial_discovery && !failure.partial.is_empty() => {
                warn!(
                    "discovery stopped early ({}); continuing with {} repositories",
                    failure.error,
                    failure.partial.len()
                );
                failure.partial
            }
            Err(failure) => return Err(failure.error),
        };
        let discovered_count = discovered.len();
        info!("discovered {} repositories", discovered_count);

        info!(stage = %Stage::Filtering);
        let selected = match options.provider {
            Provider::Local => {
                if !options.filter.is_empty() {
                    warn!("repository lists do not apply to a local path, ignoring them");
                }
                discovered
            }
            _ => options.filter.apply(discovered),
        };
        info!("{} of {} repositories selected", selected.len(), discovered_count);

        if let Some(dir) = &options.results_dir {
            fs::create_dir_all(dir)?;
        }

        let acquirer = match (&options.local_path, options.provider) {
            (Some(path), Provider::Local) => Acquirer::in_place(path),
            _ => Acquirer::remote(
                options.strategy,
                &*host,
                self.http,
                &options.credential,
                &options.work_dir,
            ),
        };

        let mut totals = Vec::with_capacity(selected.len());
        let mut failures = Vec::new();
        let count = selected.len();

        for (index, descriptor) in selected.iter().enumerate() {
            let _repo = info_span!(
                "repository",
                index = index + 1,
                count,
                id = descriptor.id()
            )
            .entered();

            match self.process(&acquirer, descriptor, options)? {
                Ok(total) => totals.push(total),
                Err(failure) => {
                    error!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        info!(stage = %Stage::Finalizing);
        let report = CombinedReport::new(totals);
        let report_path = match &options.results_dir {
            Some(dir) => Some(report.write(dir)?),
            None => None,
        };

        if !failures.is_empty() {
            warn!("failed to measure {}/{} repositories", failures.len(), count);
        }
        info!(stage = %Stage::Done, total = report.total());

        Ok(RunSummary {
            discovered: discovered_count,
            selected: count,
            failures,
            report,
            report_path,
        })
    }

    /// Acquire, scan, aggregate and clean up one repository.
    ///
    /// The outer error is fatal to the run (reports could not be written); the
    /// inner one only skips this repository.
    fn process(
        &self,
        acquirer: &Acquirer<'_>,
        descriptor: &RepositoryDescriptor,
        options: &RunOptions,
    ) -> Result<std::result::Result<RepoTotal, AcquisitionFailure>> {
        debug!(stage = %Stage::Acquiring);
        let acquired = match acquirer.acquire(descriptor) {
            Ok(acquired) => acquired,
            Err(failure) => return Ok(Err(failure)),
        };

        debug!(stage = %Stage::Scanning);
        let scanned = scan_tree(self.scanner, &acquired.path, &options.ignore);

        let outcome = scanned.map(|files| {
            debug!(stage = %Stage::Aggregating);
            let report = RepositoryReport::new(files);
            let total = RepoTotal::new(descriptor.id(), report.total().code);
            let written = match &options.results_dir {
                Some(dir) => report.write(&repository_report_path(dir, descriptor.id())),
                None => Ok(()),
            };
            (total, written)
        });

        debug!(stage = %Stage::CleaningUp);
        if let Err(e) = acquired.release() {
            warn!("{}", e);
        }

        match outcome {
            Ok((total, written)) => {
                written?;
                info!(code = total.code, "measured {}", descriptor.name());
                Ok(Ok(total))
            }
            Err(e) => Ok(Err(AcquisitionFailure::new(
                descriptor,
                format!("scan failed: {}", e),
            ))),
        }
    }
}
