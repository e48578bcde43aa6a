//! # repoloc
//!
//! A CLI tool for counting lines of code across every repository of an
//! organization on GitHub, GitLab, Bitbucket or Azure DevOps, or in a local path.
//!
//! ## Overview
//!
//! repoloc is built on top of repoloclib. It discovers the repositories an
//! access token can see, clones or downloads them one at a time, counts blank,
//! comment and code lines, and writes a CSV per repository plus a combined
//! ranking. The grand total is always the last line on standard output.
//!
//! ## Usage
//!
//! ```bash
//! # Count a local checkout
//! repoloc --local-file-path ./my-service
//!
//! # Count every repository of a GitHub organization
//! repoloc --devops GitHub --organization acme --access-token "$TOKEN"
//!
//! # Download zip archives instead of cloning, skip a few repositories
//! repoloc --devops AzureDevOps --organization acme --access-token "$TOKEN" \
//!     --clone-repo-using-zip --exclude-repositories-file exclude.txt
//!
//! # Rebuild the combined report from per-repository CSVs
//! repoloc combine ./20240101_120000
//! ```

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use repoloclib::{
    read_pattern_file, AcquisitionStrategy, CombinedReport, Credential, IgnorePatterns,
    LineScanner, Pipeline, Provider, RepositoryFilter, ReqwestClient, RunOptions,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Repositories shown in the terminal ranking
const TOP_REPOSITORIES: usize = 25;

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("repoloc")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Arthur Debert")
        .about("Organization-wide lines of code counter")
        .args_conflicts_with_subcommands(true)
        .arg(
            Arg::new("devops")
                .long("devops")
                .value_name("MODE")
                .default_value("Local")
                .value_parser(|s: &str| s.parse::<Provider>().map_err(|e| e.to_string()))
                .help("Where repositories come from: Local, GitHub, GitLab, Bitbucket or AzureDevOps"),
        )
        .arg(
            Arg::new("organization")
                .long("organization")
                .value_name("NAME")
                .help("Organization (GitHub), group (GitLab), workspace (Bitbucket) or organization (Azure DevOps)"),
        )
        .arg(
            Arg::new("access-token")
                .long("access-token")
                .alias("accessToken")
                .value_name("TOKEN")
                .env("REPOLOC_ACCESS_TOKEN")
                .hide_env_values(true)
                .help("Personal access token used to discover and download repositories"),
        )
        .arg(
            Arg::new("local-file-path")
                .long("local-file-path")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("File or directory to scan in Local mode"),
        )
        .arg(
            Arg::new("ignore-file")
                .long("ignore-file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("File of glob patterns (one per line) for paths to skip"),
        )
        .arg(
            Arg::new("exclude-repositories-file")
                .long("exclude-repositories-file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("File of repository names (one per line) to skip"),
        )
        .arg(
            Arg::new("include-repositories-file")
                .long("include-repositories-file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("File of repository names (one per line) to keep; all others are skipped"),
        )
        .arg(
            Arg::new("clone-repo-using-zip")
                .long("clone-repo-using-zip")
                .action(ArgAction::SetTrue)
                .help("Download zip archives of the default branch instead of running git clone"),
        )
        .arg(
            Arg::new("dump-csvs")
                .long("dump-csvs")
                .value_name("BOOL")
                .value_parser(value_parser!(bool))
                .default_value("true")
                .help("Write a CSV per repository and a combined CSV"),
        )
        .arg(
            Arg::new("results-directory-path")
                .long("results-directory-path")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory for CSV reports (default: a new YYYYMMDD_HHMMSS directory)"),
        )
        .arg(
            Arg::new("work-dir")
                .long("work-dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .help("Directory repositories are cloned or extracted into"),
        )
        .arg(
            Arg::new("keep-partial-discovery")
                .long("keep-partial-discovery")
                .action(ArgAction::SetTrue)
                .help("If listing repositories fails midway, measure the ones already found"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .ignore_case(true)
                .value_parser(["DEBUG", "INFO", "WARN", "ERROR"])
                .default_value("INFO")
                .help("Log level (logs go to stderr)"),
        )
        .subcommand(
            Command::new("combine")
                .about("Rebuild the combined report from a directory of per-repository CSVs")
                .arg(
                    Arg::new("dir")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Results directory"),
                ),
        )
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--log-level`.
fn init_logging(matches: &ArgMatches) {
    let level = matches
        .get_one::<String>("log-level")
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| "info".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_list(matches: &ArgMatches, name: &str) -> anyhow::Result<Vec<String>> {
    match matches.get_one::<PathBuf>(name) {
        Some(path) => {
            let list = read_pattern_file(path)
                .with_context(|| format!("failed to read --{}", name))?;
            debug!(entries = list.len(), "read {}", path.display());
            Ok(list)
        }
        None => Ok(Vec::new()),
    }
}

/// Pick the results directory: explicit, timestamped, or none.
fn results_dir(matches: &ArgMatches) -> anyhow::Result<Option<PathBuf>> {
    let dump = matches.get_one::<bool>("dump-csvs").copied().unwrap_or(true);
    let explicit = matches.get_one::<PathBuf>("results-directory-path").cloned();

    match (dump, explicit) {
        (false, Some(_)) => {
            bail!("--results-directory-path cannot be used with --dump-csvs=false")
        }
        (false, None) => Ok(None),
        (true, Some(dir)) => Ok(Some(dir)),
        (true, None) => Ok(Some(PathBuf::from(
            chrono::Local::now().format("%Y%m%d_%H%M%S").to_string(),
        ))),
    }
}

fn build_options(matches: &ArgMatches) -> anyhow::Result<RunOptions> {
    let provider = matches
        .get_one::<Provider>("devops")
        .copied()
        .unwrap_or_default();

    let mut options = RunOptions::new(provider)
        .filter(
            RepositoryFilter::new()
                .exclude(read_list(matches, "exclude-repositories-file")?)
                .include(read_list(matches, "include-repositories-file")?),
        )
        .ignore(IgnorePatterns::from_patterns(&read_list(matches, "ignore-file")?)?)
        .strategy(if matches.get_flag("clone-repo-using-zip") {
            AcquisitionStrategy::Archive
        } else {
            AcquisitionStrategy::Clone
        })
        .keep_partial_discovery(matches.get_flag("keep-partial-discovery"));

    if let Some(organization) = matches.get_one::<String>("organization") {
        options = options.organization(organization);
    }
    if let Some(token) = matches.get_one::<String>("access-token") {
        options = options.credential(Credential::new(token));
    }
    if let Some(path) = matches.get_one::<PathBuf>("local-file-path") {
        options = options.local_path(path);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("work-dir") {
        options = options.work_dir(dir);
    }
    if let Some(dir) = results_dir(matches)? {
        options = options.results_dir(dir);
    }

    options.validate()?;
    Ok(options)
}

fn run_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let options = build_options(matches)?;
    info!(
        provider = %options.provider,
        strategy = %options.strategy,
        "starting run"
    );

    let http = ReqwestClient::new().context("failed to set up HTTP client")?;
    let summary = Pipeline::new(&http, &LineScanner).run(&options)?;

    print!("{}", render::render_summary(&summary, TOP_REPOSITORIES));
    println!("{}", summary.total());
    Ok(())
}

fn combine_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let dir = matches
        .get_one::<PathBuf>("dir")
        .context("missing results directory")?;

    let report = CombinedReport::from_directory(dir)?;
    report.write(dir)?;

    print!("{}", render::render_report(&report, TOP_REPOSITORIES));
    println!("{}", report.total());
    Ok(())
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();
    init_logging(&matches);

    let result = match matches.subcommand() {
        Some(("combine", sub)) => combine_handler(sub),
        _ => run_handler(&matches),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
