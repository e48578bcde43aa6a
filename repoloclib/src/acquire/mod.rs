//! Materializing repositories on the local filesystem.
//!
//! An [`Acquirer`] is chosen once per run. Remote runs either shallow-clone
//! each repository with git or download and extract a zip archive of its
//! default branch; local runs read the user's path in place. Every failure is
//! returned as an [`AcquisitionFailure`] value so the caller can skip the
//! repository and carry on.

mod archive;
mod git;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use crate::descriptor::{Credential, RepositoryDescriptor};
use crate::error::RepolocError;
use crate::http::HttpClient;
use crate::provider::RepositoryHost;
use crate::Result;

/// How remote repositories are materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AcquisitionStrategy {
    /// Shallow, single-branch `git clone`
    #[default]
    Clone,
    /// Zip archive download and extraction
    Archive,
}

impl fmt::Display for AcquisitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionStrategy::Clone => write!(f, "clone"),
            AcquisitionStrategy::Archive => write!(f, "archive"),
        }
    }
}

impl FromStr for AcquisitionStrategy {
    type Err = RepolocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clone" | "git" => Ok(AcquisitionStrategy::Clone),
            "archive" | "zip" => Ok(AcquisitionStrategy::Archive),
            _ => Err(RepolocError::InvalidOptions(format!(
                "unknown acquisition strategy '{}' (expected clone or archive)",
                s
            ))),
        }
    }
}

/// A repository materialized on disk.
#[derive(Debug)]
pub struct Acquired {
    pub descriptor: RepositoryDescriptor,
    pub path: PathBuf,
    /// Whether the directory was created by us and must be removed afterwards
    owned: bool,
}

impl Acquired {
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Remove the materialized directory. A user-owned path is left untouched.
    pub fn release(self) -> Result<()> {
        if !self.owned {
            return Ok(());
        }
        debug!(path = %self.path.display(), "removing materialized repository");
        fs::remove_dir_all(&self.path).map_err(|source| RepolocError::Cleanup {
            path: self.path.clone(),
            source,
        })
    }
}

/// One repository could not be materialized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{descriptor}: {reason}")]
pub struct AcquisitionFailure {
    pub descriptor: RepositoryDescriptor,
    pub reason: String,
}

impl AcquisitionFailure {
    pub fn new(descriptor: &RepositoryDescriptor, reason: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.clone(),
            reason: reason.into(),
        }
    }
}

impl From<AcquisitionFailure> for RepolocError {
    fn from(failure: AcquisitionFailure) -> Self {
        RepolocError::Acquisition {
            repository: failure.descriptor.name().to_string(),
            reason: failure.reason,
        }
    }
}

enum Method<'a> {
    InPlace(PathBuf),
    Remote {
        strategy: AcquisitionStrategy,
        host: &'a dyn RepositoryHost,
        http: &'a dyn HttpClient,
        credential: &'a Credential,
        work_dir: PathBuf,
    },
}

/// Turns descriptors into local directories.
pub struct Acquirer<'a> {
    method: Method<'a>,
}

impl<'a> Acquirer<'a> {
    /// Read `path` where it is. Nothing is ever deleted.
    pub fn in_place(path: impl Into<PathBuf>) -> Self {
        Self {
            method: Method::InPlace(path.into()),
        }
    }

    /// Materialize remote repositories under `work_dir/<repository name>`.
    pub fn remote(
        strategy: AcquisitionStrategy,
        host: &'a dyn RepositoryHost,
        http: &'a dyn HttpClient,
        credential: &'a Credential,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            method: Method::Remote {
                strategy,
                host,
                http,
                credential,
                work_dir: work_dir.into(),
            },
        }
    }

    pub fn acquire(
        &self,
        descriptor: &RepositoryDescriptor,
    ) -> std::result::Result<Acquired, AcquisitionFailure> {
        match &self.method {
            Method::InPlace(path) => {
                if !path.exists() {
                    return Err(AcquisitionFailure::new(
                        descriptor,
                        format!("path does not exist: {}", path.display()),
                    ));
                }
                Ok(Acquired {
                    descriptor: descriptor.clone(),
                    path: path.clone(),
                    owned: false,
                })
            }
            Method::Remote {
                strategy,
                host,
                http,
                credential,
                work_dir,
            } => {
                let dest = work_dir.join(descriptor.name());
                ensure_vacant(descriptor, &dest)?;

                match strategy {
                    AcquisitionStrategy::Clone => {
                        clone(*host, *credential, descriptor, &dest)?;
                    }
                    AcquisitionStrategy::Archive => {
                        download(*host, *http, *credential, descriptor, &dest)?;
                    }
                }

                info!(path = %dest.display(), "materialized {}", descriptor.name());
                Ok(Acquired {
                    descriptor: descriptor.clone(),
                    path: dest,
                    owned: true,
                })
            }
        }
    }
}

/// Refuse to write into a directory we did not create.
fn ensure_vacant(
    descriptor: &RepositoryDescriptor,
    dest: &Path,
) -> std::result::Result<(), AcquisitionFailure> {
    if dest.exists() {
        return Err(AcquisitionFailure::new(
            descriptor,
            format!("destination {} already exists", dest.display()),
        ));
    }
    Ok(())
}

fn clone(
    host: &dyn RepositoryHost,
    credential: &Credential,
    descriptor: &RepositoryDescriptor,
    dest: &Path,
) -> std::result::Result<(), AcquisitionFailure> {
    let url = host.clone_url(descriptor, credential).ok_or_else(|| {
        AcquisitionFailure::new(
            descriptor,
            format!("{} has no clone URL for this repository", host.provider()),
        )
    })?;

    debug!(url = %credential.redact(&url), "cloning");
    git::shallow_clone(&url, descriptor.default_branch(), dest)
        .map_err(|e| AcquisitionFailure::new(descriptor, credential.redact(&e.to_string())))
}

fn download(
    host: &dyn RepositoryHost,
    http: &dyn HttpClient,
    credential: &Credential,
    descriptor: &RepositoryDescriptor,
    dest: &Path,
) -> std::result::Result<(), AcquisitionFailure> {
    let request = host
        .archive_request(descriptor, credential)
        .map_err(|e| AcquisitionFailure::new(descriptor, credential.redact(&e.to_string())))?;

    debug!(url = %credential.redact(&request.url), "downloading archive");
    archive::download_and_extract(http, &request, dest)
        .map_err(|e| AcquisitionFailure::new(descriptor, credential.redact(&e.to_string())))
}
