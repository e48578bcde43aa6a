//! Source-control providers: discovery and URL building.
//!
//! Each provider implements [`RepositoryHost`], which covers the three things
//! the pipeline needs from a platform:
//!
//! - **Discovery**: enumerate every repository of an organization, following
//!   the provider's own pagination protocol
//! - **Clone URL**: an authenticated URL for a shallow `git clone`
//! - **Archive request**: an authenticated request for a zip of the default branch
//!
//! Pagination differs per provider:
//!
//! | Provider    | Continuation signal                          |
//! |-------------|----------------------------------------------|
//! | GitHub      | `Link` header carries `rel="last"`           |
//! | GitLab      | `Link` header carries `rel="next"`           |
//! | Bitbucket   | body field `next` is present and non-null    |
//! | AzureDevOps | none: projects, then repositories per project |
//! | Local       | none: one synthetic descriptor               |

pub mod azure;
pub mod bitbucket;
pub mod github;
pub mod gitlab;
pub mod local;
pub(crate) mod paging;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::{Credential, RepositoryDescriptor};
use crate::error::RepolocError;
use crate::http::{HttpClient, HttpRequest};
use crate::Result;

pub use azure::AzureDevOps;
pub use bitbucket::Bitbucket;
pub use github::GitHub;
pub use gitlab::GitLab;
pub use local::LocalHost;

/// Run mode: which platform repositories come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    /// A single path on the local filesystem
    #[default]
    Local,
    GitHub,
    GitLab,
    Bitbucket,
    AzureDevOps,
}

impl Provider {
    /// Whether repositories must be fetched over the network.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Provider::Local)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Local => "Local",
            Provider::GitHub => "GitHub",
            Provider::GitLab => "GitLab",
            Provider::Bitbucket => "Bitbucket",
            Provider::AzureDevOps => "AzureDevOps",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = RepolocError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "file" => Ok(Provider::Local),
            "github" => Ok(Provider::GitHub),
            "gitlab" => Ok(Provider::GitLab),
            "bitbucket" => Ok(Provider::Bitbucket),
            "azuredevops" | "azure-devops" | "azure" => Ok(Provider::AzureDevOps),
            _ => Err(RepolocError::InvalidProvider(s.to_string())),
        }
    }
}

/// Discovery stopped early.
///
/// `partial` holds the descriptors of every page fetched before the failure,
/// in page order.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct DiscoveryFailure {
    #[source]
    pub error: RepolocError,
    pub partial: Vec<RepositoryDescriptor>,
}

impl From<RepolocError> for DiscoveryFailure {
    fn from(error: RepolocError) -> Self {
        Self {
            error,
            partial: Vec::new(),
        }
    }
}

/// A platform hosting repositories.
pub trait RepositoryHost {
    fn provider(&self) -> Provider;

    /// Enumerate every repository visible to `credential` in `organization`,
    /// in the order the provider lists them.
    fn discover(
        &self,
        organization: &str,
        credential: &Credential,
    ) -> std::result::Result<Vec<RepositoryDescriptor>, DiscoveryFailure>;

    /// Authenticated clone URL, or `None` when the host has nothing to clone.
    fn clone_url(&self, repo: &RepositoryDescriptor, credential: &Credential) -> Option<String>;

    /// Authenticated request for a zip archive of the repository's default branch.
    ///
    /// Hosts whose archive URL names a branch look the default branch up first
    /// when discovery did not provide one.
    fn archive_request(
        &self,
        repo: &RepositoryDescriptor,
        credential: &Credential,
    ) -> Result<HttpRequest>;
}

/// Build the host for a provider.
pub fn host_for<'a>(provider: Provider, http: &'a dyn HttpClient) -> Box<dyn RepositoryHost + 'a> {
    match provider {
        Provider::Local => Box::new(LocalHost),
        Provider::GitHub => Box::new(GitHub::new(http)),
        Provider::GitLab => Box::new(GitLab::new(http)),
        Provider::Bitbucket => Box::new(Bitbucket::new(http)),
        Provider::AzureDevOps => Box::new(AzureDevOps::new(http)),
    }
}
