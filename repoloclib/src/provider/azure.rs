//! Azure DevOps organizations.
//!
//! Enumeration is two-level and unpaginated: list the projects of the
//! organization, then list the repositories of each project.

use serde::Deserialize;
use tracing::{debug, info_span};

use super::paging::{api_url, PagedFetch};
use super::{DiscoveryFailure, Provider, RepositoryHost};
use crate::descriptor::{Credential, RepositoryDescriptor};
use crate::error::RepolocError;
use crate::http::{Auth, HttpClient, HttpRequest};
use crate::Result;

const API_ROOT: &str = "https://dev.azure.com";
const API_VERSION: &str = "7.0";

#[derive(Debug, Deserialize)]
struct ValueList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AzureProject {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureRepository {
    name: String,
    #[serde(default)]
    default_branch: Option<String>,
}

/// `refs/heads/main` -> `main`
fn short_branch(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}

/// Projects listing URL.
pub fn projects_url(organization: &str) -> Result<String> {
    let url = api_url(
        API_ROOT,
        &[organization, "_apis", "projects"],
        &[("api-version", API_VERSION)],
    )?;
    Ok(url.into())
}

/// Repositories listing URL for one project.
pub fn repositories_url(organization: &str, project: &str) -> Result<String> {
    let url = api_url(
        API_ROOT,
        &[organization, project, "_apis", "git", "repositories"],
        &[("api-version", API_VERSION)],
    )?;
    Ok(url.into())
}

/// Repository metadata URL, used to look up the default branch.
pub fn repository_url(organization: &str, project: &str, repository: &str) -> Result<String> {
    let url = api_url(
        API_ROOT,
        &[organization, project, "_apis", "git", "repositories", repository],
        &[("api-version", API_VERSION)],
    )?;
    Ok(url.into())
}

/// Zip of the whole tree at a branch, via the items API.
pub fn archive_url(
    organization: &str,
    project: &str,
    repository: &str,
    branch: &str,
) -> Result<String> {
    let url = api_url(
        API_ROOT,
        &[organization, project, "_apis", "git", "repositories", repository, "items"],
        &[
            ("path", "/"),
            ("versionDescriptor.version", branch),
            ("versionDescriptor.versionType", "branch"),
            ("$format", "zip"),
            ("download", "true"),
            ("api-version", API_VERSION),
        ],
    )?;
    Ok(url.into())
}

/// Clone URL with the token as the user name.
pub fn clone_url(
    token: &str,
    organization: &str,
    project: &str,
    repository: &str,
) -> Result<String> {
    let mut url = api_url(API_ROOT, &[organization, project, "_git", repository], &[])?;
    url.set_username(token)
        .map_err(|_| RepolocError::InvalidUrl {
            url: url.to_string(),
            message: "cannot carry credentials".to_string(),
        })?;
    Ok(url.into())
}

/// Azure DevOps host. Authenticates with basic auth and an empty user name.
pub struct AzureDevOps<'a> {
    http: &'a dyn HttpClient,
}

impl<'a> AzureDevOps<'a> {
    pub fn new(http: &'a dyn HttpClient) -> Self {
        Self { http }
    }

    fn fetcher<'b>(&'b self, organization: &'b str, credential: &Credential) -> PagedFetch<'b> {
        PagedFetch {
            http: self.http,
            provider: Provider::AzureDevOps,
            organization,
            auth: basic(credential),
            accept: None,
        }
    }
}

fn basic(credential: &Credential) -> Auth {
    Auth::Basic {
        user: String::new(),
        password: credential.expose().to_string(),
    }
}

fn missing_project(repo: &RepositoryDescriptor) -> RepolocError {
    RepolocError::Acquisition {
        repository: repo.name().to_string(),
        reason: "Azure DevOps repositories need a project name".to_string(),
    }
}

impl RepositoryHost for AzureDevOps<'_> {
    fn provider(&self) -> Provider {
        Provider::AzureDevOps
    }

    fn discover(
        &self,
        organization: &str,
        credential: &Credential,
    ) -> std::result::Result<Vec<RepositoryDescriptor>, DiscoveryFailure> {
        let _span = info_span!("discover", provider = "AzureDevOps", organization).entered();
        let fetch = self.fetcher(organization, credential);

        let (_, projects): (_, ValueList<AzureProject>) =
            fetch.fetch_json(&projects_url(organization)?, None)?;

        let mut descriptors = Vec::new();
        for project in projects.value {
            debug!(project = %project.name, "listing repositories");
            let fetched: Result<(_, ValueList<AzureRepository>)> =
                repositories_url(organization, &project.name)
                    .and_then(|url| fetch.fetch_json(&url, None));
            let repositories = match fetched {
                Ok((_, list)) => list.value,
                Err(error) => {
                    return Err(DiscoveryFailure {
                        error,
                        partial: descriptors,
                    })
                }
            };

            descriptors.extend(repositories.into_iter().map(|r| {
                RepositoryDescriptor::new(
                    organization,
                    Some(&project.name),
                    r.name,
                    r.default_branch.as_deref().map(short_branch),
                )
            }));
        }

        Ok(descriptors)
    }

    fn clone_url(&self, repo: &RepositoryDescriptor, credential: &Credential) -> Option<String> {
        let project = repo.project()?;
        clone_url(
            credential.expose(),
            repo.organization(),
            project,
            repo.name(),
        )
        .ok()
    }

    fn archive_request(
        &self,
        repo: &RepositoryDescriptor,
        credential: &Credential,
    ) -> Result<HttpRequest> {
        let project = repo.project().ok_or_else(|| missing_project(repo))?;

        let branch = match repo.default_branch() {
            Some(branch) => branch.to_string(),
            None => {
                let (_, metadata): (_, AzureRepository) = self
                    .fetcher(repo.organization(), credential)
                    .fetch_json(
                        &repository_url(repo.organization(), project, repo.name())?,
                        None,
                    )?;
                metadata
                    .default_branch
                    .as_deref()
                    .map(short_branch)
                    .unwrap_or("main")
                    .to_string()
            }
        };

        Ok(HttpRequest::get(
            archive_url(repo.organization(), project, repo.name(), &branch)?,
            basic(credential),
        ))
    }
}
