//! GitLab groups.

use serde::Deserialize;
use tracing::info_span;

use super::paging::{api_url, link_has_relation, PagedFetch, PAGE_SIZE};
use super::{DiscoveryFailure, Provider, RepositoryHost};
use crate::descriptor::{Credential, RepositoryDescriptor};
use crate::http::{Auth, HttpClient, HttpRequest};
use crate::Result;

const API_ROOT: &str = "https://gitlab.com/api/v4";

#[derive(Debug, Deserialize)]
struct GitLabProject {
    name: String,
    /// URL slug; differs from `name` when the display name has spaces or capitals
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
}

/// Group projects listing URL.
pub fn discover_url(organization: &str, page: u32, page_size: u32) -> Result<String> {
    let url = api_url(
        API_ROOT,
        &["groups", organization, "projects"],
        &[
            ("per_page", page_size.to_string().as_str()),
            ("page", page.to_string().as_str()),
        ],
    )?;
    Ok(url.into())
}

/// Repository archive URL. Without a branch GitLab serves the default branch.
pub fn archive_url(
    organization: &str,
    repository: &str,
    branch: Option<&str>,
) -> Result<String> {
    // The project is addressed by its full path as a single segment
    let project = format!("{}/{}", organization, repository);
    let segments = ["projects", project.as_str(), "repository", "archive.zip"];
    let url = match branch {
        Some(branch) => api_url(API_ROOT, &segments, &[("sha", branch)])?,
        None => api_url(API_ROOT, &segments, &[])?,
    };
    Ok(url.into())
}

/// Clone URL with the token as the password of the `oauth2` user.
pub fn clone_url(token: &str, organization: &str, repository: &str) -> String {
    format!(
        "https://oauth2:{}@gitlab.com/{}/{}.git",
        token, organization, repository
    )
}

/// GitLab host.
///
/// Pages are fetched while the `Link` header advertises a `rel="next"` relation.
pub struct GitLab<'a> {
    http: &'a dyn HttpClient,
}

impl<'a> GitLab<'a> {
    pub fn new(http: &'a dyn HttpClient) -> Self {
        Self { http }
    }
}

impl RepositoryHost for GitLab<'_> {
    fn provider(&self) -> Provider {
        Provider::GitLab
    }

    fn discover(
        &self,
        organization: &str,
        credential: &Credential,
    ) -> std::result::Result<Vec<RepositoryDescriptor>, DiscoveryFailure> {
        let _span = info_span!("discover", provider = "GitLab", organization).entered();

        let fetch = PagedFetch {
            http: self.http,
            provider: Provider::GitLab,
            organization,
            auth: Auth::Bearer(credential.expose().to_string()),
            accept: None,
        };

        fetch.fetch_pages(
            |page| discover_url(organization, page, PAGE_SIZE),
            |response, _: &Vec<GitLabProject>| link_has_relation(response.header("link"), "next"),
            |projects| {
                projects
                    .into_iter()
                    .map(|p| {
                        let name = p.path.unwrap_or(p.name);
                        RepositoryDescriptor::new(
                            organization,
                            None,
                            name,
                            p.default_branch.as_deref(),
                        )
                    })
                    .collect()
            },
        )
    }

    fn clone_url(&self, repo: &RepositoryDescriptor, credential: &Credential) -> Option<String> {
        Some(clone_url(
            credential.expose(),
            repo.organization(),
            repo.name(),
        ))
    }

    fn archive_request(
        &self,
        repo: &RepositoryDescriptor,
        credential: &Credential,
    ) -> Result<HttpRequest> {
        Ok(HttpRequest::get(
            archive_url(repo.organization(), repo.name(), repo.default_branch())?,
            Auth::Bearer(credential.expose().to_string()),
        ))
    }
}
