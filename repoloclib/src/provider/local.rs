//! Local path mode: a single synthetic repository.

use super::{DiscoveryFailure, Provider, RepositoryHost};
use crate::descriptor::{Credential, RepositoryDescriptor};
use crate::error::RepolocError;
use crate::http::HttpRequest;
use crate::Result;

/// Organization name used for the local scan
pub const LOCAL_ORGANIZATION: &str = "local-org";
/// Repository name used for the local scan
pub const LOCAL_REPOSITORY: &str = "local";

/// Host for scanning a path the user already has on disk.
///
/// Discovery yields exactly one descriptor (`local-org-local`); there is
/// nothing to clone or download.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl RepositoryHost for LocalHost {
    fn provider(&self) -> Provider {
        Provider::Local
    }

    fn discover(
        &self,
        _organization: &str,
        _credential: &Credential,
    ) -> std::result::Result<Vec<RepositoryDescriptor>, DiscoveryFailure> {
        Ok(vec![RepositoryDescriptor::new(
            LOCAL_ORGANIZATION,
            None,
            LOCAL_REPOSITORY,
            None,
        )])
    }

    fn clone_url(&self, _repo: &RepositoryDescriptor, _credential: &Credential) -> Option<String> {
        None
    }

    fn archive_request(
        &self,
        repo: &RepositoryDescriptor,
        _credential: &Credential,
    ) -> Result<HttpRequest> {
        Err(RepolocError::Acquisition {
            repository: repo.name().to_string(),
            reason: "local scans read the path in place".to_string(),
        })
    }
}
