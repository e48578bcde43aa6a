//! Error types for repoloclib

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::provider::Provider;

/// Where a provider request was headed when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Provider being queried
    pub provider: Provider,
    /// Organization (or workspace/group) being enumerated
    pub organization: String,
    /// Page number for paginated requests
    pub page: Option<u32>,
}

impl RequestContext {
    pub fn new(provider: Provider, organization: impl Into<String>) -> Self {
        Self {
            provider,
            organization: organization.into(),
            page: None,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} organization '{}'", self.provider, self.organization)?;
        if let Some(page) = self.page {
            write!(f, " page {}", page)?;
        }
        Ok(())
    }
}

/// Errors that can occur while discovering, acquiring or measuring repositories
#[derive(Error, Debug)]
pub enum RepolocError {
    /// Transport-level failure reaching a provider or archive host
    #[error("network error for {context}: {message}")]
    Network {
        context: RequestContext,
        message: String,
    },

    /// Provider answered with a non-success status
    #[error("{context} answered HTTP {status}")]
    ProviderStatus { context: RequestContext, status: u16 },

    /// Response body could not be decoded
    #[error("malformed response for {context}: {message}")]
    Decode {
        context: RequestContext,
        message: String,
    },

    /// Clone, download or extraction of one repository failed
    #[error("failed to acquire '{repository}': {reason}")]
    Acquisition { repository: String, reason: String },

    /// A materialized directory could not be removed
    #[error("failed to remove '{path}': {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Path does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// A per-repository report could not be parsed back
    #[error("malformed report '{path}': {message}")]
    MalformedReport { path: PathBuf, message: String },

    /// Unknown provider name
    #[error("unknown provider '{0}' (expected Local, GitHub, GitLab, Bitbucket or AzureDevOps)")]
    InvalidProvider(String),

    /// A request URL could not be built
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Inconsistent run options
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepolocError {
    /// Whether this error came out of talking to a provider API.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            RepolocError::Network { .. }
                | RepolocError::ProviderStatus { .. }
                | RepolocError::Decode { .. }
        )
    }
}
