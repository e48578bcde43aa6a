//! Repository identity and credentials.

use std::fmt;

use serde::Serialize;

/// Immutable identity record for one repository, as produced by discovery.
///
/// The `id` is derived from the organization, optional project and repository
/// name, so it is stable across runs and doubles as the report file name.
/// Descriptors are only built through [`RepositoryDescriptor::new`], which
/// keeps the id in step with its parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryDescriptor {
    id: String,
    organization: String,
    project: Option<String>,
    name: String,
    default_branch: Option<String>,
}

impl RepositoryDescriptor {
    /// Create a descriptor. Empty project or branch strings are treated as absent.
    pub fn new(
        organization: impl Into<String>,
        project: Option<&str>,
        name: impl Into<String>,
        default_branch: Option<&str>,
    ) -> Self {
        let organization = organization.into();
        let name = name.into();
        let project = project.filter(|p| !p.is_empty()).map(str::to_string);
        let default_branch = default_branch
            .filter(|b| !b.is_empty())
            .map(str::to_string);

        let id = match &project {
            Some(project) => format!("{}-{}-{}", organization, project, name),
            None => format!("{}-{}", organization, name),
        };

        Self {
            id,
            organization,
            project,
            name,
            default_branch,
        }
    }

    /// Stable identifier: `organization-[project-]repository`
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Project name, for providers that group repositories in projects
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default branch, when the listing carried it
    pub fn default_branch(&self) -> Option<&str> {
        self.default_branch.as_deref()
    }
}

impl fmt::Display for RepositoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// An opaque access token.
///
/// Never printed: `Debug` and `Display` are redacted so the token cannot leak
/// through logs or error messages.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for embedding into headers or clone URLs.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace every occurrence of the token in `text` with `***`.
    pub fn redact(&self, text: &str) -> String {
        if self.0.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.0, "***")
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
