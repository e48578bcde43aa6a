//! Repository selection by name.
//!
//! Exclusion always wins: a repository listed in both lists is dropped.
//! Matching is exact and case-sensitive on the repository name only.

use tracing::info;

use crate::descriptor::RepositoryDescriptor;

/// Why a descriptor was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Keep,
    /// Named in the exclude list
    Excluded,
    /// An include list exists and does not name it
    NotIncluded,
}

/// Exclude/include lists of repository names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryFilter {
    /// Names to drop
    pub exclude: Vec<String>,
    /// Names to keep (if empty, keep everything not excluded)
    pub include: Vec<String>,
}

impl RepositoryFilter {
    /// Create an empty filter (keeps everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exclude list.
    pub fn exclude(mut self, names: Vec<String>) -> Self {
        self.exclude = names;
        self
    }

    /// Set the include list.
    pub fn include(mut self, names: Vec<String>) -> Self {
        self.include = names;
        self
    }

    /// Whether neither list names anything.
    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.include.is_empty()
    }

    /// Decide one repository name.
    pub fn select(&self, name: &str) -> Selection {
        if self.exclude.iter().any(|n| n == name) {
            return Selection::Excluded;
        }

        if !self.include.is_empty() && !self.include.iter().any(|n| n == name) {
            return Selection::NotIncluded;
        }

        Selection::Keep
    }

    /// Keep the descriptors that pass, preserving order.
    pub fn apply(&self, descriptors: Vec<RepositoryDescriptor>) -> Vec<RepositoryDescriptor> {
        let total = descriptors.len();
        descriptors
            .into_iter()
            .enumerate()
            .filter(|(index, repo)| match self.select(repo.name()) {
                Selection::Keep => true,
                Selection::Excluded => {
                    info!(
                        "{}/{} skipping {} as it is in the exclude list",
                        index + 1,
                        total,
                        repo.name()
                    );
                    false
                }
                Selection::NotIncluded => {
                    info!(
                        "{}/{} skipping {} as it is not in the include list",
                        index + 1,
                        total,
                        repo.name()
                    );
                    false
                }
            })
            .map(|(_, repo)| repo)
            .collect()
    }
}
