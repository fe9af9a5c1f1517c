//! Run configuration, built once from the command line

use std::path::PathBuf;

use crate::reconcile::ReconcileConfig;

/// Repository the reaction issues live in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    /// Accepts `repo` or `owner/repo` (the form GitHub Actions puts in
    /// `GITHUB_REPOSITORY`). An explicit owner wins over the embedded one.
    pub fn resolve(repository: &str, owner: Option<&str>) -> Option<Self> {
        let (embedded_owner, name) = match repository.split_once('/') {
            Some((owner, name)) => (Some(owner), name),
            None => (None, repository),
        };
        let owner = owner.filter(|o| !o.is_empty()).or(embedded_owner)?;

        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Like [`Repository::resolve`], with an ambient owner (such as
    /// `GITHUB_REPOSITORY_OWNER`) used only when neither the flag nor the
    /// repository value names one.
    pub fn resolve_with_fallback(
        repository: &str,
        owner: Option<&str>,
        fallback_owner: Option<&str>,
    ) -> Option<Self> {
        let owner = owner.filter(|o| !o.is_empty());
        let owner = match owner {
            Some(owner) => Some(owner),
            None if repository.contains('/') => None,
            None => fallback_owner,
        };
        Self::resolve(repository, owner)
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct ReactionsConfig {
    pub repository: Repository,
    pub token: String,
    pub reconcile: ReconcileConfig,
    /// Where the tally JSON is written
    pub output: PathBuf,
}
