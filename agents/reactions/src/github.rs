//! GitHub Issues API Client
//!
//! The handful of REST endpoints the reaction workflow needs: labels,
//! paginated issue listing, issue updates, comments and locking. Requests go
//! through octocrab, which also follows the `Link` pagination.

use async_trait::async_trait;
use octocrab::params::LockReason;
use octocrab::{Octocrab, Page};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const PER_PAGE: u32 = 100;

// ============================================================
// API Types
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            description: None,
        }
    }

    pub fn with_style(name: &str, color: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            color: Some(color.to_string()),
            description: Some(description.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub user: Option<User>,
    #[serde(default)]
    pub locked: bool,
    /// Present only when the "issue" is a pull request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Issue {
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|user| user.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Filters for the repository issue listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub state: IssueState,
    /// Issues must carry every one of these labels
    pub labels: Vec<String>,
    /// Sort by creation time in this direction
    pub created: Option<Direction>,
}

impl IssueQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("state", self.state.as_str().to_string()),
            ("labels", self.labels.join(",")),
            ("per_page", PER_PAGE.to_string()),
        ];
        if let Some(direction) = self.created {
            params.push(("sort", "created".to_string()));
            params.push((
                "direction",
                match direction {
                    Direction::Asc => "asc",
                    Direction::Desc => "desc",
                }
                .to_string(),
            ));
        }
        params
    }
}

/// PATCH body for an issue; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("GitHub request failed: {0}")]
    Client(octocrab::Error),
}

impl GitHubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::Api { status: 404, .. })
    }
}

impl From<octocrab::Error> for GitHubError {
    fn from(error: octocrab::Error) -> Self {
        match error {
            octocrab::Error::GitHub { source, .. } => GitHubError::Api {
                status: source.status_code.as_u16(),
                body: source.message,
            },
            other => GitHubError::Client(other),
        }
    }
}

/// Issue operations against one repository
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_label(&self, name: &str) -> Result<Label, GitHubError>;

    async fn create_label(&self, label: &Label) -> Result<Label, GitHubError>;

    /// Every matching issue, pages concatenated in order
    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, GitHubError>;

    async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<Issue, GitHubError>;

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), GitHubError>;

    async fn lock_issue(&self, number: u64) -> Result<(), GitHubError>;
}

// ============================================================
// Client Implementation
// ============================================================

/// octocrab-backed tracker for one repository
pub struct GitHubClient {
    client: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self, GitHubError> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;

        Ok(Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    fn route(&self, path: &str) -> String {
        format!("/repos/{}/{}/{}", self.owner, self.repo, path)
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn get_label(&self, name: &str) -> Result<Label, GitHubError> {
        let route = self.route(&format!("labels/{}", urlencoding::encode(name)));
        Ok(self.client.get(route, None::<&()>).await?)
    }

    async fn create_label(&self, label: &Label) -> Result<Label, GitHubError> {
        Ok(self.client.post(self.route("labels"), Some(label)).await?)
    }

    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, GitHubError> {
        let first: Page<Issue> = self
            .client
            .get(self.route("issues"), Some(&query.params()))
            .await?;
        debug!(
            count = first.items.len(),
            more = first.next.is_some(),
            "Fetched first issue page"
        );

        Ok(self.client.all_pages(first).await?)
    }

    async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<Issue, GitHubError> {
        let route = self.route(&format!("issues/{}", number));
        Ok(self.client.patch(route, Some(update)).await?)
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), GitHubError> {
        let route = self.route(&format!("issues/{}/comments", number));
        let _comment: serde_json::Value =
            self.client.post(route, Some(&CommentRequest { body })).await?;
        Ok(())
    }

    async fn lock_issue(&self, number: u64) -> Result<(), GitHubError> {
        let locked = self
            .client
            .issues(&self.owner, &self.repo)
            .lock(number, None::<LockReason>)
            .await?;
        if !locked {
            debug!(number, "Lock request returned no 204");
        }
        Ok(())
    }
}
