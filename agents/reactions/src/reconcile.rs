//! Reaction Reconciler
//!
//! Two passes over the repository's reaction issues:
//!
//! 1. **Validate**: every open reaction issue is judged against the
//!    allow-list, labelled, commented on, closed and locked. Accepted issues
//!    get a metadata block carrying the batch identifier appended to the body.
//! 2. **Tally**: after a settling delay the closed, valid issues are read back
//!    (oldest first), scoped to this batch, reduced to one reaction per author
//!    and grouped per reaction.
//!
//! Feed only open issues into the first pass: an accepted issue processed
//! twice gets the metadata block appended twice.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::github::{Direction, Issue, IssueQuery, IssueState, IssueTracker, IssueUpdate, Label};

pub const TYPE_LABEL: &str = "type: reaction";
pub const VALID_LABEL: &str = "reaction:state: valid";
pub const INVALID_LABEL: &str = "reaction:state: invalid";

pub const ACCEPTED_COMMENT: &str = "Your reaction has been added! 🎉";
pub const REJECTED_COMMENT: &str = "Sadly, this reaction is not allowed. 🙁";

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Exact, case-sensitive reaction strings
    pub allowed_reactions: Vec<String>,
    /// Extra labels required on, and applied to, every reaction issue
    pub additional_labels: Vec<String>,
    /// Batch identifier stamped into accepted issues
    pub reaction_id: String,
    /// Wait between closing issues and reading them back
    pub settle_delay: Duration,
}

// ============================================================
// Labels and verdicts
// ============================================================

/// Labels that must exist before issues are touched
pub fn label_catalogue(additional_labels: &[String]) -> Vec<Label> {
    // Colors: Material Design 400 shades
    let mut labels = vec![
        Label::with_style(TYPE_LABEL, "FFEE58", "Reaction to something"),
        Label::with_style(VALID_LABEL, "66BB6A", "Valid reaction"),
        Label::with_style(INVALID_LABEL, "EF5350", "Invalid reaction"),
    ];
    labels.extend(additional_labels.iter().map(Label::named));
    labels
}

pub fn valid_labels(additional_labels: &[String]) -> Vec<String> {
    let mut labels = additional_labels.to_vec();
    labels.push(TYPE_LABEL.to_string());
    labels.push(VALID_LABEL.to_string());
    labels
}

pub fn invalid_labels(additional_labels: &[String]) -> Vec<String> {
    let mut labels = vec![TYPE_LABEL.to_string(), INVALID_LABEL.to_string()];
    labels.extend_from_slice(additional_labels);
    labels
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// Exact match against the allow-list, no normalisation
pub fn judge(title: &str, allowed_reactions: &[String]) -> Verdict {
    if allowed_reactions.iter().any(|allowed| allowed == title) {
        Verdict::Accepted
    } else {
        Verdict::Rejected
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssueMetadata<'a> {
    reaction_id: &'a str,
}

/// Collapsible JSON block appended to accepted issue bodies
pub fn metadata_block(reaction_id: &str) -> String {
    let json = serde_json::to_string_pretty(&IssueMetadata { reaction_id })
        .unwrap_or_else(|_| format!("{{\"reactionId\": {:?}}}", reaction_id));
    format!("\n<details>\n\n```json\n{}\n```\n</details>\n", json)
}

// ============================================================
// Tally
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEntry {
    pub reaction: String,
    pub url: String,
    pub number: u64,
    pub user: ReactionUser,
}

impl From<&Issue> for ReactionEntry {
    fn from(issue: &Issue) -> Self {
        Self {
            reaction: issue.title.clone(),
            url: issue.url.clone(),
            number: issue.number,
            user: ReactionUser {
                login: issue.user.as_ref().map(|u| u.login.clone()),
                url: issue.user.as_ref().map(|u| u.url.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTally {
    pub count: usize,
    pub reaction: String,
    pub reactions: Vec<ReactionEntry>,
}

/// Reaction string -> tally, in order of first appearance
pub type Tallies = IndexMap<String, ReactionTally>;

/// Count this batch's reactions, one per author.
///
/// `issues` must be ordered oldest first; the first issue of each author wins.
pub fn aggregate(issues: &[Issue], reaction_id: &str) -> Tallies {
    let mut authors: HashSet<Option<u64>> = HashSet::new();
    let mut tallies = Tallies::new();

    let counted = issues
        .iter()
        .filter(|issue| issue.body().contains(reaction_id))
        .filter(|issue| !issue.is_pull_request())
        .filter(|issue| authors.insert(issue.user_id()));

    for issue in counted {
        let tally = tallies
            .entry(issue.title.clone())
            .or_insert_with(|| ReactionTally {
                count: 0,
                reaction: issue.title.clone(),
                reactions: Vec::new(),
            });
        tally.reactions.push(ReactionEntry::from(issue));
        tally.count = tally.reactions.len();
    }

    tallies
}

/// Write the tallies as pretty-printed JSON
pub fn write_tallies(path: &Path, tallies: &Tallies) -> Result<()> {
    let json = serde_json::to_string_pretty(tallies)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write reactions file {}", path.display()))
}

// ============================================================
// Reconciler
// ============================================================

/// What a full run did
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub created_labels: Vec<String>,
    pub accepted: Vec<u64>,
    pub rejected: Vec<u64>,
    pub tallies: Tallies,
}

pub struct Reconciler<'a, T: IssueTracker + ?Sized> {
    tracker: &'a T,
    config: &'a ReconcileConfig,
}

impl<'a, T: IssueTracker + ?Sized> Reconciler<'a, T> {
    pub fn new(tracker: &'a T, config: &'a ReconcileConfig) -> Self {
        Self { tracker, config }
    }

    /// Validate, settle, tally
    pub async fn run(&self) -> Result<ReconcileReport> {
        let created_labels = self.ensure_labels().await?;
        let (accepted, rejected) = self.process_open_issues().await?;

        debug!(delay = ?self.config.settle_delay, "Waiting for GitHub to settle");
        tokio::time::sleep(self.config.settle_delay).await;

        let tallies = self.tally().await?;

        Ok(ReconcileReport {
            created_labels,
            accepted,
            rejected,
            tallies,
        })
    }

    /// Create any missing label; returns the names created
    pub async fn ensure_labels(&self) -> Result<Vec<String>> {
        let mut created = Vec::new();

        for label in label_catalogue(&self.config.additional_labels) {
            match self.tracker.get_label(&label.name).await {
                Ok(_) => debug!(label = %label.name, "Label exists"),
                Err(e) if e.is_not_found() => {
                    info!(label = %label.name, "🏷️  Creating label");
                    self.tracker
                        .create_label(&label)
                        .await
                        .with_context(|| format!("Failed to create label '{}'", label.name))?;
                    created.push(label.name);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to look up label '{}'", label.name))
                }
            }
        }

        Ok(created)
    }

    /// Judge and close every open reaction issue; returns (accepted, rejected)
    pub async fn process_open_issues(&self) -> Result<(Vec<u64>, Vec<u64>)> {
        let query = IssueQuery {
            state: IssueState::Open,
            labels: vec![TYPE_LABEL.to_string()],
            created: None,
        };
        let open = self
            .tracker
            .list_issues(&query)
            .await
            .context("Failed to list open reaction issues")?;
        info!(count = open.len(), "📬 Open reaction issues");

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for issue in &open {
            match self.process_issue(issue).await? {
                Verdict::Accepted => accepted.push(issue.number),
                Verdict::Rejected => rejected.push(issue.number),
            }
        }

        Ok((accepted, rejected))
    }

    /// Label, annotate, close, comment on and lock one issue
    pub async fn process_issue(&self, issue: &Issue) -> Result<Verdict> {
        let verdict = judge(&issue.title, &self.config.allowed_reactions);
        let additional = &self.config.additional_labels;

        let (update, comment) = match verdict {
            Verdict::Accepted => (
                IssueUpdate {
                    state: Some(IssueState::Closed),
                    body: Some(format!(
                        "{}{}",
                        issue.body(),
                        metadata_block(&self.config.reaction_id)
                    )),
                    labels: Some(valid_labels(additional)),
                },
                ACCEPTED_COMMENT,
            ),
            Verdict::Rejected => (
                IssueUpdate {
                    state: Some(IssueState::Closed),
                    body: None,
                    labels: Some(invalid_labels(additional)),
                },
                REJECTED_COMMENT,
            ),
        };

        match verdict {
            Verdict::Accepted => info!(number = issue.number, reaction = %issue.title, "✅ Accepting reaction"),
            Verdict::Rejected => warn!(number = issue.number, reaction = %issue.title, "❌ Rejecting reaction"),
        }

        self.tracker
            .update_issue(issue.number, &update)
            .await
            .with_context(|| format!("Failed to update issue #{}", issue.number))?;
        self.tracker
            .create_comment(issue.number, comment)
            .await
            .with_context(|| format!("Failed to comment on issue #{}", issue.number))?;
        self.tracker
            .lock_issue(issue.number)
            .await
            .with_context(|| format!("Failed to lock issue #{}", issue.number))?;

        Ok(verdict)
    }

    /// Read back this batch's valid issues and count them
    pub async fn tally(&self) -> Result<Tallies> {
        let query = IssueQuery {
            state: IssueState::Closed,
            labels: valid_labels(&self.config.additional_labels),
            created: Some(Direction::Asc),
        };
        let closed = self
            .tracker
            .list_issues(&query)
            .await
            .context("Failed to list valid reaction issues")?;

        let tallies = aggregate(&closed, &self.config.reaction_id);
        info!(
            issues = closed.len(),
            reactions = tallies.len(),
            "📊 Tallied reactions"
        );
        Ok(tallies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{GitHubError, User};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const BATCH: &str = "batch-2022-01";

    fn user(id: u64, login: &str) -> User {
        User {
            id,
            login: login.to_string(),
            url: format!("https://api.github.com/users/{}", login),
        }
    }

    fn issue(number: u64, title: &str, author: User) -> Issue {
        Issue {
            number,
            title: title.to_string(),
            body: Some("Reaction".to_string()),
            url: format!("https://api.github.com/repos/o/r/issues/{}", number),
            state: IssueState::Open,
            labels: vec![Label::named(TYPE_LABEL)],
            user: Some(author),
            locked: false,
            pull_request: None,
            created_at: Some(format!("2022-01-01T00:00:{:02}Z", number)),
        }
    }

    fn counted(number: u64, title: &str, author: User) -> Issue {
        let mut issue = issue(number, title, author);
        issue.state = IssueState::Closed;
        issue.body = Some(format!("Reaction{}", metadata_block(BATCH)));
        issue.labels = vec![Label::named(TYPE_LABEL), Label::named(VALID_LABEL)];
        issue
    }

    fn config(allowed: &[&str]) -> ReconcileConfig {
        ReconcileConfig {
            allowed_reactions: allowed.iter().map(|r| r.to_string()).collect(),
            additional_labels: Vec::new(),
            reaction_id: BATCH.to_string(),
            settle_delay: Duration::ZERO,
        }
    }

    /// In-memory repository behaving like the issues API
    #[derive(Default)]
    struct FakeTracker {
        labels: Mutex<Vec<Label>>,
        issues: Mutex<Vec<Issue>>,
        comments: Mutex<Vec<(u64, String)>>,
        fail_label_lookup: bool,
    }

    impl FakeTracker {
        fn with_issues(issues: Vec<Issue>) -> Self {
            Self {
                issues: Mutex::new(issues),
                ..Default::default()
            }
        }

        fn issue(&self, number: u64) -> Issue {
            self.issues
                .lock()
                .unwrap()
                .iter()
                .find(|i| i.number == number)
                .cloned()
                .unwrap()
        }
    }

    #[async_trait]
    impl IssueTracker for FakeTracker {
        async fn get_label(&self, name: &str) -> Result<Label, GitHubError> {
            if self.fail_label_lookup {
                return Err(GitHubError::Api {
                    status: 401,
                    body: "Bad credentials".to_string(),
                });
            }
            self.labels
                .lock()
                .unwrap()
                .iter()
                .find(|l| l.name == name)
                .cloned()
                .ok_or(GitHubError::Api {
                    status: 404,
                    body: "Not Found".to_string(),
                })
        }

        async fn create_label(&self, label: &Label) -> Result<Label, GitHubError> {
            self.labels.lock().unwrap().push(label.clone());
            Ok(label.clone())
        }

        async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, GitHubError> {
            let mut issues: Vec<Issue> = self
                .issues
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.state == query.state)
                .filter(|i| query.labels.iter().all(|l| i.has_label(l)))
                .cloned()
                .collect();
            match query.created {
                Some(Direction::Asc) => issues.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
                Some(Direction::Desc) => issues.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
                None => {}
            }
            Ok(issues)
        }

        async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<Issue, GitHubError> {
            let mut issues = self.issues.lock().unwrap();
            let issue = issues.iter_mut().find(|i| i.number == number).unwrap();
            if let Some(state) = update.state {
                issue.state = state;
            }
            if let Some(body) = &update.body {
                issue.body = Some(body.clone());
            }
            if let Some(labels) = &update.labels {
                issue.labels = labels.iter().map(Label::named).collect();
            }
            Ok(issue.clone())
        }

        async fn create_comment(&self, number: u64, body: &str) -> Result<(), GitHubError> {
            self.comments.lock().unwrap().push((number, body.to_string()));
            Ok(())
        }

        async fn lock_issue(&self, number: u64) -> Result<(), GitHubError> {
            let mut issues = self.issues.lock().unwrap();
            issues.iter_mut().find(|i| i.number == number).unwrap().locked = true;
            Ok(())
        }
    }

    #[test]
    fn test_judge_is_exact_and_case_sensitive() {
        let allowed = vec!["👍".to_string(), "ok".to_string()];
        assert_eq!(judge("👍", &allowed), Verdict::Accepted);
        assert_eq!(judge("OK", &allowed), Verdict::Rejected);
        assert_eq!(judge(" 👍", &allowed), Verdict::Rejected);
        assert_eq!(judge("👍🏽", &allowed), Verdict::Rejected);
    }

    #[test]
    fn test_metadata_block() {
        assert_eq!(
            metadata_block("abc"),
            "\n<details>\n\n```json\n{\n  \"reactionId\": \"abc\"\n}\n```\n</details>\n"
        );
    }

    #[test]
    fn test_label_sets() {
        let additional = vec!["blog: post-1".to_string()];
        assert_eq!(
            valid_labels(&additional),
            vec!["blog: post-1", TYPE_LABEL, VALID_LABEL]
        );
        assert_eq!(
            invalid_labels(&additional),
            vec![TYPE_LABEL, INVALID_LABEL, "blog: post-1"]
        );
        let catalogue = label_catalogue(&additional);
        assert_eq!(catalogue.len(), 4);
        assert_eq!(catalogue[0].color.as_deref(), Some("FFEE58"));
        assert_eq!(catalogue[3], Label::named("blog: post-1"));
    }

    #[test]
    fn test_one_reaction_per_author_earliest_wins() {
        let alice = user(1, "alice");
        let issues = vec![
            counted(1, "👍", alice.clone()),
            counted(2, "👍", alice.clone()),
            counted(3, "🎉", alice),
        ];

        let tallies = aggregate(&issues, BATCH);

        assert_eq!(tallies.len(), 1);
        let thumbs = &tallies["👍"];
        assert_eq!(thumbs.count, 1);
        assert_eq!(thumbs.reactions[0].number, 1);
    }

    #[test]
    fn test_other_batches_and_pull_requests_are_ignored() {
        let mut old = counted(1, "👍", user(1, "alice"));
        old.body = Some(format!("Reaction{}", metadata_block("batch-2021-12")));
        let mut pr = counted(2, "👍", user(2, "bob"));
        pr.pull_request = Some(serde_json::json!({"url": "https://api.github.com/repos/o/r/pulls/2"}));
        let current = counted(3, "👎", user(3, "carol"));

        let tallies = aggregate(&[old, pr, current], BATCH);

        assert!(!tallies.contains_key("👍"));
        assert_eq!(tallies["👎"].count, 1);
        assert_eq!(tallies["👎"].reactions[0].user.login.as_deref(), Some("carol"));
    }

    #[test]
    fn test_counts_match_entries_and_logins_are_unique() {
        let issues: Vec<Issue> = (1..=12u64)
            .map(|n| {
                let title = if n % 3 == 0 { "🎉" } else { "👍" };
                counted(n, title, user(n % 5, &format!("user{}", n % 5)))
            })
            .collect();

        let tallies = aggregate(&issues, BATCH);

        let mut seen_logins = HashSet::new();
        for (reaction, tally) in &tallies {
            assert_eq!(&tally.reaction, reaction);
            assert_eq!(tally.count, tally.reactions.len());
            for entry in &tally.reactions {
                assert!(seen_logins.insert(entry.user.login.clone()));
            }
        }
        assert_eq!(seen_logins.len(), 5);
    }

    #[test]
    fn test_tally_json_shape() {
        let tallies = aggregate(&[counted(4, "👍", user(9, "octocat"))], BATCH);
        let json = serde_json::to_value(&tallies).unwrap();
        assert_eq!(json["👍"]["count"], 1);
        assert_eq!(json["👍"]["reaction"], "👍");
        assert_eq!(json["👍"]["reactions"][0]["number"], 4);
        assert_eq!(json["👍"]["reactions"][0]["user"]["login"], "octocat");
        assert_eq!(
            json["👍"]["reactions"][0]["user"]["url"],
            "https://api.github.com/users/octocat"
        );
    }

    #[tokio::test]
    async fn test_ensure_labels_creates_only_missing() {
        let tracker = FakeTracker::default();
        tracker.labels.lock().unwrap().push(Label::named(TYPE_LABEL));
        let mut config = config(&["👍"]);
        config.additional_labels = vec!["blog: post-1".to_string()];

        let created = Reconciler::new(&tracker, &config).ensure_labels().await.unwrap();

        assert_eq!(created, vec![VALID_LABEL, INVALID_LABEL, "blog: post-1"]);
        assert_eq!(tracker.labels.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_label_lookup_errors_propagate() {
        let tracker = FakeTracker {
            fail_label_lookup: true,
            ..Default::default()
        };
        let config = config(&["👍"]);

        let result = Reconciler::new(&tracker, &config).ensure_labels().await;

        assert!(result.is_err());
        assert!(tracker.labels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_run() {
        let tracker = FakeTracker::with_issues(vec![
            issue(1, "👍", user(1, "alice")),
            issue(2, "👎", user(2, "bob")),
            issue(3, "🎉", user(3, "carol")),
        ]);
        let config = config(&["👍", "👎"]);

        let report = Reconciler::new(&tracker, &config).run().await.unwrap();

        assert_eq!(report.accepted, vec![1, 2]);
        assert_eq!(report.rejected, vec![3]);

        let party = tracker.issue(3);
        assert_eq!(party.state, IssueState::Closed);
        assert!(party.locked);
        assert!(party.has_label(INVALID_LABEL));
        assert_eq!(party.body(), "Reaction");

        for number in [1, 2] {
            let accepted = tracker.issue(number);
            assert_eq!(accepted.state, IssueState::Closed);
            assert!(accepted.locked);
            assert!(accepted.has_label(VALID_LABEL));
            assert!(accepted.body().contains(BATCH));
        }

        let comments = tracker.comments.lock().unwrap().clone();
        assert!(comments.contains(&(1, ACCEPTED_COMMENT.to_string())));
        assert!(comments.contains(&(3, REJECTED_COMMENT.to_string())));

        assert_eq!(report.tallies.len(), 2);
        assert_eq!(report.tallies["👍"].count, 1);
        assert_eq!(report.tallies["👎"].count, 1);
        assert!(!report.tallies.contains_key("🎉"));
    }

    #[tokio::test]
    async fn test_run_counts_same_user_once() {
        let alice = user(1, "alice");
        let tracker = FakeTracker::with_issues(vec![
            counted(1, "👍", alice.clone()),
            issue(2, "👍", alice),
        ]);
        let config = config(&["👍"]);

        let report = Reconciler::new(&tracker, &config).run().await.unwrap();

        assert_eq!(report.accepted, vec![2]);
        assert_eq!(report.tallies["👍"].count, 1);
        assert_eq!(report.tallies["👍"].reactions[0].number, 1);
    }

    #[test]
    fn test_write_tallies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reactions.json");
        let tallies = aggregate(&[counted(1, "👍", user(1, "alice"))], BATCH);

        write_tallies(&path, &tallies).unwrap();

        let back: Tallies =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, tallies);
    }
}
