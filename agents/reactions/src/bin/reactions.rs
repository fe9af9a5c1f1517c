//! Reaction Reconciler
//!
//! Validates open reaction issues against the allow-list, closes and locks
//! them, then writes a per-reaction tally of this batch.
//!
//! ## Usage
//! ```bash
//! reactions \
//!   --allowed-reactions "👍👎🎉" \
//!   --github-repository idelsink/idelsink \
//!   --github-token <TOKEN> \
//!   --reaction-id post-42
//!
//! # Inside GitHub Actions the repository, owner and token fall back to
//! # GITHUB_REPOSITORY, GITHUB_REPOSITORY_OWNER and GITHUB_TOKEN
//! REACTIONS_REACTION_ID=post-42 reactions --additional-issue-label "blog: post-42"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::info;

use reactions::allowed::{extract_emojis, DEFAULT_REACTION};
use reactions::logging::{self, LogFormat};
use reactions::reconcile::{write_tallies, DEFAULT_SETTLE_DELAY};
use reactions::{GitHubClient, ReactionsConfig, ReconcileConfig, Reconciler, Repository};

/// Reaction Reconciler
#[derive(Parser, Debug)]
#[command(name = "reactions")]
#[command(about = "Validate, close and tally emoji reactions posted as GitHub issues")]
#[command(version)]
struct Args {
    /// Allowed reactions; every emoji found in these strings is allowed
    #[arg(long, env = "REACTIONS_ALLOWED_REACTIONS", num_args = 1.., default_value = DEFAULT_REACTION)]
    allowed_reactions: Vec<String>,

    /// GitHub repository, `repo` or `owner/repo` [fallback: GITHUB_REPOSITORY]
    #[arg(long, env = "REACTIONS_GITHUB_REPOSITORY")]
    github_repository: Option<String>,

    /// GitHub repository owner [fallback: GITHUB_REPOSITORY_OWNER]
    #[arg(long, env = "REACTIONS_GITHUB_REPOSITORY_OWNER")]
    github_repository_owner: Option<String>,

    /// GitHub token for authentication [fallback: GITHUB_TOKEN]
    #[arg(long, env = "REACTIONS_GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Additional issue label to filter on (repeatable, or comma-separated)
    #[arg(long, env = "REACTIONS_ADDITIONAL_ISSUE_LABEL", value_delimiter = ',')]
    additional_issue_label: Vec<String>,

    /// Output location of JSON file with reactions
    #[arg(long, env = "REACTIONS_OUTPUT", default_value = "reactions.json")]
    output: PathBuf,

    /// The reaction (batch) identifier
    #[arg(long, env = "REACTIONS_REACTION_ID", value_parser = NonEmptyStringValueParser::new())]
    reaction_id: String,

    /// Seconds to wait for GitHub between closing issues and reading them back
    #[arg(long, env = "REACTIONS_SETTLE_SECONDS", default_value_t = DEFAULT_SETTLE_DELAY.as_secs())]
    settle_seconds: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, env = "REACTIONS_LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Flag value, else the GitHub Actions variable, else a usage error
fn required(value: Option<String>, fallback_env: &str, flag: &str) -> String {
    value
        .or_else(|| std::env::var(fallback_env).ok())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| {
            Args::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    format!("the following required argument was not provided: --{} (or {})", flag, fallback_env),
                )
                .exit()
        })
}

impl Args {
    fn into_config(self) -> ReactionsConfig {
        let repository = required(self.github_repository, "GITHUB_REPOSITORY", "github-repository");
        let actions_owner = std::env::var("GITHUB_REPOSITORY_OWNER").ok();
        let token = required(self.github_token, "GITHUB_TOKEN", "github-token");

        let repository = Repository::resolve_with_fallback(
            &repository,
            self.github_repository_owner.as_deref(),
            actions_owner.as_deref(),
        )
        .unwrap_or_else(|| {
            Args::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    format!(
                        "cannot tell the owner of '{}': pass --github-repository-owner or use owner/repo",
                        repository
                    ),
                )
                .exit()
        });

        ReactionsConfig {
            repository,
            token,
            reconcile: ReconcileConfig {
                allowed_reactions: extract_emojis(&self.allowed_reactions),
                additional_labels: self.additional_issue_label,
                reaction_id: self.reaction_id,
                settle_delay: Duration::from_secs(self.settle_seconds),
            },
            output: self.output,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    logging::init(args.verbose, args.log_format)?;
    info!("🤖 Reactions!");

    let config = args.into_config();
    info!(
        repository = %config.repository,
        reaction_id = %config.reconcile.reaction_id,
        allowed = ?config.reconcile.allowed_reactions,
        "Allowed reactions"
    );

    let client = GitHubClient::new(
        &config.token,
        &config.repository.owner,
        &config.repository.name,
    )
    .context("Failed to create GitHub client")?;

    let report = Reconciler::new(&client, &config.reconcile).run().await?;
    info!(
        accepted = report.accepted.len(),
        rejected = report.rejected.len(),
        labels_created = report.created_labels.len(),
        "Processed reaction issues"
    );

    write_tallies(&config.output, &report.tallies)?;
    info!("✅ Generated reactions file to {}", config.output.display());

    Ok(())
}
