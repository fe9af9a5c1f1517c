//! Reaction Tools Library
//!
//! GitHub Issues as a lightweight reaction form: every issue titled with an
//! emoji is a reaction. Allowed reactions are accepted and stamped with the
//! batch identifier, others are rejected, and all of them end up closed and
//! locked. The accepted ones are then tallied into a JSON file.
//!
//! ## Binaries
//!
//! - `allowed-reactions`: build the allow-list JSON from emoji-bearing strings
//! - `reactions`: validate, close and tally reaction issues
//!
//! ## Example Pipeline
//!
//! ```bash
//! allowed-reactions --input "👍 👎 🎉 ❤️" --output allowed-reactions.json
//!
//! reactions \
//!   --allowed-reactions "$(jq -r 'join("")' allowed-reactions.json)" \
//!   --additional-issue-label "blog: my-post" \
//!   --reaction-id my-post \
//!   --output reactions.json
//! ```

pub mod allowed;
pub mod config;
pub mod github;
pub mod logging;
pub mod reconcile;

pub use config::{ReactionsConfig, Repository};
pub use github::{GitHubClient, IssueTracker};
pub use reconcile::{ReconcileConfig, Reconciler};
