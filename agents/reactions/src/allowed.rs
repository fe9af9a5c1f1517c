//! Allowed reactions
//!
//! Pulls every emoji out of free-form strings so an allow-list can be written
//! as `"👍 👎 🎉"` or `"thumbs: 👍, party: 🎉"` alike.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use indexmap::IndexSet;
use regex::Regex;

pub const DEFAULT_REACTION: &str = "👍";

/// One emoji: a flag, a keycap, or a pictograph with its presentation
/// selector, skin-tone modifier, tag sequence and ZWJ continuations.
const EMOJI_PATTERN: &str = concat!(
    r"\p{Regional_Indicator}{2}",
    r"|[0-9#*]\x{FE0F}?\x{20E3}",
    r"|(?:\p{Extended_Pictographic}|\p{Emoji_Presentation})",
    r"(?:\x{FE0F}|\p{Emoji_Modifier})*",
    r"(?:[\x{E0020}-\x{E007E}]+\x{E007F})?",
    r"(?:\x{200D}(?:\p{Extended_Pictographic}|\p{Emoji_Presentation})(?:\x{FE0F}|\p{Emoji_Modifier})*)*",
);

fn emoji_regex() -> &'static Regex {
    static EMOJI: OnceLock<Regex> = OnceLock::new();
    EMOJI.get_or_init(|| Regex::new(EMOJI_PATTERN).expect("emoji pattern is valid"))
}

/// Distinct emojis across all inputs, in order of first appearance
pub fn extract_emojis<I, S>(inputs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut emojis = IndexSet::new();
    for input in inputs {
        for found in emoji_regex().find_iter(input.as_ref()) {
            emojis.insert(found.as_str().to_string());
        }
    }
    emojis.into_iter().collect()
}

/// Write the allow-list as a pretty-printed JSON array
pub fn write_allowed_reactions(path: &Path, reactions: &[String]) -> Result<()> {
    let json = serde_json::to_string_pretty(reactions)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write allowed reactions file {}", path.display()))
}
