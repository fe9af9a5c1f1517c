//! Allowed Reactions Builder
//!
//! Extracts every distinct emoji from the given strings and writes them as a
//! JSON array.
//!
//! ## Usage
//! ```bash
//! allowed-reactions --input "👍 👎" --input "🎉" --output allowed-reactions.json
//!
//! # With environment variables
//! ALLOWED_REACTIONS_INPUT="👍👎🎉" allowed-reactions
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use reactions::allowed::{extract_emojis, write_allowed_reactions, DEFAULT_REACTION};
use reactions::logging::{self, LogFormat};

/// Allowed Reactions Builder
#[derive(Parser, Debug)]
#[command(name = "allowed-reactions")]
#[command(about = "Build the allowed reactions JSON file from emoji-bearing strings")]
#[command(version)]
struct Args {
    /// Strings that contain emojis
    #[arg(long, env = "ALLOWED_REACTIONS_INPUT", num_args = 1.., default_value = DEFAULT_REACTION)]
    input: Vec<String>,

    /// Output location of JSON file with allowed reactions
    #[arg(long, env = "ALLOWED_REACTIONS_OUTPUT", default_value = "allowed-reactions.json")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    logging::init(args.verbose, LogFormat::Text)?;
    info!("✨ Allowed reactions!");

    let allowed = extract_emojis(&args.input);
    info!(allowed = ?allowed, "Allowed reactions");

    write_allowed_reactions(&args.output, &allowed)?;
    info!("✅ Generated allowed reactions file to {}", args.output.display());

    Ok(())
}
