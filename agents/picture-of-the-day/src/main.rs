//! Picture of the Day Agent
//!
//! Selects a picture from a Google Photos album that has not been shown
//! before, writes the tagged artifacts and the metadata file.
//!
//! # Usage
//! ```bash
//! picture-of-the-day \
//!   --google-client-id $ID \
//!   --google-client-secret $SECRET \
//!   --google-refresh-token $REFRESH \
//!   --output static/picture-of-the-day
//!
//! # Same, with environment variables (or a .env file)
//! PICTURE_OF_THE_DAY_GOOGLE_CLIENT_ID=... \
//! PICTURE_OF_THE_DAY_GOOGLE_CLIENT_SECRET=... \
//! PICTURE_OF_THE_DAY_GOOGLE_REFRESH_TOKEN=... \
//! picture-of-the-day --minimized-height 400
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use picture_of_the_day::artifacts::{Bounds, DEFAULT_COPYRIGHT};
use picture_of_the_day::config::DEFAULT_ALBUM;
use picture_of_the_day::logging::{self, LogFormat};
use picture_of_the_day::{GooglePhotosClient, OAuthCredentials, PictureConfig, RunOutcome};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser, Debug)]
#[command(name = "picture-of-the-day")]
#[command(about = "Select a Picture of the Day from a Google Photos album", long_about = None)]
#[command(version)]
struct Args {
    /// The Google Photos album to select a random picture from
    #[arg(long, env = "PICTURE_OF_THE_DAY_ALBUM", default_value = DEFAULT_ALBUM)]
    album: String,

    /// Google OAuth client ID
    #[arg(long, env = "PICTURE_OF_THE_DAY_GOOGLE_CLIENT_ID")]
    google_client_id: String,

    /// Google OAuth client secret
    #[arg(long, env = "PICTURE_OF_THE_DAY_GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    google_client_secret: String,

    /// Google refresh token
    #[arg(long, env = "PICTURE_OF_THE_DAY_GOOGLE_REFRESH_TOKEN", hide_env_values = true)]
    google_refresh_token: String,

    /// Output directory to store the files to
    #[arg(long, visible_alias = "directory", env = "PICTURE_OF_THE_DAY_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Maximum width of the minimized picture
    #[arg(long, env = "PICTURE_OF_THE_DAY_MINIMIZED_WIDTH", default_value_t = Bounds::SQUARE.width)]
    minimized_width: u32,

    /// Maximum height of the minimized picture (400 for the banner variant)
    #[arg(long, env = "PICTURE_OF_THE_DAY_MINIMIZED_HEIGHT", default_value_t = Bounds::SQUARE.height)]
    minimized_height: u32,

    /// Artist written into the EXIF tags
    #[arg(long, env = "PICTURE_OF_THE_DAY_ARTIST")]
    artist: Option<String>,

    /// Copyright notice written into the EXIF tags
    #[arg(long, env = "PICTURE_OF_THE_DAY_COPYRIGHT", default_value = DEFAULT_COPYRIGHT)]
    copyright: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, env = "PICTURE_OF_THE_DAY_LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn into_config(self) -> PictureConfig {
        let mut config = PictureConfig::new(OAuthCredentials {
            client_id: self.google_client_id,
            client_secret: self.google_client_secret,
            refresh_token: self.google_refresh_token,
        });
        config.album = self.album;
        config.output_dir = self.output;
        config.bounds = Bounds {
            width: self.minimized_width,
            height: self.minimized_height,
        };
        config.artist = self.artist;
        config.copyright = self.copyright;
        config
    }
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    logging::init(args.verbose, args.log_format)?;
    info!("📸 Picture of the Day!");

    let config = args.into_config();

    let library = GooglePhotosClient::authenticate(&config.credentials)
        .await
        .context("Failed to authenticate with Google")?;
    info!("✅ Authenticated with Google Photos");

    let mut rng = StdRng::from_entropy();
    match picture_of_the_day::run(&library, &config, &mut rng).await? {
        RunOutcome::Published(metadata) => {
            info!(id = %metadata.id, "✅ Picture of the Day published");
        }
        RunOutcome::AlbumNotFound => {
            info!("Nothing to do");
        }
    }

    Ok(())
}
