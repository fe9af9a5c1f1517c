//! Picture of the Day Agent Library
//!
//! Picks a picture nobody has seen yet from a Google Photos album, writes a
//! full-size and a minimized copy tagged with authorship and license EXIF,
//! and records the pick in a JSON metadata file that doubles as history.

pub mod artifacts;
pub mod config;
pub mod google_photos;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod selection;

pub use config::PictureConfig;
pub use google_photos::{GooglePhotosClient, OAuthCredentials, PhotoLibrary};
pub use pipeline::{run, RunOutcome};
