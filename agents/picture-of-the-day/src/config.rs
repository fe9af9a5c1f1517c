//! Run configuration, built once from the command line

use std::path::PathBuf;

use crate::artifacts::{Bounds, DEFAULT_COPYRIGHT};
use crate::google_photos::OAuthCredentials;
use crate::history::METADATA_FILENAME;

pub const DEFAULT_ALBUM: &str = "Picture of the Day";

#[derive(Debug, Clone)]
pub struct PictureConfig {
    /// Exact title of the album to pick from
    pub album: String,
    pub credentials: OAuthCredentials,
    /// Where artifacts and the metadata file are written
    pub output_dir: PathBuf,
    pub bounds: Bounds,
    pub artist: Option<String>,
    pub copyright: String,
}

impl PictureConfig {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            album: DEFAULT_ALBUM.to_string(),
            credentials,
            output_dir: PathBuf::from("."),
            bounds: Bounds::default(),
            artist: None,
            copyright: DEFAULT_COPYRIGHT.to_string(),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir.join(METADATA_FILENAME)
    }
}
