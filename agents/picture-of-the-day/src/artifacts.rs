//! Image artifacts
//!
//! Two files per run: the original as downloaded and a minimized WebP that
//! fits inside a bounding box. Both get authorship and license EXIF tags.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use tracing::{debug, info};

use crate::history::Artifacts;

pub const ORIGINAL_STEM: &str = "picture-of-the-day-original";
pub const MINIMIZED_FILENAME: &str = "picture-of-the-day-minimized.webp";

pub const DEFAULT_COPYRIGHT: &str = "This work is licensed under a Creative Commons \
    Attribution-ShareAlike 4.0 International License. To view a copy of this license, \
    visit http://creativecommons.org/licenses/by-sa/4.0/";

/// Box the minimized artifact must fit inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const SQUARE: Bounds = Bounds {
        width: 800,
        height: 800,
    };
    pub const BANNER: Bounds = Bounds {
        width: 800,
        height: 400,
    };
}

impl Default for Bounds {
    fn default() -> Self {
        Self::SQUARE
    }
}

/// EXIF tags written into every artifact
#[derive(Debug, Clone)]
pub struct ExifTags {
    pub artist: Option<String>,
    pub copyright: String,
    /// RFC 3339 creation time as reported by the photo library
    pub create_date: Option<String>,
    pub description: String,
    pub software: String,
}

impl ExifTags {
    fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(artist) = self.artist.as_ref().filter(|a| !a.is_empty()) {
            metadata.set_tag(ExifTag::Artist(artist.clone()));
        }
        metadata.set_tag(ExifTag::Copyright(self.copyright.clone()));
        metadata.set_tag(ExifTag::ImageDescription(self.description.clone()));
        metadata.set_tag(ExifTag::UserComment(user_comment(&self.description)));
        metadata.set_tag(ExifTag::Software(self.software.clone()));
        if let Some(date) = self.create_date.as_deref().and_then(exif_date) {
            metadata.set_tag(ExifTag::CreateDate(date));
        }
        metadata
    }
}

/// UserComment payload: 8-byte character code, then the text.
/// Non-ASCII text goes out as UTF-8 under the undefined code.
fn user_comment(text: &str) -> Vec<u8> {
    let code: &[u8; 8] = if text.is_ascii() {
        b"ASCII\0\0\0"
    } else {
        &[0; 8]
    };
    let mut comment = code.to_vec();
    comment.extend_from_slice(text.as_bytes());
    comment
}

/// `2021-06-12T18:30:00Z` -> `2021:06:12 18:30:00`
fn exif_date(rfc3339: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(rfc3339)
        .ok()
        .map(|t| t.format("%Y:%m:%d %H:%M:%S").to_string())
}

/// File name of the original artifact for a MIME type
pub fn original_filename(mime_type: &str) -> String {
    let extension = ImageFormat::from_mime_type(mime_type)
        .and_then(|format| format.extensions_str().first().copied())
        .map(str::to_string)
        .or_else(|| {
            mime_type
                .split_once('/')
                .map(|(_, subtype)| subtype.to_string())
                .filter(|subtype| !subtype.is_empty())
        })
        .unwrap_or_else(|| "bin".to_string());

    format!("{}.{}", ORIGINAL_STEM, extension)
}

/// Decode, fit inside `bounds` keeping the aspect ratio, encode as WebP.
///
/// Returns the dimensions actually written.
pub fn save_minimized(bytes: &[u8], path: &Path, bounds: Bounds) -> Result<(u32, u32)> {
    let image = image::load_from_memory(bytes).context("Failed to decode downloaded image")?;
    let resized = image.resize(bounds.width, bounds.height, FilterType::Lanczos3);
    // The WebP encoder only takes 8-bit RGB(A)
    let resized = DynamicImage::ImageRgba8(resized.to_rgba8());

    resized
        .save_with_format(path, ImageFormat::WebP)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!(
        from = %format!("{}x{}", image.width(), image.height()),
        to = %format!("{}x{}", resized.width(), resized.height()),
        "Resized image"
    );
    Ok((resized.width(), resized.height()))
}

/// Embed the tags into an image file in place
pub fn embed_exif(path: &Path, tags: &ExifTags) -> Result<()> {
    tags.to_metadata()
        .write_to_file(path)
        .with_context(|| format!("Failed to write EXIF tags to {}", path.display()))
}

/// Rewrite the VP8X canvas size of an extended WebP file.
///
/// Adding EXIF turns a simple WebP into the extended layout, and the canvas
/// written there must match the bitstream or decoders reject the file.
/// Simple-layout files are left alone.
fn set_webp_canvas(path: &Path, width: u32, height: u32) -> Result<()> {
    let mut bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if bytes.len() < 30 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        bail!("{} is not a WebP file", path.display());
    }
    if &bytes[12..16] != b"VP8X" {
        return Ok(());
    }

    // 24-bit little-endian width-1 and height-1 after the flags word
    bytes[24..27].copy_from_slice(&(width - 1).to_le_bytes()[..3]);
    bytes[27..30].copy_from_slice(&(height - 1).to_le_bytes()[..3]);

    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write both artifacts into `directory`
pub fn write_artifacts(
    bytes: &[u8],
    mime_type: &str,
    directory: &Path,
    bounds: Bounds,
    tags: &ExifTags,
) -> Result<Artifacts> {
    let artifacts = Artifacts {
        original: original_filename(mime_type),
        minimized: MINIMIZED_FILENAME.to_string(),
    };

    let original = directory.join(&artifacts.original);
    std::fs::write(&original, bytes)
        .with_context(|| format!("Failed to write {}", original.display()))?;
    embed_exif(&original, tags)?;
    info!("🖼️  Generated {}", artifacts.original);

    let minimized = directory.join(&artifacts.minimized);
    let (width, height) = save_minimized(bytes, &minimized, bounds)?;
    embed_exif(&minimized, tags)?;
    set_webp_canvas(&minimized, width, height)?;
    info!("🖼️  Generated {}", artifacts.minimized);

    Ok(artifacts)
}
