//! Picture of the Day run
//!
//! album lookup -> media search -> selection -> download -> artifacts -> metadata

use anyhow::{Context, Result};
use rand::Rng;
use tracing::{info, warn};

use crate::artifacts::{write_artifacts, ExifTags};
use crate::config::PictureConfig;
use crate::google_photos::{find_album, MediaItem, PhotoLibrary};
use crate::history::{PictureMetadata, SelectionHistory};
use crate::selection::select;

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Published(Box<PictureMetadata>),
    /// Nothing to do; not an error
    AlbumNotFound,
}

pub async fn run<L, R>(library: &L, config: &PictureConfig, rng: &mut R) -> Result<RunOutcome>
where
    L: PhotoLibrary + ?Sized,
    R: Rng + ?Sized,
{
    let albums = library.list_albums().await.context("Failed to list albums")?;
    let Some(album) = find_album(&albums, &config.album) else {
        warn!("Album with title '{}' not found.", config.album);
        return Ok(RunOutcome::AlbumNotFound);
    };
    info!(album = %config.album, id = %album.id, "📁 Found album");

    let items = library
        .search_media_items(&album.id)
        .await
        .with_context(|| format!("Failed to list media items of '{}'", config.album))?;
    let total = items.len();
    let images: Vec<MediaItem> = items.into_iter().filter(MediaItem::is_image).collect();
    if images.len() < total {
        info!(skipped = total - images.len(), "Skipping non-image media items");
    }
    if images.len() == 1 {
        info!("Only a single media item available. There goes your randomness :')");
    }

    let metadata_path = config.metadata_path();
    let history = SelectionHistory::load(&metadata_path);
    let selection = select(&images, &history, rng)
        .with_context(|| format!("Could not get any pictures from the '{}' album", config.album))?;
    if selection.reset {
        info!(pool = images.len(), "🔁 Every picture has been shown, starting a new cycle");
    }
    info!(id = %selection.item.id, "🎲 Selected Picture of the Day");

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let bytes = library
        .download(selection.item)
        .await
        .context("Failed to download the Picture of the Day")?;

    let tags = ExifTags {
        artist: config.artist.clone(),
        copyright: config.copyright.clone(),
        create_date: selection.item.creation_time().map(str::to_string),
        description: selection.item.description_or_default().to_string(),
        software: format!("picture-of-the-day/{}", env!("CARGO_PKG_VERSION")),
    };

    info!("💾 Saving files to '{}'", config.output_dir.display());
    let artifacts = write_artifacts(
        &bytes,
        selection.item.mime_type(),
        &config.output_dir,
        config.bounds,
        &tags,
    )?;

    let metadata = PictureMetadata::from_selection(&selection, artifacts);
    metadata.write(&metadata_path)?;
    info!("📝 Generated metadata file {}", metadata_path.display());

    Ok(RunOutcome::Published(Box::new(metadata)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_photos::{Album, MediaMetadata, OAuthCredentials, PhotosError};
    use crate::history::METADATA_FILENAME;
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;
    use std::path::Path;

    struct FakeLibrary {
        albums: Vec<Album>,
        items: Vec<MediaItem>,
    }

    #[async_trait]
    impl PhotoLibrary for FakeLibrary {
        async fn list_albums(&self) -> Result<Vec<Album>, PhotosError> {
            Ok(self.albums.clone())
        }

        async fn search_media_items(&self, _album_id: &str) -> Result<Vec<MediaItem>, PhotosError> {
            Ok(self.items.clone())
        }

        async fn download(&self, _item: &MediaItem) -> Result<Vec<u8>, PhotosError> {
            let image = RgbImage::from_pixel(1200, 900, Rgb([30, 90, 160]));
            let mut bytes = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(image)
                .write_to(&mut bytes, ImageFormat::Jpeg)
                .unwrap();
            Ok(bytes.into_inner())
        }
    }

    fn album(title: &str) -> Album {
        Album {
            id: format!("album-{}", title.len()),
            title: Some(title.to_string()),
            media_items_count: None,
        }
    }

    fn photo(id: &str, mime_type: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            description: None,
            mime_type: Some(mime_type.to_string()),
            base_url: Some(format!("https://example.invalid/{}", id)),
            media_metadata: Some(MediaMetadata {
                creation_time: Some("2021-06-12T18:30:00Z".to_string()),
                width: Some("1200".to_string()),
                height: Some("900".to_string()),
                ..Default::default()
            }),
        }
    }

    fn config(dir: &Path) -> PictureConfig {
        let mut config = PictureConfig::new(OAuthCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
        });
        config.output_dir = dir.join("site");
        config
    }

    #[tokio::test]
    async fn test_missing_album_is_a_soft_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let library = FakeLibrary {
            albums: vec![album("Holiday")],
            items: vec![photo("a", "image/jpeg")],
        };
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = run(&library, &config(dir.path()), &mut rng).await.unwrap();

        assert_eq!(outcome, RunOutcome::AlbumNotFound);
        assert!(!dir.path().join("site").exists());
    }

    #[tokio::test]
    async fn test_empty_album_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let library = FakeLibrary {
            albums: vec![album("Picture of the Day")],
            items: vec![photo("clip", "video/mp4")],
        };
        let mut rng = StdRng::seed_from_u64(1);

        let err = run(&library, &config(dir.path()), &mut rng).await.unwrap_err();
        assert!(err.to_string().contains("Could not get any pictures"));
    }

    #[tokio::test]
    async fn test_publishes_unseen_picture() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir_all(&config.output_dir).unwrap();
        std::fs::write(
            config.output_dir.join(METADATA_FILENAME),
            r#"{"id": "a", "previousIds": []}"#,
        )
        .unwrap();

        let library = FakeLibrary {
            albums: vec![album("Holiday"), album("Picture of the Day")],
            items: vec![photo("a", "image/jpeg"), photo("b", "image/jpeg"), photo("v", "video/mp4")],
        };
        let mut rng = StdRng::seed_from_u64(5);

        let RunOutcome::Published(metadata) = run(&library, &config, &mut rng).await.unwrap() else {
            panic!("expected a published picture");
        };

        assert_eq!(metadata.id, "b");
        assert_eq!(metadata.previous_ids, vec!["a"]);
        assert_eq!(metadata.description, "Picture of the Day");
        assert_eq!(metadata.parsed_metadata.creation_time_date_string, "Sat Jun 12 2021");
        assert_eq!(metadata.artifacts.original, "picture-of-the-day-original.jpg");

        let minimized = image::open(config.output_dir.join(&metadata.artifacts.minimized)).unwrap();
        assert_eq!((minimized.width(), minimized.height()), (800, 600));
        assert!(config.output_dir.join(&metadata.artifacts.original).exists());

        let written = SelectionHistory::load(&config.metadata_path());
        assert_eq!(written.seen_ids(), vec!["a", "b"]);
    }
}
