//! Google Photos Library API Client
//!
//! Minimal read-only wrapper around the Photos Library REST API: refresh-token
//! exchange, album listing, album media search and media download.
//! Pages are followed one after another and concatenated in page order.

use std::future::Future;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const PHOTOS_API: &str = "https://photoslibrary.googleapis.com/v1";
const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const PAGE_SIZE: u32 = 50;

/// Fallback used wherever an item carries no description.
pub const DEFAULT_DESCRIPTION: &str = "Picture of the Day";

// ============================================================
// API Types
// ============================================================

/// An album as returned by `albums.list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: Option<String>,
    pub media_items_count: Option<String>,
}

/// A media item as returned by `mediaItems.search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub base_url: Option<String>,
    pub media_metadata: Option<MediaMetadata>,
}

/// Photos reports dimensions as decimal strings; they are kept verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub creation_time: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub photo: Option<serde_json::Value>,
    pub video: Option<serde_json::Value>,
}

impl MediaItem {
    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
    }

    pub fn mime_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or_default()
    }

    pub fn creation_time(&self) -> Option<&str> {
        self.media_metadata
            .as_ref()
            .and_then(|m| m.creation_time.as_deref())
            .filter(|t| !t.is_empty())
    }

    pub fn width(&self) -> &str {
        self.media_metadata
            .as_ref()
            .and_then(|m| m.width.as_deref())
            .unwrap_or_default()
    }

    pub fn height(&self) -> &str {
        self.media_metadata
            .as_ref()
            .and_then(|m| m.height.as_deref())
            .unwrap_or_default()
    }

    /// Whether the item is a still image (videos cannot be resized)
    pub fn is_image(&self) -> bool {
        self.mime_type().starts_with("image/")
    }

    /// Full-resolution download URL: `{baseUrl}=w{width}-h{height}`
    pub fn download_url(&self) -> Option<String> {
        let base_url = self.base_url.as_deref().filter(|u| !u.is_empty())?;
        Some(format!("{}=w{}-h{}", base_url, self.width(), self.height()))
    }
}

/// Find an album by exact title
pub fn find_album<'a>(albums: &'a [Album], title: &str) -> Option<&'a Album> {
    albums.iter().find(|album| album.title.as_deref() == Some(title))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumsPage {
    #[serde(default)]
    albums: Vec<Album>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaItemsPage {
    #[serde(default)]
    media_items: Vec<MediaItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    album_id: &'a str,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// OAuth2 client credentials plus a long-lived refresh token
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Errors from the Photos Library API or the OAuth token endpoint
#[derive(Debug, Error)]
pub enum PhotosError {
    #[error("Google API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media item {0} has no download URL")]
    MissingBaseUrl(String),
}

/// Read-only view of a photo library
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// All albums, every page concatenated in order
    async fn list_albums(&self) -> Result<Vec<Album>, PhotosError>;

    /// All media items in an album, every page concatenated in order
    async fn search_media_items(&self, album_id: &str) -> Result<Vec<MediaItem>, PhotosError>;

    /// Raw bytes of the full-resolution image
    async fn download(&self, item: &MediaItem) -> Result<Vec<u8>, PhotosError>;
}

// ============================================================
// Client Implementation
// ============================================================

/// Google Photos client holding a short-lived access token
pub struct GooglePhotosClient {
    client: Client,
    access_token: String,
}

impl GooglePhotosClient {
    /// Exchange the refresh token for an access token
    pub async fn authenticate(credentials: &OAuthCredentials) -> Result<Self, PhotosError> {
        let client = Client::builder()
            .user_agent(concat!("picture-of-the-day/", env!("CARGO_PKG_VERSION")))
            .build()?;

        debug!(client_id = %credentials.client_id, "Refreshing Google access token");

        let response = client
            .post(OAUTH_TOKEN_URL)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let token: TokenResponse = ensure_success(response).await?.json().await?;
        debug!(expires_in = ?token.expires_in, "Access token refreshed");

        Ok(Self {
            client,
            access_token: token.access_token,
        })
    }
}

impl GooglePhotosClient {
    async fn albums_page(
        &self,
        page_token: Option<String>,
    ) -> Result<(Vec<Album>, Option<String>), PhotosError> {
        let mut request = self
            .client
            .get(format!("{}/albums", PHOTOS_API))
            .bearer_auth(&self.access_token)
            .query(&[("pageSize", PAGE_SIZE.to_string())]);
        if let Some(token) = &page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let page: AlbumsPage = ensure_success(request.send().await?).await?.json().await?;
        debug!(count = page.albums.len(), "Fetched album page");
        Ok((page.albums, page.next_page_token))
    }

    async fn media_items_page(
        &self,
        album_id: &str,
        page_token: Option<String>,
    ) -> Result<(Vec<MediaItem>, Option<String>), PhotosError> {
        let request = SearchRequest {
            album_id,
            page_size: PAGE_SIZE,
            page_token: page_token.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/mediaItems:search", PHOTOS_API))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let page: MediaItemsPage = ensure_success(response).await?.json().await?;
        debug!(album_id, count = page.media_items.len(), "Fetched media item page");
        Ok((page.media_items, page.next_page_token))
    }
}

#[async_trait]
impl PhotoLibrary for GooglePhotosClient {
    async fn list_albums(&self) -> Result<Vec<Album>, PhotosError> {
        collect_pages(|token| self.albums_page(token)).await
    }

    async fn search_media_items(&self, album_id: &str) -> Result<Vec<MediaItem>, PhotosError> {
        collect_pages(|token| self.media_items_page(album_id, token)).await
    }

    async fn download(&self, item: &MediaItem) -> Result<Vec<u8>, PhotosError> {
        let url = item
            .download_url()
            .ok_or_else(|| PhotosError::MissingBaseUrl(item.id.clone()))?;

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let bytes = ensure_success(response).await?.bytes().await?;
        debug!(id = %item.id, bytes = bytes.len(), "Downloaded media item");
        Ok(bytes.to_vec())
    }
}

/// Follow `nextPageToken` until it is absent or empty.
///
/// `fetch_page` gets the token of the page to fetch (`None` for the first)
/// and returns that page's items with the next token. Pages are concatenated
/// in the order they were fetched.
pub async fn collect_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, PhotosError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>), PhotosError>>,
{
    let mut items = Vec::new();
    let mut page_token = None;

    loop {
        let (page, next) = fetch_page(page_token.take()).await?;
        items.extend(page);

        match next {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(items)
}

async fn ensure_success(response: Response) -> Result<Response, PhotosError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PhotosError::Api { status, body })
}
