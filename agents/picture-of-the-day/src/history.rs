//! Selection history and the Picture of the Day metadata file
//!
//! The metadata file doubles as the history: it is read at the start of a run
//! (only `id` and `previousIds` matter) and fully rewritten at the end.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::google_photos::MediaItem;
use crate::selection::Selection;

/// Name of the metadata file inside the output directory
pub const METADATA_FILENAME: &str = "picture-of-the-day.json";

/// Previously selected identifiers
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionHistory {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub previous_ids: Vec<String>,
}

impl SelectionHistory {
    /// Read the history, treating a missing or unparseable file as empty
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No selection history, starting fresh");
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(history) => history,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable selection history");
                Self::default()
            }
        }
    }

    /// `previousIds` plus the last pick, de-duplicated, in order
    pub fn seen_ids(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::with_capacity(self.previous_ids.len() + 1);
        let last = (!self.id.is_empty()).then_some(&self.id);
        for id in self.previous_ids.iter().chain(last) {
            if !seen.contains(id) {
                seen.push(id.clone());
            }
        }
        seen
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDimensions {
    pub creation_time: String,
    pub width: String,
    pub height: String,
}

/// File names of the generated images, relative to the output directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    pub original: String,
    pub minimized: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMetadata {
    pub creation_time_date_string: String,
}

/// Everything published about the current Picture of the Day.
///
/// Deliberately verbose: only these fields ever leave the photo library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureMetadata {
    pub id: String,
    pub previous_ids: Vec<String>,
    pub description: String,
    pub mime_type: String,
    pub media_metadata: MetadataDimensions,
    pub artifacts: Artifacts,
    pub parsed_metadata: ParsedMetadata,
}

impl PictureMetadata {
    pub fn from_selection(selection: &Selection<'_>, artifacts: Artifacts) -> Self {
        let item: &MediaItem = selection.item;
        let creation_time = item.creation_time().unwrap_or_default();

        Self {
            id: item.id.clone(),
            previous_ids: selection.previous_ids.clone(),
            description: item.description_or_default().to_string(),
            mime_type: item.mime_type().to_string(),
            media_metadata: MetadataDimensions {
                creation_time: creation_time.to_string(),
                width: item.width().to_string(),
                height: item.height().to_string(),
            },
            artifacts,
            parsed_metadata: ParsedMetadata {
                creation_time_date_string: date_string(creation_time),
            },
        }
    }

    /// Rewrite the metadata file as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write metadata file {}", path.display()))
    }
}

/// `2021-06-12T18:30:00Z` -> `Sat Jun 12 2021`; empty when unparseable
pub fn date_string(creation_time: &str) -> String {
    DateTime::parse_from_rfc3339(creation_time)
        .map(|t| t.with_timezone(&Utc).format("%a %b %d %Y").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = SelectionHistory::load(&dir.path().join(METADATA_FILENAME));
        assert!(history.id.is_empty());
        assert!(history.seen_ids().is_empty());
    }

    #[test]
    fn test_garbage_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METADATA_FILENAME);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(SelectionHistory::load(&path).seen_ids().is_empty());
    }

    #[test]
    fn test_history_reads_full_metadata_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METADATA_FILENAME);
        std::fs::write(
            &path,
            r#"{
                "id": "c",
                "previousIds": ["a", "b", "a"],
                "description": "Picture of the Day",
                "artifacts": {"original": "x.jpg", "minimized": "x.webp"}
            }"#,
        )
        .unwrap();

        let history = SelectionHistory::load(&path);
        assert_eq!(history.id, "c");
        assert_eq!(history.seen_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_last_pick_already_in_previous_ids() {
        let history = SelectionHistory {
            id: "a".to_string(),
            previous_ids: vec!["a".to_string()],
        };
        assert_eq!(history.seen_ids(), vec!["a"]);
    }

    #[test]
    fn test_date_string() {
        assert_eq!(date_string("2021-06-12T18:30:00Z"), "Sat Jun 12 2021");
        assert_eq!(date_string("2026-10-08T00:00:00Z"), "Thu Oct 08 2026");
        assert_eq!(date_string(""), "");
        assert_eq!(date_string("yesterday"), "");
    }

    #[test]
    fn test_metadata_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METADATA_FILENAME);
        let metadata = PictureMetadata {
            id: "b".to_string(),
            previous_ids: vec!["a".to_string()],
            description: "Picture of the Day".to_string(),
            mime_type: "image/jpeg".to_string(),
            media_metadata: MetadataDimensions {
                creation_time: "2021-06-12T18:30:00Z".to_string(),
                width: "4032".to_string(),
                height: "3024".to_string(),
            },
            artifacts: Artifacts {
                original: "picture-of-the-day-original.jpg".to_string(),
                minimized: "picture-of-the-day-minimized.webp".to_string(),
            },
            parsed_metadata: ParsedMetadata {
                creation_time_date_string: "Sat Jun 12 2021".to_string(),
            },
        };
        metadata.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["previousIds"][0], "a");
        assert_eq!(value["mimeType"], "image/jpeg");
        assert_eq!(value["mediaMetadata"]["creationTime"], "2021-06-12T18:30:00Z");
        assert_eq!(value["parsedMetadata"]["creationTimeDateString"], "Sat Jun 12 2021");

        let history = SelectionHistory::load(&path);
        assert_eq!(history.seen_ids(), vec!["a", "b"]);
    }
}
