//! Repeat-avoidance selection
//!
//! Picks an item nobody has seen yet. Once every item in the album has been
//! shown the history is dropped and the cycle starts over.
//!
//! History lags one pick behind: the returned `previous_ids` hold the ids up
//! to and including the *prior* pick, never the new one. The next run appends
//! the new pick when it reads the metadata back.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::google_photos::MediaItem;
use crate::history::SelectionHistory;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("No candidate items to choose from")]
    NoCandidates,
}

/// Result of a selection round
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub item: &'a MediaItem,
    /// History to persist alongside the pick
    pub previous_ids: Vec<String>,
    /// Every item had been seen, so the history was dropped
    pub reset: bool,
}

/// Choose one item, avoiding everything in `history` while possible
pub fn select<'a, R: Rng + ?Sized>(
    items: &'a [MediaItem],
    history: &SelectionHistory,
    rng: &mut R,
) -> Result<Selection<'a>, SelectError> {
    if items.is_empty() {
        return Err(SelectError::NoCandidates);
    }

    let mut previous_ids = history.seen_ids();
    let seen: HashSet<&str> = previous_ids.iter().map(String::as_str).collect();
    let unseen: Vec<&MediaItem> = items
        .iter()
        .filter(|item| !seen.contains(item.id.as_str()))
        .collect();

    let reset = unseen.is_empty();
    let candidates = if reset {
        previous_ids.clear();
        items.iter().collect()
    } else {
        unseen
    };

    let item = match candidates.as_slice() {
        [only] => *only,
        many => *many.choose(rng).ok_or(SelectError::NoCandidates)?,
    };

    Ok(Selection {
        item,
        previous_ids,
        reset,
    })
}
