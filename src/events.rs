use crate::sequencer::PlayMode;
use crate::structs::PlaylistItem;
use serde::Serialize;

/// Notifications published by a [`crate::session::PlaybackSession`].
///
/// Every item-specific event carries the `index` it was produced for; consumers compare it
/// with the session's current index when they need to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    CurrentItemChanged { index: usize, item: PlaylistItem },
    /// A playable link, token attached, plus the headers the player must send with it.
    UrlReady {
        index: usize,
        url: String,
        headers: Vec<(String, String)>,
    },
    /// Resolution failed. The presentation layer decides whether to skip ahead.
    UrlFailed { index: usize, error: String },
    LocationReady { index: usize, label: String },
    LocationUnavailable { index: usize },
    PlayModeChanged { mode: PlayMode },
}
