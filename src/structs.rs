use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    const IMAGE_EXTENSIONS: [&'static str; 10] = [
        "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif", "tif", "tiff",
    ];
    const VIDEO_EXTENSIONS: [&'static str; 10] = [
        "mp4", "mov", "m4v", "mkv", "avi", "wmv", "flv", "webm", "3gp", "ts",
    ];

    /// Classifies a file name by its extension. Returns `None` for anything that is not
    /// a playable image or video.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        let extension = extension.to_ascii_lowercase();
        if Self::IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Image)
        } else if Self::VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn is_video(self) -> bool {
        self == Self::Video
    }
}

/// One entry of a playback list. Immutable once placed in a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    /// Opaque file id in the cloud drive.
    pub id: String,
    pub path: String,
    pub name: String,
    pub size: u64,
    pub kind: MediaKind,
    /// A playable URL learned earlier (for example from a saved playlist), if any.
    pub known_url: Option<String>,
}

impl PlaylistItem {
    pub fn new(id: impl Into<String>, path: impl Into<String>, kind: MediaKind) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id: id.into(),
            path,
            name,
            size: 0,
            kind,
            known_url: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_known_url(mut self, url: impl Into<String>) -> Self {
        self.known_url = Some(url.into());
        self
    }
}

/// A playable link obtained for a playlist item.
///
/// `url` never carries the access token: the token is attached at hand-off time so a
/// rotated token is always the one that reaches the player.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    pub item_id: String,
    pub url: String,
    pub resolved_at: DateTime<Utc>,
}

/// A WGS-84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Rejects out-of-range values and the (0, 0) placeholder many encoders write when
    /// no fix was available.
    pub fn is_plausible(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}
