use super::error::ExtractionError;
use super::patterns::parse_location_field;
use crate::structs::Coordinate;
use async_trait::async_trait;
use exiftool::ExifTool;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Tags a video container may keep its ISO 6709 location string in, most common first.
const LOCATION_FIELDS: [&str; 4] = [
    "GPSCoordinates",
    "LocationISO6709",
    "Location",
    "LocationInformation",
];

/// Structured metadata access to the head of a media file.
///
/// `head` holds the first bytes of the resource at `url`; the pipeline downloads it once and
/// shares it with its own pattern scan.
#[async_trait]
pub trait MetadataReader: Send + Sync {
    /// The container's standard location field, verbatim.
    async fn location_field(&self, url: &str, head: &[u8]) -> Result<Option<String>, ExtractionError>;

    /// The image's Exif GPS position.
    async fn image_gps(&self, url: &str, head: &[u8]) -> Result<Option<Coordinate>, ExtractionError>;
}

/// Reads the Exif GPS pair from exiftool's numeric (`-n`) JSON output.
pub fn get_gps_info(numeric_exif: &Value) -> Option<Coordinate> {
    let (Some(latitude), Some(longitude)) = (
        numeric_exif.get("GPSLatitude").and_then(Value::as_f64),
        numeric_exif.get("GPSLongitude").and_then(Value::as_f64),
    ) else {
        return None;
    };
    let coordinate = Coordinate::new(latitude, longitude);
    coordinate.is_plausible().then_some(coordinate)
}

/// Finds the first location tag and parses it, as exiftool renders QuickTime and
/// Matroska locations either as ISO 6709 or as `lat lon alt`.
pub fn get_location_field(numeric_exif: &Value) -> Option<String> {
    LOCATION_FIELDS.iter().find_map(|field| {
        let value = numeric_exif.get(field)?;
        value
            .as_str()
            .map(str::to_string)
            .filter(|text| parse_location_field(text).is_some())
    })
}

/// [`MetadataReader`] that runs exiftool over the downloaded head of the file.
///
/// Exif blocks and fast-start MP4 `moov` atoms live in the first few MiB.
pub struct ExiftoolReader {
    exiftool: Arc<Mutex<ExifTool>>,
}

impl ExiftoolReader {
    /// Starts exiftool from `PATH`, or from `exiftool_path` when given.
    pub fn new(exiftool_path: Option<PathBuf>) -> Result<Self, ExtractionError> {
        let exiftool = match exiftool_path {
            Some(path) => ExifTool::with_executable(&path)?,
            None => ExifTool::new()?,
        };
        Ok(Self {
            exiftool: Arc::new(Mutex::new(exiftool)),
        })
    }

    async fn numeric_exif(&self, url: &str, head: &[u8]) -> Result<Value, ExtractionError> {
        let bytes = head.to_vec();
        let suffix = file_suffix(url);
        let exiftool = self.exiftool.clone();
        debug!(bytes = bytes.len(), "Running exiftool over file head");

        // exiftool talks to a child process over pipes; keep it off the async workers.
        tokio::task::spawn_blocking(move || -> Result<Value, ExtractionError> {
            let mut file = tempfile::Builder::new()
                .prefix("media-navigator-")
                .suffix(&suffix)
                .tempfile()?;
            file.write_all(&bytes)?;
            file.flush()?;
            let mut exiftool = exiftool.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(exiftool.json(file.path(), &["-n"])?)
        })
        .await?
    }
}

fn file_suffix(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|url| {
            let name = url.path_segments()?.next_back()?.to_string();
            let (_, extension) = name.rsplit_once('.')?;
            (!extension.is_empty() && extension.len() <= 5).then(|| format!(".{extension}"))
        })
        .unwrap_or_else(|| ".bin".to_string())
}

#[async_trait]
impl MetadataReader for ExiftoolReader {
    async fn location_field(&self, url: &str, head: &[u8]) -> Result<Option<String>, ExtractionError> {
        let exif = self.numeric_exif(url, head).await?;
        Ok(get_location_field(&exif))
    }

    async fn image_gps(&self, url: &str, head: &[u8]) -> Result<Option<Coordinate>, ExtractionError> {
        let exif = self.numeric_exif(url, head).await?;
        Ok(get_gps_info(&exif))
    }
}
