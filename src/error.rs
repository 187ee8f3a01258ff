use thiserror::Error;

/// The primary error type for the media-navigator crate.
#[derive(Error, Debug)]
pub enum MediaNavigatorError {
    #[error("Sequencer rejected the request: {0}")]
    Sequencer(#[from] crate::sequencer::error::SequencerError),

    #[error("Link resolution failed: {0}")]
    Resolution(#[from] crate::resolution::error::ResolutionError),

    #[error("Cloud drive request failed: {0}")]
    Cloud(#[from] crate::cloud::error::CloudError),

    // --- Extraction & Geocoding ---
    #[error("Byte range fetch failed: {0}")]
    Fetch(#[from] crate::extraction::error::FetchError),

    #[error("Metadata extraction failed: {0}")]
    Extraction(#[from] crate::extraction::error::ExtractionError),

    #[error("Geocoding failed: {0}")]
    Geo(#[from] crate::geo::GeoError),

    #[error("Settings could not be read or written: {0}")]
    Settings(#[from] crate::settings::SettingsError),

    // --- Session Setup ---
    #[error("No Tokio runtime is available for background work")]
    NoRuntime,

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Logging initialisation failed: {0}")]
    Logging(String),
}
