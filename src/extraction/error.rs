use std::sync::Arc;
use thiserror::Error;

/// A single network call failing. Always handled at the call site: it ends the
/// strategy that issued it, never its siblings.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered with status {0}")]
    Status(u16),

    #[error("Server ignored a range request starting at byte {0}")]
    RangeIgnored(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid byte range {start}-{end}")]
    InvalidRange { start: u64, end: u64 },
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Fetching media bytes failed: {0}")]
    Fetch(#[from] FetchError),

    /// The shared head download failed; every strategy reading it sees the same error.
    #[error("Fetching media head failed: {0}")]
    HeadFetch(Arc<FetchError>),

    #[error("Exiftool failed to execute or process the file")]
    Exiftool(#[from] exiftool::ExifToolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata worker stopped: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
