use crate::cloud::error::CloudError;
use std::time::Duration;
use thiserror::Error;

/// Raised when no playable link could be produced for a playlist item.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("File detail request failed: {0}")]
    Capability(#[from] CloudError),

    #[error("File detail for {0} carried no usable download link")]
    UnusableUrl(String),

    #[error("File detail request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed playable URL: {0}")]
    MalformedUrl(#[from] url::ParseError),

    #[error("The playlist is empty")]
    EmptyPlaylist,
}
