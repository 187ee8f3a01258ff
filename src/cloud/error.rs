use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Cloud API error (errno {errno}): {message}")]
    Api { errno: i64, message: String },

    #[error("File {0} not found")]
    NotFound(String),
}
