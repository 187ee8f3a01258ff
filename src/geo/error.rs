use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoding service answered with an error: {0}")]
    Api(String),

    #[error("Could not parse geocoding response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider {0} is not available")]
    Unavailable(String),
}
