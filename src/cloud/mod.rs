//! The cloud drive as consumed by the resolution cache.
pub mod error;
mod pan;

use async_trait::async_trait;
use error::CloudError;
pub use pan::{PAN_USER_AGENT, PanClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileDetail {
    pub file_id: String,
    /// Time-limited direct download link.
    pub download_url: Option<String>,
    pub size: Option<u64>,
    pub path: Option<String>,
}

#[async_trait]
pub trait FileDetailSource: Send + Sync {
    async fn fetch_file_detail(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> Result<FileDetail, CloudError>;
}
