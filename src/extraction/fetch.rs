use super::error::FetchError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;
use url::Url;

/// Extra request headers, e.g. the User-Agent a download link is bound to.
pub type RequestHeaders = Vec<(String, String)>;

/// Partial-content access to a remote (or local `file://`) resource.
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    /// Returns at most `end_inclusive - start + 1` bytes beginning at `start`.
    ///
    /// A server that ignores the range header is tolerated when `start` is 0 (the body is
    /// cut at the requested length); for any other start it is a
    /// [`FetchError::RangeIgnored`].
    async fn fetch_range(
        &self,
        url: &str,
        start: u64,
        end_inclusive: u64,
        headers: &[(String, String)],
    ) -> Result<Vec<u8>, FetchError>;

    /// Total size of the resource, if the server reports one.
    async fn content_length(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Option<u64>, FetchError>;
}

pub fn is_network_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn local_path(url: &str) -> Option<PathBuf> {
    let url = Url::parse(url).ok()?;
    (url.scheme() == "file").then(|| url.to_file_path().ok())?
}

/// [`ByteFetcher`] over reqwest, serving `file://` URLs from disk.
#[derive(Clone)]
pub struct HttpByteFetcher {
    client: Client,
}

impl HttpByteFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn with_headers(mut request: RequestBuilder, headers: &[(String, String)]) -> RequestBuilder {
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::with_capacity(limit.min(4 * 1024 * 1024));
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() >= limit {
                break;
            }
        }
        body.truncate(limit);
        Ok(body)
    }

    async fn read_local_range(
        path: PathBuf,
        start: u64,
        length: u64,
    ) -> Result<Vec<u8>, FetchError> {
        let mut file = tokio::fs::File::open(&path).await?;
        file.seek(SeekFrom::Start(start)).await?;
        let mut body = Vec::new();
        file.take(length).read_to_end(&mut body).await?;
        Ok(body)
    }
}

/// Parses the total from a `Content-Range: bytes 0-0/12345` header.
fn total_from_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl ByteFetcher for HttpByteFetcher {
    async fn fetch_range(
        &self,
        url: &str,
        start: u64,
        end_inclusive: u64,
        headers: &[(String, String)],
    ) -> Result<Vec<u8>, FetchError> {
        if end_inclusive < start {
            return Err(FetchError::InvalidRange {
                start,
                end: end_inclusive,
            });
        }
        let length = end_inclusive - start + 1;
        if let Some(path) = local_path(url) {
            return Self::read_local_range(path, start, length).await;
        }

        let request = self
            .client
            .get(url)
            .header(RANGE, format!("bytes={start}-{end_inclusive}"));
        let response = Self::with_headers(request, headers).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if status != StatusCode::PARTIAL_CONTENT {
            if start > 0 {
                return Err(FetchError::RangeIgnored(start));
            }
            debug!("Range ignored by server, reading the first {} bytes", length);
        }
        let limit = usize::try_from(length).unwrap_or(usize::MAX);
        Self::read_capped(response, limit).await
    }

    async fn content_length(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Option<u64>, FetchError> {
        if let Some(path) = local_path(url) {
            return Ok(Some(tokio::fs::metadata(path).await?.len()));
        }

        let response = Self::with_headers(self.client.head(url), headers)
            .send()
            .await?;
        if response.status().is_success() {
            let length = response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|&length| length > 0);
            if length.is_some() {
                return Ok(length);
            }
        }

        // Some download hosts reject HEAD; a one-byte range reveals the size instead.
        let request = self.client.get(url).header(RANGE, "bytes=0-0");
        let response = Self::with_headers(request, headers).send().await?;
        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Ok(None);
        }
        Ok(response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(total_from_content_range))
    }
}
