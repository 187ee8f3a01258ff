use super::error::CloudError;
use super::{FileDetail, FileDetailSource};
use crate::structs::{MediaKind, PlaylistItem};
use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://pan.baidu.com/rest/2.0/xpan";
/// Download links are only honoured for this client identifier.
pub const PAN_USER_AGENT: &str = "pan.baidu.com";
const LIST_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    errno: i64,
    #[serde(default)]
    errmsg: Option<String>,
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MetaEntry {
    fs_id: u64,
    #[serde(default)]
    dlink: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    fs_id: u64,
    path: String,
    server_filename: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    isdir: u8,
}

/// Minimal REST client for the cloud drive's file listing and file detail endpoints.
pub struct PanClient {
    client: Client,
    base_url: String,
}

#[bon]
impl PanClient {
    #[builder]
    pub fn new(
        #[builder(into, default = DEFAULT_BASE_URL.to_string())] base_url: String,
        #[builder(default = Duration::from_secs(15))] timeout: Duration,
    ) -> Result<Self, CloudError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(PAN_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, CloudError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {} with {} params", url, params.len());

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if envelope.errno != 0 {
            return Err(CloudError::Api {
                errno: envelope.errno,
                message: envelope.errmsg.unwrap_or_default(),
            });
        }
        Ok(envelope.list)
    }

    /// Lists the playable files directly inside `dir`, in name order.
    pub async fn list_directory(
        &self,
        access_token: &str,
        dir: &str,
    ) -> Result<Vec<PlaylistItem>, CloudError> {
        let limit = LIST_PAGE_SIZE.to_string();
        let mut items = Vec::new();
        let mut start = 0usize;
        loop {
            let start_param = start.to_string();
            let page: Vec<ListEntry> = self
                .get(
                    "/file",
                    &[
                        ("method", "list"),
                        ("access_token", access_token),
                        ("dir", dir),
                        ("order", "name"),
                        ("start", &start_param),
                        ("limit", &limit),
                    ],
                )
                .await?;
            let page_len = page.len();
            items.extend(page.into_iter().filter(|entry| entry.isdir == 0).filter_map(
                |entry| {
                    let kind = MediaKind::from_file_name(&entry.server_filename)?;
                    let mut item = PlaylistItem::new(entry.fs_id.to_string(), entry.path, kind)
                        .with_size(entry.size);
                    item.name = entry.server_filename;
                    Some(item)
                },
            ));
            if page_len < LIST_PAGE_SIZE {
                break;
            }
            start += page_len;
        }
        debug!("Listed {} playable files in {}", items.len(), dir);
        Ok(items)
    }
}

#[async_trait]
impl FileDetailSource for PanClient {
    async fn fetch_file_detail(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> Result<FileDetail, CloudError> {
        let fsids = format!("[{file_id}]");
        let entries: Vec<MetaEntry> = self
            .get(
                "/multimedia",
                &[
                    ("method", "filemetas"),
                    ("access_token", access_token),
                    ("fsids", &fsids),
                    ("dlink", "1"),
                ],
            )
            .await?;
        let entry = entries
            .into_iter()
            .find(|entry| entry.fs_id.to_string() == file_id)
            .ok_or_else(|| CloudError::NotFound(file_id.to_string()))?;
        Ok(FileDetail {
            file_id: entry.fs_id.to_string(),
            download_url: entry.dlink,
            size: entry.size,
            path: entry.path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> PanClient {
        PanClient::builder().base_url(server.url()).build().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_file_detail_returns_dlink() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/multimedia")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("method".into(), "filemetas".into()),
                Matcher::UrlEncoded("fsids".into(), "[42]".into()),
                Matcher::UrlEncoded("dlink".into(), "1".into()),
                Matcher::UrlEncoded("access_token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"errno":0,"list":[{"fs_id":42,"path":"/a.mp4","size":1024,
                    "dlink":"https://d.example.com/file/abc?fid=42"}]}"#,
            )
            .create_async()
            .await;

        let detail = client(&server).fetch_file_detail("tok", "42").await.unwrap();
        mock.assert_async().await;
        assert_eq!(detail.file_id, "42");
        assert_eq!(
            detail.download_url.as_deref(),
            Some("https://d.example.com/file/abc?fid=42")
        );
        assert_eq!(detail.size, Some(1024));
    }

    #[tokio::test]
    async fn test_api_errno_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/multimedia")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"errno":-6,"errmsg":"invalid token"}"#)
            .create_async()
            .await;

        let error = client(&server).fetch_file_detail("bad", "42").await.unwrap_err();
        assert!(matches!(error, CloudError::Api { errno: -6, .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/multimedia")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"errno":0,"list":[]}"#)
            .create_async()
            .await;

        let error = client(&server).fetch_file_detail("tok", "7").await.unwrap_err();
        assert!(matches!(error, CloudError::NotFound(id) if id == "7"));
    }

    #[tokio::test]
    async fn test_http_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/multimedia")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let error = client(&server).fetch_file_detail("tok", "1").await.unwrap_err();
        assert!(matches!(error, CloudError::Http(_)));
    }

    #[tokio::test]
    async fn test_list_directory_keeps_only_media_files() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file")
            .match_query(Matcher::UrlEncoded("dir".into(), "/trip".into()))
            .with_status(200)
            .with_body(
                r#"{"errno":0,"list":[
                    {"fs_id":1,"path":"/trip/a.jpg","server_filename":"a.jpg","size":10,"isdir":0},
                    {"fs_id":2,"path":"/trip/sub","server_filename":"sub","size":0,"isdir":1},
                    {"fs_id":3,"path":"/trip/b.MOV","server_filename":"b.MOV","size":20,"isdir":0},
                    {"fs_id":4,"path":"/trip/readme.txt","server_filename":"readme.txt","size":1,"isdir":0}
                ]}"#,
            )
            .create_async()
            .await;

        let items = client(&server).list_directory("tok", "/trip").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "1");
        assert_eq!(items[0].kind, MediaKind::Image);
        assert_eq!(items[1].name, "b.MOV");
        assert_eq!(items[1].kind, MediaKind::Video);
        assert_eq!(items[1].size, 20);
    }
}
