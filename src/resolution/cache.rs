use super::error::ResolutionError;
use super::slot::PrefetchSlot;
use super::token::{DEFAULT_TOKEN_PARAM, has_playable_scheme, strip_access_token, with_access_token};
use crate::cloud::FileDetailSource;
use crate::structs::{PlaylistItem, ResolvedMedia};
use bon::bon;
use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Background work started by [`ResolutionCache::prefetch`]; spawn it on any runtime.
pub type PrefetchTask = BoxFuture<'static, ()>;

/// Turns playlist items into ready-to-play links and keeps the predicted next link warm.
#[derive(Clone)]
pub struct ResolutionCache {
    source: Arc<dyn FileDetailSource>,
    slot: Arc<PrefetchSlot>,
    resolve_timeout: Duration,
    prefetch_ttl: Duration,
    token_param: String,
}

#[bon]
impl ResolutionCache {
    /// # Builder Arguments
    ///
    /// * `source` - The cloud drive's file-detail capability.
    /// * `slot` - Prefetch slot shared with the [`crate::sequencer::Sequencer`]. A private one is created when omitted.
    /// * `resolve_timeout` - (Default: 15 s) Budget for one file-detail call.
    /// * `prefetch_ttl` - (Default: 30 min) Prefetched links older than this are re-resolved.
    /// * `token_param` - (Default: `access_token`) Query parameter carrying the bearer token.
    #[builder]
    pub fn new(
        source: Arc<dyn FileDetailSource>,
        slot: Option<Arc<PrefetchSlot>>,
        #[builder(default = Duration::from_secs(15))] resolve_timeout: Duration,
        #[builder(default = Duration::from_secs(30 * 60))] prefetch_ttl: Duration,
        #[builder(into, default = DEFAULT_TOKEN_PARAM.to_string())] token_param: String,
    ) -> Self {
        Self {
            source,
            slot: slot.unwrap_or_default(),
            resolve_timeout,
            prefetch_ttl,
            token_param,
        }
    }

    pub fn slot(&self) -> &Arc<PrefetchSlot> {
        &self.slot
    }

    /// Produces a playable link for `item`, which sits at `index` in the active playlist.
    ///
    /// Order of preference: a fresh prefetched link for this index, the link the item
    /// already carries, then a file-detail call. The returned link always carries `token`.
    pub async fn resolve(
        &self,
        index: usize,
        item: &PlaylistItem,
        token: &str,
    ) -> Result<String, ResolutionError> {
        if let Some(media) = self.slot.claim(index, &item.id, self.prefetch_ttl) {
            info!(index, item = %item.name, "Prefetched link used");
            return with_access_token(&media.url, token, &self.token_param);
        }

        if let Some(known) = item.known_url.as_deref().filter(|url| has_playable_scheme(url)) {
            debug!(index, item = %item.name, "Using link carried by the playlist item");
            return with_access_token(known, token, &self.token_param);
        }

        let media = self.fetch(item, token).await?;
        info!(index, item = %item.name, "Link resolved");
        with_access_token(&media.url, token, &self.token_param)
    }

    async fn fetch(&self, item: &PlaylistItem, token: &str) -> Result<ResolvedMedia, ResolutionError> {
        let detail = tokio::time::timeout(
            self.resolve_timeout,
            self.source.fetch_file_detail(token, &item.id),
        )
        .await
        .map_err(|_| ResolutionError::Timeout(self.resolve_timeout))??;

        let url = detail
            .download_url
            .filter(|url| has_playable_scheme(url))
            .ok_or_else(|| ResolutionError::UnusableUrl(item.id.clone()))?;
        Ok(ResolvedMedia {
            item_id: item.id.clone(),
            url: strip_access_token(&url, &self.token_param),
            resolved_at: Utc::now(),
        })
    }

    /// Reserves the prefetch slot for `item` at `index` and returns the task that fills it.
    ///
    /// Returns `None` when nothing needs to be fetched: the slot already targets this item,
    /// or the item carries its own link. A reservation superseded before the task finishes
    /// causes the task's result to be dropped.
    pub fn prefetch(&self, index: usize, item: PlaylistItem, token: String) -> Option<PrefetchTask> {
        if item.known_url.as_deref().is_some_and(has_playable_scheme) {
            return None;
        }
        let ticket = self.slot.reserve(index, &item.id)?;
        let cache = self.clone();
        Some(
            async move {
                match cache.fetch(&item, &token).await {
                    Ok(media) => {
                        if cache.slot.fill(ticket, media) {
                            debug!(index, item = %item.name, "Prefetch stored");
                        } else {
                            debug!(index, item = %item.name, "Prefetch superseded, result dropped");
                        }
                    }
                    Err(error) => {
                        cache.slot.abandon(ticket);
                        debug!(index, item = %item.name, %error, "Prefetch failed");
                    }
                }
            }
            .boxed(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::FileDetail;
    use crate::cloud::error::CloudError;
    use crate::structs::MediaKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out `https://d.example.com/<id>?rev=<call number>&access_token=baked`.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        delay: Option<Duration>,
        dlink: Option<&'static str>,
    }

    #[async_trait]
    impl FileDetailSource for CountingSource {
        async fn fetch_file_detail(
            &self,
            _access_token: &str,
            file_id: &str,
        ) -> Result<FileDetail, CloudError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let download_url = match self.dlink {
                Some(dlink) => Some(dlink.to_string()),
                None => Some(format!(
                    "https://d.example.com/{file_id}?rev={call}&access_token=baked"
                )),
            };
            Ok(FileDetail {
                file_id: file_id.to_string(),
                download_url,
                size: None,
                path: None,
            })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl FileDetailSource for FailingSource {
        async fn fetch_file_detail(&self, _: &str, file_id: &str) -> Result<FileDetail, CloudError> {
            Err(CloudError::NotFound(file_id.to_string()))
        }
    }

    fn item(id: &str) -> PlaylistItem {
        PlaylistItem::new(id, format!("/v/{id}.mp4"), MediaKind::Video)
    }

    fn cache(source: Arc<dyn FileDetailSource>) -> ResolutionCache {
        ResolutionCache::builder().source(source).build()
    }

    fn token_count(url: &str) -> usize {
        url.matches("access_token=").count()
    }

    #[tokio::test]
    async fn test_fresh_resolution_carries_current_token() {
        let source = Arc::new(CountingSource::default());
        let cache = cache(source.clone());

        let url = cache.resolve(0, &item("a"), "tok1").await.unwrap();
        assert_eq!(url, "https://d.example.com/a?rev=1&access_token=tok1");
        assert_eq!(token_count(&url), 1);
    }

    #[tokio::test]
    async fn test_prefetched_link_is_consumed_with_rotated_token() {
        let source = Arc::new(CountingSource::default());
        let cache = cache(source.clone());

        cache.prefetch(1, item("b"), "old".to_string()).unwrap().await;
        assert_eq!(cache.slot().target(), Some(1));

        let url = cache.resolve(1, &item("b"), "new").await.unwrap();
        assert_eq!(url, "https://d.example.com/b?rev=1&access_token=new");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1, "no second detail call");
        assert_eq!(cache.slot().target(), None);
    }

    #[tokio::test]
    async fn test_prefetch_for_other_index_is_not_consumed() {
        let source = Arc::new(CountingSource::default());
        let cache = cache(source.clone());

        cache.prefetch(2, item("c"), "t".to_string()).unwrap().await;
        cache.resolve(1, &item("b"), "t").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.slot().target(), Some(2));
    }

    #[tokio::test]
    async fn test_prefetch_is_not_repeated_for_same_target() {
        let source = Arc::new(CountingSource::default());
        let cache = cache(source);
        assert!(cache.prefetch(3, item("d"), "t".to_string()).is_some());
        assert!(cache.prefetch(3, item("d"), "t".to_string()).is_none());
    }

    #[tokio::test]
    async fn test_superseded_prefetch_result_is_discarded() {
        let source = Arc::new(CountingSource {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let cache = cache(source);

        let stale = tokio::spawn(cache.prefetch(1, item("b"), "t".to_string()).unwrap());
        cache.prefetch(4, item("e"), "t".to_string()).unwrap().await;
        stale.await.unwrap();

        assert_eq!(cache.slot().target(), Some(4));
        assert!(cache.slot().claim(1, "b", Duration::from_secs(60)).is_none());
    }

    #[tokio::test]
    async fn test_known_url_skips_detail_call() {
        let source = Arc::new(CountingSource::default());
        let cache = cache(source.clone());
        let item = item("k").with_known_url("https://cdn.example.com/k.mp4?access_token=stale");

        let url = cache.resolve(0, &item, "fresh").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/k.mp4?access_token=fresh");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(cache.prefetch(0, item, "fresh".to_string()).is_none());
    }

    #[tokio::test]
    async fn test_unusable_dlink_is_a_resolution_error() {
        let source = Arc::new(CountingSource {
            dlink: Some("ftp://nope"),
            ..Default::default()
        });
        let error = cache(source).resolve(0, &item("x"), "t").await.unwrap_err();
        assert!(matches!(error, ResolutionError::UnusableUrl(id) if id == "x"));
    }

    #[tokio::test]
    async fn test_capability_failure_is_a_resolution_error() {
        let error = cache(Arc::new(FailingSource))
            .resolve(0, &item("x"), "t")
            .await
            .unwrap_err();
        assert!(matches!(error, ResolutionError::Capability(_)));
    }

    #[tokio::test]
    async fn test_slow_capability_times_out() {
        let source = Arc::new(CountingSource {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        let cache = ResolutionCache::builder()
            .source(source)
            .resolve_timeout(Duration::from_millis(20))
            .build();
        let error = cache.resolve(0, &item("x"), "t").await.unwrap_err();
        assert!(matches!(error, ResolutionError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_failed_prefetch_releases_slot() {
        let cache = cache(Arc::new(FailingSource));
        cache.prefetch(1, item("b"), "t".to_string()).unwrap().await;
        assert_eq!(cache.slot().target(), None);
    }
}
