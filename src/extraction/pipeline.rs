use super::error::{ExtractionError, FetchError};
use super::fetch::{ByteFetcher, RequestHeaders, is_network_url};
use super::metadata::MetadataReader;
use super::patterns::{parse_location_field, scan_for_coordinate};
use crate::geo::GeoChain;
use crate::structs::{Coordinate, MediaKind};
use bon::bon;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, select_ok};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of one strategy that did not produce a position.
#[derive(Debug)]
struct Miss;

/// The first bytes of a file, downloaded once and awaited by every strategy that reads them.
type SharedHead<'a> = Shared<BoxFuture<'a, Result<Arc<Vec<u8>>, Arc<FetchError>>>>;

/// Locates media by racing several byte-inspection strategies, then geocodes the result.
pub struct ExtractionPipeline {
    fetcher: Arc<dyn ByteFetcher>,
    reader: Option<Arc<dyn MetadataReader>>,
    geocoder: Arc<GeoChain>,
    overall_timeout: Duration,
    strategy_timeout: Duration,
    probe_bytes: u64,
    image_probe_bytes: u64,
    headers: RequestHeaders,
}

#[bon]
impl ExtractionPipeline {
    /// # Builder Arguments
    ///
    /// * `fetcher` - Ranged byte access to the media.
    /// * `reader` - Optional structured metadata reader. Without one, images and videos are only pattern-scanned.
    /// * `geocoder` - Provider chain that turns the position into a label.
    /// * `overall_timeout` - (Default: 20 s) Wall-clock budget for one extraction.
    /// * `strategy_timeout` - (Default: 12 s) Budget for each individual strategy.
    /// * `probe_bytes` - (Default: 2 MiB) Size of the head and tail windows for videos, and of the image head handed to `reader`.
    /// * `image_probe_bytes` - (Default: 512 KiB) Size of the head window scanned for images.
    /// * `headers` - Headers sent with every probe request.
    #[builder]
    pub fn new(
        fetcher: Arc<dyn ByteFetcher>,
        reader: Option<Arc<dyn MetadataReader>>,
        geocoder: Arc<GeoChain>,
        #[builder(default = Duration::from_secs(20))] overall_timeout: Duration,
        #[builder(default = Duration::from_secs(12))] strategy_timeout: Duration,
        #[builder(default = 2 * 1024 * 1024)] probe_bytes: u64,
        #[builder(default = 512 * 1024)] image_probe_bytes: u64,
        #[builder(default)] headers: RequestHeaders,
    ) -> Self {
        Self {
            fetcher,
            reader,
            geocoder,
            overall_timeout,
            strategy_timeout,
            probe_bytes: probe_bytes.max(1),
            image_probe_bytes: image_probe_bytes.max(1),
            headers,
        }
    }

    pub fn geocoder(&self) -> &Arc<GeoChain> {
        &self.geocoder
    }

    /// A human-readable location for the media at `url`, or `None` when it carries no
    /// position or no provider could name it.
    pub async fn locate(&self, url: &str, kind: MediaKind) -> Option<String> {
        let coordinate = self.extract_location(url, kind).await?;
        self.geocoder.resolve_address(coordinate).await
    }

    /// The embedded position of the media at `url`, within the overall time budget.
    pub async fn extract_location(&self, url: &str, kind: MediaKind) -> Option<Coordinate> {
        let extraction = async {
            match kind {
                MediaKind::Image => self.image_location(url).await,
                MediaKind::Video => self.race_video_strategies(url).await,
            }
        };
        match tokio::time::timeout(self.overall_timeout, extraction).await {
            Ok(Some(coordinate)) => {
                info!(
                    latitude = coordinate.latitude,
                    longitude = coordinate.longitude,
                    "Embedded location found"
                );
                Some(coordinate)
            }
            Ok(None) => {
                debug!("No embedded location");
                None
            }
            Err(_) => {
                debug!(timeout = ?self.overall_timeout, "Location extraction timed out");
                None
            }
        }
    }

    async fn image_location(&self, url: &str) -> Option<Coordinate> {
        let head_bytes = match self.reader {
            Some(_) => self.probe_bytes.max(self.image_probe_bytes),
            None => self.image_probe_bytes,
        };
        let head = self.shared_head(url, head_bytes);
        if let Some(reader) = &self.reader {
            let exif = self.guarded("exif", async {
                let bytes = head.clone().await.map_err(ExtractionError::HeadFetch)?;
                reader.image_gps(url, &bytes).await
            });
            if let Ok(coordinate) = exif.await {
                return Some(coordinate);
            }
        }
        // XMP packets and vendor JSON blocks keep positions as text.
        self.guarded("image header scan", scan_head(head, self.image_probe_bytes))
            .await
            .ok()
    }

    async fn race_video_strategies(&self, url: &str) -> Option<Coordinate> {
        let head = self.shared_head(url, self.probe_bytes);
        let mut strategies: Vec<BoxFuture<'_, Result<Coordinate, Miss>>> = Vec::new();
        if let Some(reader) = &self.reader {
            let metadata = container_metadata(reader.as_ref(), url, head.clone());
            strategies.push(self.guarded("container metadata", metadata).boxed());
        }
        strategies.push(self.guarded("header probe", scan_head(head, self.probe_bytes)).boxed());
        if is_network_url(url) {
            strategies.push(self.guarded("tail probe", self.tail_probe(url)).boxed());
        }

        // The losers are dropped with the select, which aborts their in-flight requests.
        select_ok(strategies).await.ok().map(|(coordinate, _losers)| coordinate)
    }

    /// Starts nothing until first polled; later awaits reuse the same download.
    fn shared_head<'a>(&'a self, url: &'a str, length: u64) -> SharedHead<'a> {
        self.fetcher
            .fetch_range(url, 0, length - 1, &self.headers)
            .map(|result| result.map(Arc::new).map_err(Arc::new))
            .boxed()
            .shared()
    }

    /// Applies the per-strategy timeout and folds every failure into a logged [`Miss`].
    async fn guarded<F>(&self, strategy: &'static str, attempt: F) -> Result<Coordinate, Miss>
    where
        F: Future<Output = Result<Option<Coordinate>, ExtractionError>>,
    {
        match tokio::time::timeout(self.strategy_timeout, attempt).await {
            Ok(Ok(Some(coordinate))) => {
                debug!(strategy, "Strategy found a location");
                Ok(coordinate)
            }
            Ok(Ok(None)) => {
                debug!(strategy, "Strategy found nothing");
                Err(Miss)
            }
            Ok(Err(error)) => {
                debug!(strategy, %error, "Strategy failed");
                Err(Miss)
            }
            Err(_) => {
                debug!(strategy, "Strategy timed out");
                Err(Miss)
            }
        }
    }

    async fn scan_window(
        &self,
        url: &str,
        start: u64,
        length: u64,
    ) -> Result<Option<Coordinate>, ExtractionError> {
        let bytes = self
            .fetcher
            .fetch_range(url, start, start + length - 1, &self.headers)
            .await?;
        Ok(scan_bytes(&bytes, start))
    }

    async fn tail_probe(&self, url: &str) -> Result<Option<Coordinate>, ExtractionError> {
        let Some(size) = self
            .fetcher
            .content_length(url, &self.headers)
            .await?
            .filter(|&size| size > 0)
        else {
            return Ok(None);
        };
        if size <= self.probe_bytes {
            return self.scan_window(url, 0, size).await;
        }
        self.scan_window(url, size - self.probe_bytes, self.probe_bytes)
            .await
    }
}

async fn container_metadata(
    reader: &dyn MetadataReader,
    url: &str,
    head: SharedHead<'_>,
) -> Result<Option<Coordinate>, ExtractionError> {
    let bytes = head.await.map_err(ExtractionError::HeadFetch)?;
    let field = reader.location_field(url, &bytes).await?;
    Ok(field.as_deref().and_then(parse_location_field))
}

/// Scans at most `limit` bytes of the shared head.
async fn scan_head(head: SharedHead<'_>, limit: u64) -> Result<Option<Coordinate>, ExtractionError> {
    let bytes = head.await.map_err(ExtractionError::HeadFetch)?;
    let end = bytes.len().min(usize::try_from(limit).unwrap_or(usize::MAX));
    Ok(scan_bytes(&bytes[..end], 0))
}

fn scan_bytes(bytes: &[u8], start: u64) -> Option<Coordinate> {
    scan_for_coordinate(bytes).map(|(coordinate, pattern)| {
        debug!(pattern, start, "Coordinate pattern matched");
        coordinate
    })
}
