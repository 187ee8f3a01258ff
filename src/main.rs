use media_navigator::cloud::PanClient;
use media_navigator::error::MediaNavigatorError;
use media_navigator::events::SessionEvent;
use media_navigator::extraction::{ExtractionPipeline, ExiftoolReader, HttpByteFetcher, MetadataReader};
use media_navigator::geo::GeoChain;
use media_navigator::geo::providers::default_providers;
use media_navigator::logging::init_logging;
use media_navigator::resolution::{ResolutionCache, SharedToken};
use media_navigator::session::PlaybackSession;
use media_navigator::settings::{JsonFileSettings, Settings};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const SKIP_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), MediaNavigatorError> {
    init_logging()?;

    let access_token =
        env::var("MEDIA_NAV_TOKEN").map_err(|_| MediaNavigatorError::MissingConfig("MEDIA_NAV_TOKEN"))?;
    let dir = env::var("MEDIA_NAV_DIR").unwrap_or_else(|_| "/".to_string());
    let amap_key = env::var("AMAP_KEY").ok();
    let settings = match env::var("MEDIA_NAV_SETTINGS") {
        Ok(path) => Settings::new(Arc::new(JsonFileSettings::open(path)?)),
        Err(_) => Settings::in_memory(),
    };

    let pan = Arc::new(PanClient::builder().build()?);
    let items = pan.list_directory(&access_token, &dir).await?;
    info!("Found {} playable files in {}", items.len(), dir);
    if items.is_empty() {
        return Ok(());
    }

    let fetcher = Arc::new(HttpByteFetcher::new()?);
    let reader: Option<Arc<dyn MetadataReader>> = match ExiftoolReader::new(None) {
        Ok(reader) => Some(Arc::new(reader)),
        Err(error) => {
            warn!(%error, "exiftool unavailable, falling back to byte scanning only");
            None
        }
    };
    let download_headers = vec![(
        "User-Agent".to_string(),
        media_navigator::cloud::PAN_USER_AGENT.to_string(),
    )];
    let pipeline = ExtractionPipeline::builder()
        .fetcher(fetcher)
        .maybe_reader(reader)
        .geocoder(Arc::new(GeoChain::new(default_providers(amap_key)?)))
        .headers(download_headers.clone())
        .build();

    let session = PlaybackSession::builder()
        .cache(ResolutionCache::builder().source(pan).build())
        .pipeline(Arc::new(pipeline))
        .token(Arc::new(SharedToken::new(access_token)))
        .settings(settings.clone())
        .headers(download_headers)
        .build()?;

    let total = items.len();
    let mut events = session.subscribe();
    session.set_playlist(items, true);

    let mut shown = 0;
    while shown < total {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Fell behind on session events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            SessionEvent::CurrentItemChanged { index, item } => {
                println!("[{}/{}] {}", index + 1, total, item.path);
            }
            SessionEvent::UrlReady { index, url, .. } => {
                println!("    link: {url}");
                if !settings.show_location() {
                    shown += 1;
                    advance_later(&session, index, settings.image_display_secs());
                }
            }
            SessionEvent::UrlFailed { index, error } => {
                println!("    unplayable: {error}");
                shown += 1;
                session.advance_after_failure(index, SKIP_DELAY);
            }
            SessionEvent::LocationReady { index, label } => {
                println!("    taken in {label}");
                shown += 1;
                advance_later(&session, index, settings.image_display_secs());
            }
            SessionEvent::LocationUnavailable { index } => {
                shown += 1;
                advance_later(&session, index, settings.image_display_secs());
            }
            SessionEvent::PlayModeChanged { mode } => println!("Play mode: {mode}"),
        }
    }
    Ok(())
}

/// Moves on after the display time, unless someone else already did.
fn advance_later(session: &PlaybackSession, index: usize, display_secs: u64) {
    let session = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(display_secs)).await;
        if session.current_index() == Some(index) {
            session.advance();
        }
    });
}
