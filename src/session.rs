use crate::error::MediaNavigatorError;
use crate::events::SessionEvent;
use crate::extraction::{ExtractionPipeline, RequestHeaders};
use crate::geo::GeoPreference;
use crate::resolution::error::ResolutionError;
use crate::resolution::{ResolutionCache, TokenProvider};
use crate::sequencer::{PlayMode, Sequencer};
use crate::settings::{Settings, SettingsError};
use crate::structs::PlaylistItem;
use bon::bon;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// One playback session: the sequencer, resolution cache, extraction pipeline and geocoder
/// chain wired together, with results published as [`SessionEvent`]s.
///
/// Navigation methods are synchronous and return immediately; resolution, prefetching and
/// location lookup run on the session's runtime. Cloning yields another handle to the same
/// session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<Inner>,
}

struct Inner {
    sequencer: Mutex<Sequencer>,
    cache: ResolutionCache,
    pipeline: Arc<ExtractionPipeline>,
    settings: Settings,
    token: Arc<dyn TokenProvider>,
    headers: RequestHeaders,
    events: broadcast::Sender<SessionEvent>,
    /// Bumped on every navigation; background work tagged with an older value is stale.
    ticket: AtomicU64,
    runtime: Handle,
}

#[bon]
impl PlaybackSession {
    /// # Builder Arguments
    ///
    /// * `cache` - Resolution cache. Its prefetch slot is shared with the session's sequencer.
    /// * `pipeline` - Extraction pipeline, including the geocoder chain.
    /// * `token` - Source of the current access token.
    /// * `settings` - Persisted settings. In-memory defaults when omitted.
    /// * `headers` - Headers the player must send with resolved links.
    /// * `seed` - Fixes the shuffle order, for reproducible sessions.
    /// * `event_capacity` - (Default: 64) Events buffered per subscriber before the oldest are dropped.
    /// * `runtime` - Runtime for background work. Defaults to the current one.
    ///
    /// # Errors
    ///
    /// [`MediaNavigatorError::NoRuntime`] when no runtime was given and none is running.
    #[builder]
    pub fn new(
        cache: ResolutionCache,
        pipeline: Arc<ExtractionPipeline>,
        token: Arc<dyn TokenProvider>,
        settings: Option<Settings>,
        #[builder(default)] headers: RequestHeaders,
        seed: Option<u64>,
        #[builder(default = 64)] event_capacity: usize,
        runtime: Option<Handle>,
    ) -> Result<Self, MediaNavigatorError> {
        let runtime = match runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| MediaNavigatorError::NoRuntime)?,
        };
        let settings = settings.unwrap_or_else(Settings::in_memory);
        let mode = settings.play_mode();
        let mut sequencer = match seed {
            Some(seed) => Sequencer::with_seed(mode, seed),
            None => Sequencer::new(mode),
        };
        sequencer.attach_prefetch_slot(cache.slot().clone());
        pipeline.geocoder().set_preference(settings.geocoder_preference());
        let (events, _) = broadcast::channel(event_capacity.max(1));

        Ok(Self {
            inner: Arc::new(Inner {
                sequencer: Mutex::new(sequencer),
                cache,
                pipeline,
                settings,
                token,
                headers,
                events,
                ticket: AtomicU64::new(0),
                runtime,
            }),
        })
    }
}

impl PlaybackSession {
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Installs a new playlist and loads the item at the resulting position.
    pub fn set_playlist(&self, items: Vec<PlaylistItem>, reset_position: bool) {
        let mut sequencer = self.inner.lock_sequencer();
        sequencer.set_playlist(items, reset_position);
        info!(items = sequencer.len(), mode = %sequencer.mode(), "Playlist installed");
        if let Some(index) = sequencer.current_index() {
            self.inner.navigated(index, &sequencer);
        } else {
            self.inner.ticket.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn advance(&self) -> Option<usize> {
        let mut sequencer = self.inner.lock_sequencer();
        let index = sequencer.advance()?;
        self.inner.navigated(index, &sequencer);
        Some(index)
    }

    pub fn retreat(&self) -> Option<usize> {
        let mut sequencer = self.inner.lock_sequencer();
        let index = sequencer.retreat()?;
        self.inner.navigated(index, &sequencer);
        Some(index)
    }

    /// Jumps to `index`; returns `false` (and changes nothing) when it is out of range.
    pub fn seek_to(&self, index: usize) -> bool {
        let mut sequencer = self.inner.lock_sequencer();
        if !sequencer.seek_to(index) {
            return false;
        }
        self.inner.navigated(index, &sequencer);
        true
    }

    pub fn toggle_play_mode(&self) -> PlayMode {
        let mode = self.inner.lock_sequencer().mode().toggled();
        self.set_play_mode(mode);
        mode
    }

    /// Switches mode, persists it and re-targets the prefetch at the new predicted item.
    pub fn set_play_mode(&self, mode: PlayMode) {
        {
            let mut sequencer = self.inner.lock_sequencer();
            if sequencer.mode() == mode {
                return;
            }
            sequencer.set_play_mode(mode);
        }
        if let Err(error) = self.inner.settings.set_play_mode(mode) {
            warn!(%error, "Could not persist play mode");
        }
        info!(%mode, "Play mode changed");
        self.inner.emit(SessionEvent::PlayModeChanged { mode });
        self.inner.schedule_prefetch(None);
    }

    pub fn play_mode(&self) -> PlayMode {
        self.inner.lock_sequencer().mode()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.inner.lock_sequencer().current_index()
    }

    pub fn current_item(&self) -> Option<PlaylistItem> {
        self.inner.lock_sequencer().current_item().cloned()
    }

    /// Resolves the current item directly, for callers that prefer awaiting over events.
    pub async fn resolve_current(&self) -> Result<String, ResolutionError> {
        let (index, item) = {
            let sequencer = self.inner.lock_sequencer();
            let index = sequencer
                .current_index()
                .ok_or(ResolutionError::EmptyPlaylist)?;
            let item = sequencer
                .current_item()
                .cloned()
                .ok_or(ResolutionError::EmptyPlaylist)?;
            (index, item)
        };
        let token = self.inner.token.access_token();
        self.inner.cache.resolve(index, &item, &token).await
    }

    /// Persists the geocoder choice and applies it to the running chain.
    pub fn set_geocoder_preference(&self, preference: GeoPreference) -> Result<(), SettingsError> {
        self.inner.settings.set_geocoder_preference(&preference)?;
        self.inner.pipeline.geocoder().set_preference(preference);
        Ok(())
    }

    pub fn set_show_location(&self, show: bool) -> Result<(), SettingsError> {
        self.inner.settings.set_show_location(show)
    }

    /// Skips past an item whose link could not be resolved, after `delay`.
    ///
    /// Nothing happens if the user navigated in the meantime.
    pub fn advance_after_failure(&self, failed_index: usize, delay: Duration) {
        let ticket = self.inner.ticket.load(Ordering::SeqCst);
        let session = self.clone();
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if session.inner.is_current(ticket) && session.current_index() == Some(failed_index) {
                debug!(failed_index, "Skipping unplayable item");
                session.advance();
            }
        });
    }
}

/// The item a prefetch should target. A one-item playlist only repeats itself in
/// [`PlayMode::Single`].
fn predicted_next(sequencer: &Sequencer) -> Option<(usize, PlaylistItem)> {
    let current = sequencer.current_index()?;
    let next = sequencer.peek_next()?;
    if next == current && sequencer.mode() != PlayMode::Single {
        return None;
    }
    Some((next, sequencer.item(next)?.clone()))
}

impl Inner {
    fn lock_sequencer(&self) -> MutexGuard<'_, Sequencer> {
        self.sequencer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.ticket.load(Ordering::SeqCst) == ticket
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Reserves the slot for the item the sequencer predicts right now. The target is read and
    /// reserved under the sequencer lock so a concurrent mode change or navigation cannot leave
    /// the slot on an outdated prediction. With `Some(ticket)` nothing happens once navigation
    /// has moved past that ticket.
    fn schedule_prefetch(&self, ticket: Option<u64>) {
        let sequencer = self.lock_sequencer();
        if ticket.is_some_and(|ticket| !self.is_current(ticket)) {
            return;
        }
        let Some((index, item)) = predicted_next(&sequencer) else {
            return;
        };
        if let Some(task) = self.cache.prefetch(index, item, self.token.access_token()) {
            self.runtime.spawn(task);
        }
    }

    /// Called with the sequencer locked, so tickets follow navigation order.
    fn navigated(self: &Arc<Self>, index: usize, sequencer: &Sequencer) {
        let ticket = self.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(item) = sequencer.item(index).cloned() else {
            return;
        };
        debug!(index, item = %item.name, "Current item changed");
        self.emit(SessionEvent::CurrentItemChanged {
            index,
            item: item.clone(),
        });

        let inner = Arc::clone(self);
        self.runtime
            .spawn(async move { inner.load(ticket, index, item).await });
    }

    async fn load(&self, ticket: u64, index: usize, item: PlaylistItem) {
        let token = self.token.access_token();
        let resolved = self.cache.resolve(index, &item, &token).await;
        if !self.is_current(ticket) {
            debug!(index, "Navigation moved on, dropping resolution result");
            return;
        }

        let url = match resolved {
            Ok(url) => url,
            Err(error) => {
                warn!(index, item = %item.name, %error, "Could not resolve playable link");
                self.emit(SessionEvent::UrlFailed {
                    index,
                    error: error.to_string(),
                });
                self.schedule_prefetch(Some(ticket));
                return;
            }
        };
        self.emit(SessionEvent::UrlReady {
            index,
            url: url.clone(),
            headers: self.headers.clone(),
        });
        self.schedule_prefetch(Some(ticket));

        if !self.settings.show_location() {
            return;
        }
        let label = self.pipeline.locate(&url, item.kind).await;
        if !self.is_current(ticket) {
            return;
        }
        self.emit(match label {
            Some(label) => SessionEvent::LocationReady { index, label },
            None => SessionEvent::LocationUnavailable { index },
        });
    }
}
