//! # Media Navigator
//!
//! Play a remote photo and video collection as a slideshow: decide what comes next,
//! turn cloud file ids into playable links just in time, and label each item with the
//! place it was taken.
//!
//! ## Key Features
//!
//! - **Play Modes**: Sequential, reverse, shuffled (a stable permutation per playlist) and single-item repeat.
//! - **Link Resolution**: Expiring download links are fetched on demand, with the predicted next item prefetched in the background.
//! - **GPS Extraction**: Reads Exif GPS from images and races container metadata against head and tail byte probes for videos, without downloading the whole file.
//! - **Geocoding**: A prioritized chain of providers (AMap, Nominatim, an offline city dataset) with a user-selectable preference and fallback.
//! - **Sessions**: A [`session::PlaybackSession`] composes all of the above and publishes [`events::SessionEvent`]s.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use media_navigator::cloud::PanClient;
//! use media_navigator::events::SessionEvent;
//! use media_navigator::extraction::{ExtractionPipeline, HttpByteFetcher};
//! use media_navigator::geo::{GeoChain, providers::default_providers};
//! use media_navigator::resolution::{ResolutionCache, SharedToken};
//! use media_navigator::session::PlaybackSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), media_navigator::error::MediaNavigatorError> {
//!     let token = SharedToken::new("my-access-token");
//!     let pan = Arc::new(PanClient::builder().build()?);
//!     let items = pan.list_directory("my-access-token", "/Photos/2024").await?;
//!
//!     let geocoder = Arc::new(GeoChain::new(default_providers(None)?));
//!     let pipeline = ExtractionPipeline::builder()
//!         .fetcher(Arc::new(HttpByteFetcher::new()?))
//!         .geocoder(geocoder)
//!         .build();
//!     let session = PlaybackSession::builder()
//!         .cache(ResolutionCache::builder().source(pan).build())
//!         .pipeline(Arc::new(pipeline))
//!         .token(Arc::new(token))
//!         .build()?;
//!
//!     let mut events = session.subscribe();
//!     session.set_playlist(items, true);
//!     while let Ok(event) = events.recv().await {
//!         if let SessionEvent::LocationReady { label, .. } = event {
//!             println!("Taken in {label}");
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cloud;
pub mod error;
pub mod events;
pub mod extraction;
pub mod geo;
pub mod logging;
pub mod resolution;
pub mod sequencer;
pub mod session;
pub mod settings;
pub mod structs;

pub use error::MediaNavigatorError;
pub use sequencer::{PlayMode, Sequencer};
pub use session::PlaybackSession;
pub use structs::{Coordinate, MediaKind, PlaylistItem, ResolvedMedia};
