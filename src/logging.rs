//! Tracing subscriber setup for the binary. Library code only emits events.

use crate::error::MediaNavigatorError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "media_navigator=info,warn";

/// Initialize stderr logging, filtered by `RUST_LOG`.
pub fn init_logging() -> Result<(), MediaNavigatorError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|error| MediaNavigatorError::Logging(error.to_string()))?;

    tracing::debug!("Logging initialized");
    Ok(())
}
