//! Coordinate to address resolution through an ordered, user-overridable set of providers.

mod address;
mod chain;
pub mod datum;
pub mod error;
pub mod providers;

pub use address::{AddressParts, AddressStyle, join_distinct};
pub use chain::{GeoChain, GeoPreference};
pub use error::GeoError;

use crate::structs::Coordinate;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Static description of a provider. Lower `priority` is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub name: String,
    pub priority: u32,
    pub timeout: Duration,
    pub description: String,
}

impl ProviderDescriptor {
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        timeout: Duration,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            timeout,
            description: description.into(),
        }
    }
}

/// One reverse-geocoding backend.
///
/// Coordinates are always handed over in WGS-84; a provider that needs another datum
/// converts internally.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Whether the provider can be asked at all (e.g. it has its API key).
    fn is_available(&self) -> bool {
        true
    }

    /// `Ok(None)` means the provider answered but knows no address for the position.
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, GeoError>;
}
