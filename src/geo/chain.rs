use super::{GeoProvider, ProviderDescriptor};
use crate::structs::Coordinate;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// The user's provider choice, persisted by the settings layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPreference {
    /// Provider name, matched case-insensitively. `None` means plain priority order.
    pub provider: Option<String>,
    /// Whether the other providers are consulted after the preferred one fails.
    pub fallback_enabled: bool,
}

impl Default for GeoPreference {
    fn default() -> Self {
        Self {
            provider: None,
            fallback_enabled: true,
        }
    }
}

/// Tries providers in order until one names the position.
///
/// Every provider call runs under its own timeout and panic boundary; a failing provider
/// only ever means "try the next one".
pub struct GeoChain {
    providers: Vec<Arc<dyn GeoProvider>>,
    preference: RwLock<GeoPreference>,
}

impl GeoChain {
    pub fn new(mut providers: Vec<Arc<dyn GeoProvider>>) -> Self {
        providers.sort_by_key(|provider| provider.descriptor().priority);
        Self {
            providers,
            preference: RwLock::new(GeoPreference::default()),
        }
    }

    #[must_use]
    pub fn with_preference(self, preference: GeoPreference) -> Self {
        self.set_preference(preference);
        self
    }

    pub fn set_preference(&self, preference: GeoPreference) {
        *self
            .preference
            .write()
            .unwrap_or_else(PoisonError::into_inner) = preference;
    }

    pub fn preference(&self) -> GeoPreference {
        self.preference
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Descriptors in the order the chain tries them when no preference is set.
    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        self.providers
            .iter()
            .map(|provider| provider.descriptor().clone())
            .collect()
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.providers
            .iter()
            .position(|provider| provider.descriptor().name.eq_ignore_ascii_case(name))
    }

    /// A human-readable address for `coordinate`, or `None` when no provider could name it.
    pub async fn resolve_address(&self, coordinate: Coordinate) -> Option<String> {
        let preference = self.preference();
        let preferred = match preference.provider.as_deref() {
            Some(name) => {
                let index = self.find(name);
                if index.is_none() {
                    warn!("Preferred geocoder {} is not registered, using priority order", name);
                }
                index
            }
            None => None,
        };

        if let Some(index) = preferred {
            if let Some(address) = self.try_provider(self.providers[index].as_ref(), coordinate).await {
                return Some(address);
            }
            if !preference.fallback_enabled {
                debug!("Preferred geocoder failed and fallback is disabled");
                return None;
            }
        }

        for (index, provider) in self.providers.iter().enumerate() {
            if Some(index) == preferred {
                continue;
            }
            if let Some(address) = self.try_provider(provider.as_ref(), coordinate).await {
                return Some(address);
            }
        }
        debug!("All geocoders exhausted");
        None
    }

    async fn try_provider(&self, provider: &dyn GeoProvider, coordinate: Coordinate) -> Option<String> {
        let descriptor = provider.descriptor();
        let name = descriptor.name.as_str();

        let available = std::panic::catch_unwind(AssertUnwindSafe(|| provider.is_available()))
            .unwrap_or(false);
        if !available {
            debug!(provider = name, "Geocoder unavailable, skipping");
            return None;
        }

        let call = AssertUnwindSafe(provider.reverse_geocode(coordinate)).catch_unwind();
        match tokio::time::timeout(descriptor.timeout, call).await {
            Ok(Ok(Ok(Some(address)))) if !address.trim().is_empty() => {
                info!(provider = name, "Address resolved");
                Some(address)
            }
            Ok(Ok(Ok(_))) => {
                debug!(provider = name, "Geocoder found no address");
                None
            }
            Ok(Ok(Err(error))) => {
                warn!(provider = name, %error, "Geocoder failed");
                None
            }
            Ok(Err(_)) => {
                warn!(provider = name, "Geocoder panicked");
                None
            }
            Err(_) => {
                warn!(provider = name, timeout = ?descriptor.timeout, "Geocoder timed out");
                None
            }
        }
    }
}
