use crate::geo::{GeoError, GeoProvider, ProviderDescriptor, join_distinct};
use crate::structs::Coordinate;
use async_trait::async_trait;
use reverse_geocoder::ReverseGeocoder;
use std::time::Duration;

/// Nearest-city lookup in the bundled GeoNames dataset. Works without network access,
/// so it closes the chain.
pub struct OfflineProvider {
    descriptor: ProviderDescriptor,
    geocoder: ReverseGeocoder,
}

impl OfflineProvider {
    pub fn new() -> Self {
        Self::with_priority(3)
    }

    pub fn with_priority(priority: u32) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(
                "Offline",
                priority,
                Duration::from_secs(2),
                "Bundled city dataset, city level only",
            ),
            geocoder: ReverseGeocoder::new(),
        }
    }

    /// `City, Region, Country` of the nearest known populated place.
    pub fn nearest_place(&self, coordinate: Coordinate) -> Option<String> {
        let search_result = self.geocoder.search((coordinate.latitude, coordinate.longitude));
        let record = search_result.record;
        let country_name = rust_iso3166::from_alpha2(&record.cc).map(|country| country.name);
        join_distinct(
            [record.name.as_str(), record.admin1.as_str()]
                .into_iter()
                .chain(country_name),
            ", ",
        )
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeoProvider for OfflineProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, GeoError> {
        Ok(self.nearest_place(coordinate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_amsterdam() {
        let provider = OfflineProvider::new();
        let address = provider
            .reverse_geocode(Coordinate::new(52.379_189, 4.899_431))
            .await
            .unwrap();
        assert_eq!(address.as_deref(), Some("Amsterdam, North Holland, Netherlands"));
    }

    #[tokio::test]
    async fn test_new_york_city() {
        let provider = OfflineProvider::new();
        let address = provider
            .reverse_geocode(Coordinate::new(40.7128, -74.0060))
            .await
            .unwrap()
            .unwrap();
        assert!(address.starts_with("New York City, New York"), "{address}");
    }

    #[test]
    fn test_always_available() {
        let provider = OfflineProvider::new();
        assert!(provider.is_available());
        assert_eq!(provider.descriptor().priority, 3);
    }
}
