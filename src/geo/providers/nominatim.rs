use super::text;
use crate::geo::{AddressParts, AddressStyle, GeoError, GeoProvider, ProviderDescriptor};
use crate::structs::Coordinate;
use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
/// The public instance rejects requests without an identifying User-Agent.
pub const DEFAULT_USER_AGENT: &str = concat!("media_navigator/", env!("CARGO_PKG_VERSION"));

/// OpenStreetMap's community geocoder.
pub struct NominatimProvider {
    descriptor: ProviderDescriptor,
    client: Client,
    base_url: String,
    language: Option<String>,
}

#[bon]
impl NominatimProvider {
    /// # Builder Arguments
    ///
    /// * `language` - Sent as `Accept-Language`; the local language of the place otherwise.
    #[builder]
    pub fn new(
        #[builder(into, default = DEFAULT_BASE_URL.to_string())] base_url: String,
        #[builder(into, default = DEFAULT_USER_AGENT.to_string())] user_agent: String,
        #[builder(into)] language: Option<String>,
        #[builder(default = Duration::from_secs(8))] timeout: Duration,
        #[builder(default = 2)] priority: u32,
    ) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            descriptor: ProviderDescriptor::new(
                "Nominatim",
                priority,
                timeout,
                "OpenStreetMap community geocoder, worldwide coverage",
            ),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            language,
        })
    }
}

fn first_text(address: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(address.get(key)))
}

fn address_parts(body: &Value) -> AddressParts {
    let empty = Value::Null;
    let address = body.get("address").unwrap_or(&empty);
    AddressParts {
        poi: text(body.get("name"))
            .or_else(|| first_text(address, &["amenity", "tourism", "building", "shop", "leisure"])),
        house_number: text(address.get("house_number")),
        street: first_text(address, &["road", "pedestrian", "footway", "path"]),
        neighborhood: first_text(address, &["neighbourhood", "quarter", "hamlet"]),
        district: first_text(address, &["suburb", "city_district", "borough"]),
        city: first_text(address, &["city", "town", "village", "municipality"]),
        region: first_text(address, &["state", "province", "region"]),
    }
}

#[async_trait]
impl GeoProvider for NominatimProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, GeoError> {
        let url = format!("{}/reverse", self.base_url);
        let latitude = format!("{:.7}", coordinate.latitude);
        let longitude = format!("{:.7}", coordinate.longitude);
        debug!("GET {} for {},{}", url, latitude, longitude);

        let mut request = self.client.get(&url).query(&[
            ("format", "jsonv2"),
            ("lat", latitude.as_str()),
            ("lon", longitude.as_str()),
            ("addressdetails", "1"),
            ("zoom", "18"),
        ]);
        if let Some(language) = &self.language {
            request = request.header(reqwest::header::ACCEPT_LANGUAGE, language);
        }
        let body: Value = request.send().await?.error_for_status()?.json().await?;

        // Open water and other unnamed places come back as `{"error": "Unable to geocode"}`.
        if body.get("error").is_some() {
            return Ok(None);
        }
        Ok(address_parts(&body)
            .assemble(AddressStyle::Western)
            .or_else(|| text(body.get("display_name"))))
    }
}
