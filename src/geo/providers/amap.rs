use super::text;
use crate::geo::datum::wgs84_to_gcj02;
use crate::geo::{AddressParts, AddressStyle, GeoError, GeoProvider, ProviderDescriptor};
use crate::structs::Coordinate;
use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://restapi.amap.com";

/// AMap web service reverse geocoding. Needs an API key and GCJ-02 input.
pub struct AmapProvider {
    descriptor: ProviderDescriptor,
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[bon]
impl AmapProvider {
    #[builder]
    pub fn new(
        #[builder(into)] api_key: Option<String>,
        #[builder(into, default = DEFAULT_BASE_URL.to_string())] base_url: String,
        #[builder(default = Duration::from_secs(5))] timeout: Duration,
        #[builder(default = 1)] priority: u32,
    ) -> Result<Self, GeoError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            descriptor: ProviderDescriptor::new(
                "AMap",
                priority,
                timeout,
                "AMap web service, most detailed in mainland China",
            ),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }
}

fn address_parts(component: &Value) -> AddressParts {
    let poi = text(component.pointer("/building/name"))
        .or_else(|| text(component.pointer("/neighborhood/name")));
    let region = text(component.get("province"));
    AddressParts {
        poi,
        house_number: text(component.pointer("/streetNumber/number")),
        street: text(component.pointer("/streetNumber/street")),
        neighborhood: text(component.get("township")),
        district: text(component.get("district")),
        // Municipalities report an empty city and name themselves as the province.
        city: text(component.get("city")).or_else(|| region.clone()),
        region,
    }
}

#[async_trait]
impl GeoProvider for AmapProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, GeoError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GeoError::Unavailable(self.descriptor.name.clone()));
        };
        let shifted = wgs84_to_gcj02(coordinate);
        let location = format!("{:.6},{:.6}", shifted.longitude, shifted.latitude);
        let url = format!("{}/v3/geocode/regeo", self.base_url);
        debug!("GET {} for {}", url, location);

        let body: Value = self
            .client
            .get(&url)
            .query(&[
                ("key", api_key),
                ("location", location.as_str()),
                ("extensions", "base"),
                ("output", "JSON"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.get("status").and_then(Value::as_str) != Some("1") {
            let info = text(body.get("info")).unwrap_or_else(|| "unknown error".to_string());
            return Err(GeoError::Api(info));
        }
        let Some(regeocode) = body.get("regeocode") else {
            return Ok(None);
        };
        let assembled = regeocode
            .get("addressComponent")
            .and_then(|component| address_parts(component).assemble(AddressStyle::Compact));
        Ok(assembled.or_else(|| text(regeocode.get("formatted_address"))))
    }
}
