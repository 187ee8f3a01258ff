mod amap;
mod nominatim;
mod offline;

pub use amap::AmapProvider;
pub use nominatim::NominatimProvider;
pub use offline::OfflineProvider;

use super::{GeoError, GeoProvider};
use serde_json::Value;
use std::sync::Arc;

/// The built-in chain: AMap (only with a key), Nominatim, then the bundled offline dataset.
pub fn default_providers(amap_key: Option<String>) -> Result<Vec<Arc<dyn GeoProvider>>, GeoError> {
    Ok(vec![
        Arc::new(AmapProvider::builder().maybe_api_key(amap_key).build()?),
        Arc::new(NominatimProvider::builder().build()?),
        Arc::new(OfflineProvider::new()),
    ])
}

/// Non-empty string value. Some services send `[]` instead of omitting empty fields.
fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
