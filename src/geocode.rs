use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Returned whenever an address cannot be resolved. Callers treat this as
/// a displayable string, never as an error.
pub const ADDRESS_PLACEHOLDER: &str = "Address not found";

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: String,
}

/// Client for a Nominatim-compatible reverse-geocoding endpoint. Lookup is
/// best effort: any failure degrades to [`ADDRESS_PLACEHOLDER`].
pub struct ReverseGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl ReverseGeocoder {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("pickup-exchange")
            .build()
            .expect("valid reverse geocoding client");

        Self { client, base_url }
    }

    pub async fn lookup(&self, lat: f64, lng: f64) -> String {
        match self.fetch(lat, lng).await {
            Ok(address) if !address.trim().is_empty() => address,
            Ok(_) => ADDRESS_PLACEHOLDER.to_string(),
            Err(err) => {
                warn!(error = %err, lat, lng, "reverse geocoding failed");
                ADDRESS_PLACEHOLDER.to_string()
            }
        }
    }

    async fn fetch(&self, lat: f64, lng: f64) -> Result<String, reqwest::Error> {
        let url = format!(
            "{}/reverse?format=json&lat={lat}&lon={lng}&zoom=18&addressdetails=1",
            self.base_url
        );

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body: ReverseResponse = response.json().await?;
        Ok(body.display_name)
    }
}
