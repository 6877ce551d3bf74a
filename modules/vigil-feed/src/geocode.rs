use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use vigil_common::Coordinates;

use crate::traits::ReverseGeocoder;

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    suburb: Option<String>,
    neighbourhood: Option<String>,
    city_district: Option<String>,
}

impl NominatimAddress {
    /// Most specific non-empty area name.
    fn zone(self) -> Option<String> {
        [self.suburb, self.neighbourhood, self.city_district]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
    }
}

/// Reverse geocoding against a Nominatim `/reverse` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("vigil/1.0")
            .build()
            .context("Failed to build geocoder HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn zone_label(&self, at: Coordinates) -> Result<Option<String>> {
        let url = format!("{}/reverse", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lng.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: NominatimReverse = resp.json().await?;
        Ok(body.address.and_then(NominatimAddress::zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn geocoder_answering(body: serde_json::Value) -> (MockServer, NominatimGeocoder) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        let geocoder = NominatimGeocoder::new(&server.uri()).unwrap();
        (server, geocoder)
    }

    #[tokio::test]
    async fn prefers_suburb() {
        let (_server, geocoder) = geocoder_answering(json!({
            "address": { "suburb": "Pétion-Ville", "neighbourhood": "Juvénat", "city_district": "Ouest" }
        }))
        .await;
        let zone = geocoder.zone_label(Coordinates::new(18.51, -72.28)).await.unwrap();
        assert_eq!(zone.as_deref(), Some("Pétion-Ville"));
    }

    #[tokio::test]
    async fn skips_empty_names() {
        let (_server, geocoder) = geocoder_answering(json!({
            "address": { "suburb": "", "city_district": "Tabarre" }
        }))
        .await;
        let zone = geocoder.zone_label(Coordinates::new(18.57, -72.27)).await.unwrap();
        assert_eq!(zone.as_deref(), Some("Tabarre"));
    }

    #[tokio::test]
    async fn missing_address_is_none() {
        let (_server, geocoder) = geocoder_answering(json!({ "error": "Unable to geocode" })).await;
        let zone = geocoder.zone_label(Coordinates::new(0.0, 0.0)).await.unwrap();
        assert!(zone.is_none());
    }
}
