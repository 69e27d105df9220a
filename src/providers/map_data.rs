// src/providers/map_data.rs
//! Map-data service adapter. Surfaces points of interest near a center as
//! candidates; POIs tagged with an image become imagery candidates, the rest
//! keep their map page URL.

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::ProviderError;
use crate::providers::{http_client, read_body, transport, ProviderAdapter};
use crate::types::{CandidateResult, ContentQuery, Provider};

pub const ENV_BASE_URL: &str = "MAP_DATA_BASE_URL";
const DEFAULT_BASE_URL: &str = "https://mapdata.example";

const NAME: &str = "map-data";

#[derive(Debug, Deserialize)]
struct PoiPayload {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

pub struct MapDataProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl MapDataProvider {
    pub fn from_fixture(payload: &str) -> Self {
        Self {
            mode: Mode::Fixture(payload.to_string()),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            mode: Mode::Http {
                base_url,
                client: http_client(),
            },
        }
    }

    fn parse_payload(payload: &str, limit: usize) -> Result<Vec<CandidateResult>, ProviderError> {
        let parsed: PoiPayload =
            serde_json::from_str(payload).map_err(|e| ProviderError::Payload {
                provider: NAME,
                detail: e.to_string(),
            })?;

        let mut out = Vec::with_capacity(parsed.elements.len().min(limit));
        for el in parsed.elements.into_iter().take(limit) {
            let name = el.tags.get("name").cloned();
            let url = el
                .tags
                .get("image")
                .cloned()
                .unwrap_or_else(|| format!("https://www.openstreetmap.org/node/{}", el.id));
            let mut c = CandidateResult::new(Provider::MapData, el.id.to_string(), url);
            c.title = name.clone();
            c.location_name_hint = name;
            if let (Some(lat), Some(lon)) = (el.lat, el.lon) {
                c.coordinates = crate::geo::GeoPoint::new(lat, lon).ok();
            }
            out.push(c);
        }
        counter!("discovery_candidates_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl ProviderAdapter for MapDataProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn provider(&self) -> Provider {
        Provider::MapData
    }

    async fn fetch(
        &self,
        query: &ContentQuery,
        provider_limit: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        match &self.mode {
            Mode::Fixture(payload) => Self::parse_payload(payload, provider_limit),
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/pois");
                let mut params = vec![
                    ("q", query.text.clone()),
                    ("limit", provider_limit.to_string()),
                ];
                if let Some(center) = query.center {
                    params.push(("near", format!("{},{}", center.lat, center.lng)));
                }
                if let Some(radius) = query.radius_km {
                    params.push(("radius_km", radius.to_string()));
                }
                let resp = client
                    .get(&url)
                    .header("Accept", "application/json")
                    .query(&params)
                    .send()
                    .await
                    .map_err(|e| transport(NAME, e))?;
                let body = read_body(NAME, resp).await?;
                Self::parse_payload(&body, provider_limit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "elements": [
            {
                "id": 7001,
                "lat": 36.4618,
                "lon": 25.3753,
                "tags": {
                    "name": "Oia Castle",
                    "tourism": "attraction",
                    "image": "https://commons.example/oia-castle.jpg"
                }
            },
            {
                "id": 7002,
                "lat": 36.4202,
                "lon": 25.4317,
                "tags": { "name": "Akrotiri" }
            }
        ]
    }"#;

    #[test]
    fn tagged_image_becomes_asset_url_otherwise_map_page() {
        let out = MapDataProvider::parse_payload(FIXTURE, 10).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://commons.example/oia-castle.jpg");
        assert_eq!(out[1].url, "https://www.openstreetmap.org/node/7002");
        assert!(out[1].coordinates.is_some());
        assert_eq!(out[1].location_name_hint.as_deref(), Some("Akrotiri"));
    }

    #[test]
    fn malformed_payload_is_a_payload_error() {
        assert!(matches!(
            MapDataProvider::parse_payload("[]", 10),
            Err(ProviderError::Payload { .. })
        ));
    }
}
