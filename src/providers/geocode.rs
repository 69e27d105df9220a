// src/providers/geocode.rs
//! Geocoding service adapter. Returns place candidates with coordinates and
//! display names; the location-feed path leans on both.

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::providers::{http_client, read_body, transport, ProviderAdapter};
use crate::types::{CandidateResult, ContentQuery, Provider};

pub const ENV_BASE_URL: &str = "GEOCODER_BASE_URL";
const DEFAULT_BASE_URL: &str = "https://geocoder.example";

const NAME: &str = "geocoder";

// The service ships lat/lon as strings. Kept verbatim and parsed here.
#[derive(Debug, Deserialize)]
struct Place {
    place_id: u64,
    display_name: String,
    lat: String,
    lon: String,
}

pub struct GeocodeProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl GeocodeProvider {
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
        let places: Vec<Place> =
            serde_json::from_str(payload).map_err(|e| ProviderError::Payload {
                provider: NAME,
                detail: e.to_string(),
            })?;

        let mut out = Vec::with_capacity(places.len().min(limit));
        for place in places.into_iter().take(limit) {
            let (Ok(lat), Ok(lon)) = (place.lat.parse::<f64>(), place.lon.parse::<f64>()) else {
                // A place without usable coordinates is useless downstream.
                continue;
            };
            let url = format!("https://www.openstreetmap.org/?mlat={lat}&mlon={lon}");
            let mut c = CandidateResult::new(Provider::Geocoder, place.place_id.to_string(), url);
            c.coordinates = crate::geo::GeoPoint::new(lat, lon).ok();
            c.title = Some(place.display_name.clone());
            c.location_name_hint = Some(place.display_name);
            out.push(c);
        }
        counter!("discovery_candidates_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl ProviderAdapter for GeocodeProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn provider(&self) -> Provider {
        Provider::Geocoder
    }

    async fn fetch(
        &self,
        query: &ContentQuery,
        provider_limit: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        match &self.mode {
            Mode::Fixture(payload) => Self::parse_payload(payload, provider_limit),
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/search");
                let resp = client
                    .get(&url)
                    .header("Accept", "application/json")
                    .query(&[
                        ("q", query.text.clone()),
                        ("format", "json".to_string()),
                        ("limit", provider_limit.to_string()),
                    ])
                    .send()
                    .await
                    .map_err(|e| transport(NAME, e))?;
                let body = read_body(NAME, resp).await?;
                Self::parse_payload(&body, provider_limit)
            }
        }
    }
}
