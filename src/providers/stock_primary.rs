// src/providers/stock_primary.rs
//! Primary stock-photo service adapter (curated, key-authenticated API).

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::providers::{http_client, read_body, shape_query, transport, ProviderAdapter};
use crate::types::{CandidateResult, ContentQuery, Provider};

pub const ENV_API_KEY: &str = "STOCK_PRIMARY_API_KEY";
pub const ENV_ENDPOINT: &str = "STOCK_PRIMARY_ENDPOINT";
const DEFAULT_ENDPOINT: &str = "https://api.stockphoto-a.example/v1/search";

const NAME: &str = "stock-primary";

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: u64,
    width: Option<u32>,
    height: Option<u32>,
    alt: Option<String>,
    src: PhotoSrc,
}

#[derive(Debug, Deserialize)]
struct PhotoSrc {
    large: String,
    medium: Option<String>,
}

pub struct StockPrimaryProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        endpoint: String,
        api_key: String,
        client: reqwest::Client,
    },
}

impl StockPrimaryProvider {
    pub fn from_fixture(payload: &str) -> Self {
        Self {
            mode: Mode::Fixture(payload.to_string()),
        }
    }

    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(ENV_API_KEY).ok()?;
        let endpoint =
            std::env::var(ENV_ENDPOINT).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Some(Self {
            mode: Mode::Http {
                endpoint,
                api_key,
                client: http_client(),
            },
        })
    }

    fn parse_payload(payload: &str, limit: usize) -> Result<Vec<CandidateResult>, ProviderError> {
        let parsed: SearchPayload =
            serde_json::from_str(payload).map_err(|e| ProviderError::Payload {
                provider: NAME,
                detail: e.to_string(),
            })?;

        let mut out = Vec::with_capacity(parsed.photos.len().min(limit));
        for photo in parsed.photos.into_iter().take(limit) {
            let mut c =
                CandidateResult::new(Provider::StockPrimary, photo.id.to_string(), photo.src.large);
            c.thumbnail_url = photo.src.medium;
            c.title = photo.alt;
            c.width = photo.width;
            c.height = photo.height;
            out.push(c);
        }
        counter!("discovery_candidates_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl ProviderAdapter for StockPrimaryProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn provider(&self) -> Provider {
        Provider::StockPrimary
    }

    async fn fetch(
        &self,
        query: &ContentQuery,
        provider_limit: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        match &self.mode {
            Mode::Fixture(payload) => Self::parse_payload(payload, provider_limit),
            Mode::Http {
                endpoint,
                api_key,
                client,
            } => {
                let resp = client
                    .get(endpoint)
                    .header("Accept", "application/json")
                    .header("Authorization", api_key)
                    .query(&[
                        ("query", shape_query(query)),
                        ("per_page", provider_limit.to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "photos": [
            {
                "id": 91230,
                "width": 4000,
                "height": 2600,
                "alt": "White houses on a cliff",
                "src": {
                    "large": "https://images.stockphoto-a.example/91230/large.jpg",
                    "medium": "https://images.stockphoto-a.example/91230/medium.jpg"
                }
            }
        ]
    }"#;

    #[test]
    fn parses_photos_with_numeric_ids() {
        let out = StockPrimaryProvider::parse_payload(FIXTURE, 10).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "91230");
        assert_eq!(out[0].source_provider, Provider::StockPrimary);
        assert!(out[0].native_score.is_none());
    }

    #[test]
    fn empty_and_malformed_payloads_are_distinguished() {
        assert!(StockPrimaryProvider::parse_payload(r#"{"photos": []}"#, 10)
            .unwrap()
            .is_empty());
        assert!(matches!(
            StockPrimaryProvider::parse_payload("not json", 10),
            Err(ProviderError::Payload { .. })
        ));
    }
}
