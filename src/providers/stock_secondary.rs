// src/providers/stock_secondary.rs
//! Secondary stock-photo service adapter. Community-uploaded stock with a
//! like count we pass through as the native engagement signal.

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::providers::{http_client, read_body, shape_query, transport, ProviderAdapter};
use crate::types::{CandidateResult, ContentQuery, Provider};

pub const ENV_API_KEY: &str = "STOCK_SECONDARY_API_KEY";
pub const ENV_ENDPOINT: &str = "STOCK_SECONDARY_ENDPOINT";
const DEFAULT_ENDPOINT: &str = "https://api.stockphoto-b.example/api/";

const NAME: &str = "stock-secondary";

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: u64,
    #[serde(rename = "largeImageURL")]
    large_image_url: String,
    #[serde(rename = "webformatURL")]
    webformat_url: Option<String>,
    tags: Option<String>,
    likes: Option<f64>,
    #[serde(rename = "imageWidth")]
    image_width: Option<u32>,
    #[serde(rename = "imageHeight")]
    image_height: Option<u32>,
}

pub struct StockSecondaryProvider {
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

impl StockSecondaryProvider {
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

        let mut out = Vec::with_capacity(parsed.hits.len().min(limit));
        for hit in parsed.hits.into_iter().take(limit) {
            let mut c = CandidateResult::new(
                Provider::StockSecondary,
                hit.id.to_string(),
                hit.large_image_url,
            );
            c.thumbnail_url = hit.webformat_url;
            c.title = hit.tags;
            c.native_score = hit.likes;
            c.width = hit.image_width;
            c.height = hit.image_height;
            out.push(c);
        }
        counter!("discovery_candidates_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl ProviderAdapter for StockSecondaryProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn provider(&self) -> Provider {
        Provider::StockSecondary
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
                    .query(&[
                        ("key", api_key.clone()),
                        ("q", shape_query(query)),
                        ("image_type", "photo".to_string()),
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
