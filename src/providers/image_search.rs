// src/providers/image_search.rs
//! Web image search adapter. Highest-weight source for travel imagery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::providers::{http_client, read_body, shape_query, transport, ProviderAdapter};
use crate::types::{CandidateResult, ContentQuery, Provider};

pub const ENV_API_KEY: &str = "IMAGE_SEARCH_API_KEY";
pub const ENV_ENDPOINT: &str = "IMAGE_SEARCH_ENDPOINT";
const DEFAULT_ENDPOINT: &str = "https://api.imagesearch.example/v7/images/search";

const NAME: &str = "image-search";

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    value: Vec<SearchImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchImage {
    image_id: Option<String>,
    content_url: String,
    thumbnail_url: Option<String>,
    name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    date_published: Option<DateTime<Utc>>,
}

pub struct ImageSearchProvider {
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

impl ImageSearchProvider {
    pub fn from_fixture(payload: &str) -> Self {
        Self {
            mode: Mode::Fixture(payload.to_string()),
        }
    }

    /// `None` when the API key is absent; the engine then runs without this
    /// provider instead of failing boot.
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

        let mut out = Vec::with_capacity(parsed.value.len().min(limit));
        for img in parsed.value.into_iter().take(limit) {
            let id = img.image_id.unwrap_or_else(|| img.content_url.clone());
            let mut c = CandidateResult::new(Provider::ImageSearch, id, img.content_url);
            c.thumbnail_url = img.thumbnail_url;
            c.title = img.name;
            c.width = img.width;
            c.height = img.height;
            c.published_at = img.date_published;
            out.push(c);
        }
        counter!("discovery_candidates_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl ProviderAdapter for ImageSearchProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn provider(&self) -> Provider {
        Provider::ImageSearch
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
                    .header("X-Subscription-Key", api_key)
                    .query(&[
                        ("q", shape_query(query)),
                        ("count", provider_limit.to_string()),
                        ("safeSearch", "strict".to_string()),
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
        "value": [
            {
                "imageId": "abc123",
                "contentUrl": "https://cdn.imagesearch.example/santorini-caldera.jpg",
                "thumbnailUrl": "https://cdn.imagesearch.example/t/santorini-caldera.jpg",
                "name": "Santorini caldera at golden hour",
                "width": 1920,
                "height": 1080
            },
            {
                "contentUrl": "https://cdn.imagesearch.example/oia-windmill.jpg",
                "name": "Oia windmill"
            }
        ]
    }"#;

    #[test]
    fn parses_fixture_and_falls_back_to_url_id() {
        let out = ImageSearchProvider::parse_payload(FIXTURE, 10).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "abc123");
        assert_eq!(out[0].width, Some(1920));
        assert_eq!(out[1].id, "https://cdn.imagesearch.example/oia-windmill.jpg");
    }

    #[test]
    fn respects_provider_limit() {
        let out = ImageSearchProvider::parse_payload(FIXTURE, 1).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn malformed_payload_is_a_payload_error() {
        let err = ImageSearchProvider::parse_payload("<html>busy</html>", 10).unwrap_err();
        assert!(matches!(err, ProviderError::Payload { .. }));
    }

    #[test]
    fn empty_result_set_is_ok_not_error() {
        let out = ImageSearchProvider::parse_payload(r#"{"value": []}"#, 10).unwrap();
        assert!(out.is_empty());
    }
}
