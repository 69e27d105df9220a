// src/providers/community.rs
//! Social image host adapter. Queried once per sub-community per request,
//! which makes it the most quota-constrained source — the engine serializes
//! it through the shared `RateLimiter` (`rate_limited() == true`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;
use tracing::warn;

use crate::error::ProviderError;
use crate::providers::{http_client, read_body, shape_query, transport, ProviderAdapter};
use crate::types::{CandidateResult, ContentQuery, Provider};

pub const ENV_BASE_URL: &str = "COMMUNITY_BASE_URL";
const DEFAULT_BASE_URL: &str = "https://api.communityhost.example";

/// Travel-imagery sub-communities searched on every request.
pub const DEFAULT_COMMUNITIES: &[&str] = &["travelpics", "earthscapes", "cityscapes", "villages"];

const NAME: &str = "community";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: Option<String>,
    url: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    over_18: bool,
    created_utc: Option<f64>,
}

pub struct CommunityProvider {
    communities: Vec<String>,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl CommunityProvider {
    /// Fixture payload stands in for a single sub-community listing.
    pub fn from_fixture(payload: &str) -> Self {
        Self {
            communities: vec!["travelpics".to_string()],
            mode: Mode::Fixture(payload.to_string()),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            communities: DEFAULT_COMMUNITIES.iter().map(|s| s.to_string()).collect(),
            mode: Mode::Http {
                base_url,
                client: http_client(),
            },
        }
    }

    fn parse_listing(payload: &str, limit: usize) -> Result<Vec<CandidateResult>, ProviderError> {
        let listing: Listing =
            serde_json::from_str(payload).map_err(|e| ProviderError::Payload {
                provider: NAME,
                detail: e.to_string(),
            })?;

        let mut out = Vec::new();
        for child in listing.data.children.into_iter().take(limit) {
            let post = child.data;
            let Some(url) = post.url else {
                // Self-posts and galleries carry no direct asset URL.
                continue;
            };
            let mut c = CandidateResult::new(Provider::Community, post.id, url);
            c.thumbnail_url = post.thumbnail.filter(|t| t.starts_with("http"));
            // Post titles routinely name the place; that doubles as the
            // location hint for the geo fallback.
            c.location_name_hint = post.title.clone();
            c.title = post.title;
            c.native_score = Some(post.score);
            c.nsfw = post.over_18;
            c.published_at = post
                .created_utc
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts as i64, 0));
            out.push(c);
        }
        counter!("discovery_candidates_total").increment(out.len() as u64);
        Ok(out)
    }

    async fn fetch_community(
        &self,
        base_url: &str,
        client: &reqwest::Client,
        community: &str,
        query: &ContentQuery,
        limit: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        let url = format!("{base_url}/c/{community}/search.json");
        let resp = client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[
                ("q", shape_query(query)),
                ("limit", limit.to_string()),
                ("sort", "top".to_string()),
            ])
            .send()
            .await
            .map_err(|e| transport(NAME, e))?;
        let body = read_body(NAME, resp).await?;
        Self::parse_listing(&body, limit)
    }
}

#[async_trait]
impl ProviderAdapter for CommunityProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn provider(&self) -> Provider {
        Provider::Community
    }

    fn rate_limited(&self) -> bool {
        true
    }

    // One timeout's worth of budget per sub-community call.
    fn fetch_budget(&self) -> std::time::Duration {
        crate::providers::FETCH_TIMEOUT * self.communities.len().max(1) as u32
    }

    async fn fetch(
        &self,
        query: &ContentQuery,
        provider_limit: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        match &self.mode {
            Mode::Fixture(payload) => Self::parse_listing(payload, provider_limit),
            Mode::Http { base_url, client } => {
                // One upstream call per sub-community, sequentially; the
                // whole batch runs under a single rate-limiter permit.
                let per_community = (provider_limit / self.communities.len()).max(1);
                let mut out = Vec::new();
                let mut last_err = None;
                for community in &self.communities {
                    match self
                        .fetch_community(base_url, client, community, query, per_community)
                        .await
                    {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => {
                            warn!(community, error = %e, "sub-community fetch failed");
                            last_err = Some(e);
                        }
                    }
                }
                // Partial success still counts; only a full wipe is an error.
                match (out.is_empty(), last_err) {
                    (true, Some(e)) => Err(e),
                    _ => Ok(out),
                }
            }
        }
    }
}
