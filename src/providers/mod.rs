// src/providers/mod.rs
//! Provider adapters: one per external content source, all behind
//! [`ProviderAdapter`]. Each adapter owns its request shaping and normalizes
//! the provider's payload into [`CandidateResult`]s. Zero results is a valid
//! `Ok`; only transport/status/payload problems are errors, and the engine
//! absorbs those per provider.

pub mod community;
pub mod geocode;
pub mod image_search;
pub mod map_data;
pub mod stock_primary;
pub mod stock_secondary;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{CandidateResult, ContentQuery, Provider, QueryContext};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const USER_AGENT: &str = "vista-aggregator/0.1 (travel imagery discovery)";

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn provider(&self) -> Provider;

    /// Providers with strict upstream quotas are serialized through the
    /// engine's `RateLimiter`; everything else fans out freely.
    fn rate_limited(&self) -> bool {
        false
    }

    /// Wall-clock budget the engine grants one `fetch` before abandoning it.
    /// Adapters that make several upstream calls per fetch widen this.
    fn fetch_budget(&self) -> Duration {
        FETCH_TIMEOUT
    }

    /// Fetch up to `provider_limit` candidates. An empty Vec is a valid
    /// answer, never an error. Adapters make one-shot calls; retry policy,
    /// if any, belongs to the caller of the whole engine.
    async fn fetch(
        &self,
        query: &ContentQuery,
        provider_limit: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError>;
}

/// Shared outbound client: fixed User-Agent, hard timeout, no retries.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Append disambiguating keywords to place-name queries.
///
/// Small place names are ambiguous on image search ("Paris" the person,
/// "Nice" the adjective). Generic and feed queries get travel keywords;
/// comma-qualified names ("Springfield, Illinois") get settlement keywords
/// instead, which works better for administratively-qualified villages.
pub(crate) fn shape_query(query: &ContentQuery) -> String {
    let text = query.text.trim();
    match query.context {
        QueryContext::Generic | QueryContext::LocationFeed => {
            if text.contains(',') {
                format!("{text} village town cityscape")
            } else {
                format!("{text} travel destination cityscape")
            }
        }
        QueryContext::Activity => format!("{text} outdoor activity"),
        QueryContext::Restaurant => format!("{text} restaurant food"),
        QueryContext::Blog => text.to_string(),
    }
}

/// Read the response body or map the failure onto the provider taxonomy.
pub(crate) async fn read_body(
    provider: &'static str,
    resp: reqwest::Response,
) -> Result<String, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
        });
    }
    resp.text()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })
}

pub(crate) fn transport(provider: &'static str, source: reqwest::Error) -> ProviderError {
    if source.is_timeout() {
        ProviderError::Timeout {
            provider,
            timeout_ms: FETCH_TIMEOUT.as_millis() as u64,
        }
    } else {
        ProviderError::Transport { provider, source }
    }
}
