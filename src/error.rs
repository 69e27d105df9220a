// src/error.rs
//! Error taxonomy for the discovery engine.
//!
//! Only `ValidationError` ever crosses the engine boundary as a failure.
//! Every `ProviderError` is caught by the aggregation loop, logged, counted,
//! and absorbed — a provider outage degrades to fewer results, never a 5xx.

use thiserror::Error;

/// Bad input from the caller. Surfaced as a 4xx-equivalent response.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("query text must not be empty")]
    EmptyQuery,

    #[error("limit must be between 1 and {max}, got {got}")]
    LimitOutOfRange { got: usize, max: usize },

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("location feed queries require a center point")]
    MissingCenter,

    #[error("radius_km is only meaningful together with a center point")]
    RadiusWithoutCenter,
}

/// One provider's failure for one request. Never fatal to the request.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: transport error: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider}: unexpected status {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider}: malformed payload: {detail}")]
    Payload {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider}: fetch timed out after {timeout_ms} ms")]
    Timeout {
        provider: &'static str,
        timeout_ms: u64,
    },

    /// Internal rate-limit queue overflow; treated like any other provider
    /// failure for the affected provider.
    #[error("{provider}: rate limit queue full")]
    RateLimitExceeded { provider: &'static str },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Transport { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Payload { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::RateLimitExceeded { provider } => provider,
        }
    }
}
