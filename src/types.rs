// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::GeoPoint;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 200;

pub const DEFAULT_RADIUS_KM: f64 = 100.0;
pub const MIN_RADIUS_KM: f64 = 1.0;
pub const MAX_RADIUS_KM: f64 = 500.0;

/// What kind of content the caller is assembling. Drives query shaping,
/// provider selection, and the cache TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryContext {
    Generic,
    Activity,
    Restaurant,
    Blog,
    LocationFeed,
}

impl QueryContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryContext::Generic => "generic",
            QueryContext::Activity => "activity",
            QueryContext::Restaurant => "restaurant",
            QueryContext::Blog => "blog",
            QueryContext::LocationFeed => "location-feed",
        }
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        QueryContext::Generic
    }
}

/// External content sources known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    ImageSearch,
    Community,
    StockPrimary,
    StockSecondary,
    Geocoder,
    MapData,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::ImageSearch => "image-search",
            Provider::Community => "community",
            Provider::StockPrimary => "stock-primary",
            Provider::StockSecondary => "stock-secondary",
            Provider::Geocoder => "geocoder",
            Provider::MapData => "map-data",
        }
    }
}

/// A validated discovery request. Construct via [`ContentQuery::new`] or
/// [`ContentQuery::location_feed`]; both reject bad input at the boundary
/// instead of clamping coordinates silently.
#[derive(Debug, Clone)]
pub struct ContentQuery {
    pub text: String,
    pub limit: usize,
    pub context: QueryContext,
    pub center: Option<GeoPoint>,
    pub radius_km: Option<f64>,
}

impl ContentQuery {
    pub fn new(text: &str, limit: usize, context: QueryContext) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ValidationError::LimitOutOfRange {
                got: limit,
                max: MAX_LIMIT,
            });
        }
        if context == QueryContext::LocationFeed {
            return Err(ValidationError::MissingCenter);
        }
        Ok(Self {
            text: text.to_string(),
            limit,
            context,
            center: None,
            radius_km: None,
        })
    }

    /// Location-scoped feed query. `radius_km` is clamped to the supported
    /// band; the center itself must already be a valid [`GeoPoint`].
    pub fn location_feed(
        text: &str,
        limit: usize,
        center: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ValidationError::LimitOutOfRange {
                got: limit,
                max: MAX_LIMIT,
            });
        }
        let radius = radius_km
            .unwrap_or(DEFAULT_RADIUS_KM)
            .clamp(MIN_RADIUS_KM, MAX_RADIUS_KM);
        Ok(Self {
            text: text.to_string(),
            limit,
            context: QueryContext::LocationFeed,
            center: Some(center),
            radius_km: Some(radius),
        })
    }

    /// Revalidate an already-built query. The constructors enforce all of
    /// this too; the engine checks again at its boundary because the fields
    /// are public.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(ValidationError::LimitOutOfRange {
                got: self.limit,
                max: MAX_LIMIT,
            });
        }
        if self.context == QueryContext::LocationFeed && self.center.is_none() {
            return Err(ValidationError::MissingCenter);
        }
        if self.radius_km.is_some() && self.center.is_none() {
            return Err(ValidationError::RadiusWithoutCenter);
        }
        Ok(())
    }
}

/// One unranked, unfiltered result from a provider adapter. Immutable once
/// constructed; every pipeline stage produces a new sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Provider-local identifier. Global identity for dedup is the
    /// normalized URL, or `(source_provider, id)` when the URL is empty.
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub source_provider: Provider,
    /// Provider-native engagement/quality signal, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name_hint: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
}

impl CandidateResult {
    /// Minimal candidate; optional metadata filled in by the adapters.
    pub fn new(provider: Provider, id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            thumbnail_url: None,
            title: None,
            source_provider: provider,
            native_score: None,
            width: None,
            height: None,
            published_at: None,
            coordinates: None,
            location_name_hint: None,
            nsfw: false,
        }
    }
}

/// A candidate plus its final priority score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub candidate: CandidateResult,
    pub priority_score: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rejects_empty_and_whitespace_text() {
        assert_eq!(
            ContentQuery::new("", 10, QueryContext::Generic).unwrap_err(),
            ValidationError::EmptyQuery
        );
        assert_eq!(
            ContentQuery::new("   ", 10, QueryContext::Generic).unwrap_err(),
            ValidationError::EmptyQuery
        );
    }

    #[test]
    fn query_rejects_limit_out_of_range() {
        assert!(matches!(
            ContentQuery::new("Lisbon", 0, QueryContext::Generic),
            Err(ValidationError::LimitOutOfRange { got: 0, .. })
        ));
        assert!(matches!(
            ContentQuery::new("Lisbon", 201, QueryContext::Generic),
            Err(ValidationError::LimitOutOfRange { got: 201, .. })
        ));
    }

    #[test]
    fn location_feed_requires_center_and_clamps_radius() {
        assert_eq!(
            ContentQuery::new("Paris", 10, QueryContext::LocationFeed).unwrap_err(),
            ValidationError::MissingCenter
        );

        let center = GeoPoint::new(48.8566, 2.3522).unwrap();
        let q = ContentQuery::location_feed("Paris", 10, center, Some(9000.0)).unwrap();
        assert_eq!(q.radius_km, Some(MAX_RADIUS_KM));
        let q = ContentQuery::location_feed("Paris", 10, center, None).unwrap();
        assert_eq!(q.radius_km, Some(DEFAULT_RADIUS_KM));
    }

    #[test]
    fn context_round_trips_kebab_case() {
        let ctx: QueryContext = serde_json::from_str("\"location-feed\"").unwrap();
        assert_eq!(ctx, QueryContext::LocationFeed);
        assert_eq!(ctx.as_str(), "location-feed");
    }
}
