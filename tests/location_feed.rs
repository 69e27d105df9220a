// tests/location_feed.rs
//! The location-feed path: geo-radius scoping instead of provider ranking,
//! newest first.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use vista_aggregator::cache::CacheLayer;
use vista_aggregator::engine::AggregationEngine;
use vista_aggregator::error::ProviderError;
use vista_aggregator::filter::{QualityFilter, QualityFilterConfig};
use vista_aggregator::geo::GeoPoint;
use vista_aggregator::providers::ProviderAdapter;
use vista_aggregator::ranking::ProviderWeights;
use vista_aggregator::ratelimit::RateLimiter;
use vista_aggregator::types::{CandidateResult, ContentQuery, Provider};

struct PoiProvider {
    batch: Vec<CandidateResult>,
}

#[async_trait]
impl ProviderAdapter for PoiProvider {
    fn name(&self) -> &'static str {
        "map-data"
    }
    fn provider(&self) -> Provider {
        Provider::MapData
    }
    async fn fetch(
        &self,
        _query: &ContentQuery,
        _provider_limit: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        Ok(self.batch.clone())
    }
}

fn poi(id: &str, lat: f64, lng: f64, day: u32) -> CandidateResult {
    let mut c = CandidateResult::new(
        Provider::MapData,
        id,
        format!("https://maps.example.com/poi/{id}.jpg"),
    );
    c.coordinates = Some(GeoPoint::new(lat, lng).unwrap());
    c.published_at = Some(Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap());
    c
}

fn feed_engine(batch: Vec<CandidateResult>) -> AggregationEngine {
    AggregationEngine::new(
        vec![Arc::new(PoiProvider { batch })],
        Arc::new(RateLimiter::default()),
        CacheLayer::in_memory(),
        QualityFilter::new(QualityFilterConfig::default_seed()),
        ProviderWeights::default_seed(),
    )
}

#[tokio::test]
async fn feed_scopes_by_radius_and_sorts_newest_first() {
    let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
    let engine = feed_engine(vec![
        poi("older-near", 48.8606, 2.3376, 1),
        poi("lyon", 45.7640, 4.8357, 20),
        poi("newer-near", 48.8530, 2.3499, 9),
    ]);

    let q = ContentQuery::location_feed("Paris", 10, paris, Some(10.0)).unwrap();
    let out = engine.discover(&q).await.unwrap();

    let ids: Vec<&str> = out.results.iter().map(|r| r.candidate.id.as_str()).collect();
    assert_eq!(ids, vec!["newer-near", "older-near"]);
}

#[tokio::test]
async fn feed_paginates_after_filtering() {
    let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
    let batch: Vec<CandidateResult> = (1..=25)
        .map(|i| poi(&format!("p{i}"), 48.8566, 2.3522, (i % 28) as u32 + 1))
        .collect();
    let engine = feed_engine(batch);

    let q = ContentQuery::location_feed("Paris", 5, paris, Some(10.0)).unwrap();
    let out = engine.discover(&q).await.unwrap();
    assert_eq!(out.results.len(), 5);
    for pair in out.results.windows(2) {
        assert!(pair[0].candidate.published_at >= pair[1].candidate.published_at);
    }
}

#[tokio::test]
async fn feed_results_are_cached_like_discovery() {
    let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
    let engine = feed_engine(vec![poi("a", 48.8566, 2.3522, 3)]);

    let q = ContentQuery::location_feed("Paris", 10, paris, None).unwrap();
    assert!(!engine.discover(&q).await.unwrap().cached);
    assert!(engine.discover(&q).await.unwrap().cached);
}
