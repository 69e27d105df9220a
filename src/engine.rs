// src/engine.rs
//! The aggregation engine: cache check, concurrent provider fan-out,
//! dedup → quality filter → rank (or geo filter for location feeds),
//! truncate, cache write.
//!
//! Failure semantics: only `ValidationError` fails a request. Every
//! `ProviderError` is logged, counted, and absorbed — a total provider
//! outage degrades to an empty but successful result.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::{self, CacheLayer};
use crate::dedup::dedupe;
use crate::error::{ProviderError, ValidationError};
use crate::filter::QualityFilter;
use crate::geo::filter_by_radius;
use crate::providers::ProviderAdapter;
use crate::ranking::{rank, ProviderWeights};
use crate::ratelimit::RateLimiter;
use crate::types::{CandidateResult, ContentQuery, Provider, QueryContext, RankedResult};

/// Location feeds fetch this many times the page size before the geo filter
/// thins the pool out.
pub const OVERSAMPLE_FACTOR: usize = 5;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "discovery_candidates_total",
            "Candidates parsed from provider payloads."
        );
        describe_counter!(
            "discovery_provider_errors_total",
            "Provider fetch/parse/timeout errors (absorbed, never fatal)."
        );
        describe_counter!("discovery_dedup_total", "Candidates removed as duplicates.");
        describe_counter!(
            "discovery_filtered_total",
            "Candidates rejected by the quality filter."
        );
        describe_counter!("discovery_cache_hits_total", "Discovery cache hits.");
        describe_counter!("discovery_cache_misses_total", "Discovery cache misses.");
        describe_histogram!(
            "discovery_provider_fetch_ms",
            "Per-provider fetch latency in milliseconds."
        );
    });
}

/// Final answer for one discovery request.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub results: Vec<RankedResult>,
    pub cached: bool,
}

pub struct AggregationEngine {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    limiter: Arc<RateLimiter>,
    cache: CacheLayer,
    filter: QualityFilter,
    weights: ProviderWeights,
}

impl AggregationEngine {
    pub fn new(
        providers: Vec<Arc<dyn ProviderAdapter>>,
        limiter: Arc<RateLimiter>,
        cache: CacheLayer,
        filter: QualityFilter,
        weights: ProviderWeights,
    ) -> Self {
        ensure_metrics_described();
        Self {
            providers,
            limiter,
            cache,
            filter,
            weights,
        }
    }

    /// Wire up every provider whose configuration is present. A missing API
    /// key disables that provider with a warn log instead of failing boot.
    pub fn from_env() -> Self {
        use crate::providers::{
            community::CommunityProvider, geocode::GeocodeProvider,
            image_search::ImageSearchProvider, map_data::MapDataProvider,
            stock_primary::StockPrimaryProvider, stock_secondary::StockSecondaryProvider,
        };

        let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
        match ImageSearchProvider::from_env() {
            Some(p) => providers.push(Arc::new(p)),
            None => warn!("image-search disabled: missing IMAGE_SEARCH_API_KEY"),
        }
        providers.push(Arc::new(CommunityProvider::from_env()));
        match StockPrimaryProvider::from_env() {
            Some(p) => providers.push(Arc::new(p)),
            None => warn!("stock-primary disabled: missing STOCK_PRIMARY_API_KEY"),
        }
        match StockSecondaryProvider::from_env() {
            Some(p) => providers.push(Arc::new(p)),
            None => warn!("stock-secondary disabled: missing STOCK_SECONDARY_API_KEY"),
        }
        providers.push(Arc::new(GeocodeProvider::from_env()));
        providers.push(Arc::new(MapDataProvider::from_env()));

        Self::new(
            providers,
            Arc::new(RateLimiter::default()),
            CacheLayer::in_memory(),
            QualityFilter::from_default_config(),
            ProviderWeights::load_default(),
        )
    }

    /// Serve one query: cache first, live aggregation on miss.
    pub async fn discover(&self, query: &ContentQuery) -> Result<Discovery, ValidationError> {
        query.validate()?;
        let key = cache::discovery_key(&query.text, query.limit, query.context);
        let ttl = cache::ttl::for_context(query.context);
        let (results, cached) = self
            .cache
            .get_or_compute(&key, ttl, || self.compute(query))
            .await;
        Ok(Discovery { results, cached })
    }

    /// Which providers serve this context. Location feeds want geo-capable
    /// sources plus the community host; everything else wants imagery.
    fn relevant_for(&self, context: QueryContext, provider: Provider) -> bool {
        match context {
            QueryContext::LocationFeed => matches!(
                provider,
                Provider::Geocoder | Provider::MapData | Provider::Community
            ),
            _ => matches!(
                provider,
                Provider::ImageSearch
                    | Provider::Community
                    | Provider::StockPrimary
                    | Provider::StockSecondary
            ),
        }
    }

    async fn compute(&self, query: &ContentQuery) -> Vec<RankedResult> {
        let is_feed = query.context == QueryContext::LocationFeed;
        let fetch_limit = if is_feed {
            query.limit.saturating_mul(OVERSAMPLE_FACTOR)
        } else {
            query.limit
        };

        let selected: Vec<Arc<dyn ProviderAdapter>> = self
            .providers
            .iter()
            .filter(|p| self.relevant_for(query.context, p.provider()))
            .cloned()
            .collect();

        // Slot per provider so completion order cannot leak into ranking:
        // candidates are flattened in configured provider order afterwards.
        let mut slots: Vec<Vec<CandidateResult>> = vec![Vec::new(); selected.len()];
        let mut set = JoinSet::new();

        for (slot, adapter) in selected.into_iter().enumerate() {
            let limiter = self.limiter.clone();
            let q = query.clone();
            set.spawn(async move {
                let started = Instant::now();
                let budget = adapter.fetch_budget();
                let fetched = if adapter.rate_limited() {
                    match limiter
                        .run(timeout(budget, adapter.fetch(&q, fetch_limit)))
                        .await
                    {
                        Err(_) => Err(ProviderError::RateLimitExceeded {
                            provider: adapter.name(),
                        }),
                        Ok(Err(_)) => Err(ProviderError::Timeout {
                            provider: adapter.name(),
                            timeout_ms: budget.as_millis() as u64,
                        }),
                        Ok(Ok(result)) => result,
                    }
                } else {
                    match timeout(budget, adapter.fetch(&q, fetch_limit)).await {
                        Err(_) => Err(ProviderError::Timeout {
                            provider: adapter.name(),
                            timeout_ms: budget.as_millis() as u64,
                        }),
                        Ok(result) => result,
                    }
                };
                (slot, adapter.name(), fetched, started.elapsed())
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((slot, name, Ok(batch), elapsed)) => {
                    histogram!("discovery_provider_fetch_ms")
                        .record(elapsed.as_secs_f64() * 1_000.0);
                    debug!(provider = name, count = batch.len(), "provider batch");
                    slots[slot] = batch;
                }
                Ok((_slot, name, Err(e), _elapsed)) => {
                    warn!(provider = name, error = %e, "provider error");
                    counter!("discovery_provider_errors_total").increment(1);
                }
                Err(e) => {
                    warn!(error = ?e, "provider task failed to join");
                    counter!("discovery_provider_errors_total").increment(1);
                }
            }
        }

        let candidates: Vec<CandidateResult> = slots.into_iter().flatten().collect();

        let before = candidates.len();
        let deduped = dedupe(candidates);
        counter!("discovery_dedup_total").increment((before - deduped.len()) as u64);

        let before = deduped.len();
        let kept: Vec<CandidateResult> = deduped
            .into_iter()
            .filter(|c| self.filter.is_acceptable(c))
            .collect();
        counter!("discovery_filtered_total").increment((before - kept.len()) as u64);

        let mut results = if is_feed {
            self.assemble_feed(query, kept)
        } else {
            rank(kept, &self.weights)
        };
        results.truncate(query.limit);
        results
    }

    /// Location feed: geo-scope the oversampled pool, newest first.
    fn assemble_feed(&self, query: &ContentQuery, pool: Vec<CandidateResult>) -> Vec<RankedResult> {
        let Some(center) = query.center else {
            // Unreachable after validation; an empty feed is the safe answer.
            return Vec::new();
        };
        let radius = query.radius_km.unwrap_or(crate::types::DEFAULT_RADIUS_KM);
        let mut scoped = filter_by_radius(pool, center, radius, Some(&query.text));
        // Stable sort: equal timestamps (and the None tail) keep discovery order.
        scoped.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        scoped
            .into_iter()
            .map(|candidate| RankedResult {
                priority_score: self.weights.weight_for(candidate.source_provider),
                candidate,
            })
            .collect()
    }
}
