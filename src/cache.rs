// src/cache.rs
//! Memoization layer for finished discovery results.
//!
//! Key derivation and TTLs live here so every cache key format in the
//! process is auditable in one place. The store itself sits behind
//! [`KeyValueStore`]; a store failure degrades to a live compute with a
//! warn log, never to a failed request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::counter;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::warn;

use crate::types::{QueryContext, RankedResult};

/// TTL table. Discovery results change slowly; provider quota pressure is
/// the binding constraint, not freshness.
pub mod ttl {
    use std::time::Duration;

    pub const DISCOVERY: Duration = Duration::from_secs(24 * 60 * 60);
    pub const LOCATION_FEED: Duration = Duration::from_secs(60 * 60);

    pub fn for_context(context: super::QueryContext) -> Duration {
        match context {
            super::QueryContext::LocationFeed => LOCATION_FEED,
            _ => DISCOVERY,
        }
    }
}

/// Deterministic key for a logical query: lower-cased, whitespace-collapsed
/// text plus limit and context, hashed so incidental formatting differences
/// can never produce distinct keys.
pub fn discovery_key(text: &str, limit: usize, context: QueryContext) -> String {
    let normalized = text
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update([0u8]);
    hasher.update(limit.to_le_bytes());
    hasher.update(context.as_str().as_bytes());
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(24);
    for b in digest.iter().take(12) {
        use std::fmt::Write as _;
        let _ = write!(&mut hex, "{:02x}", b);
    }
    format!("discovery:v1:{}:{}", context.as_str(), hex)
}

/// Minimal contract any backing store must offer: `get` and `set` with TTL.
/// Expiry belongs to the store; the engine never evicts explicitly.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;
}

/// Process-local TTL store. Entries expire lazily on read.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let expired = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.entries.write().await.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}

#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn KeyValueStore>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    /// Return the cached value for `key`, or run `compute`, store the result
    /// under `ttl`, and return it. The bool is the cache-hit flag. A hit
    /// skips the compute entirely — including every provider call behind it.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> (Vec<RankedResult>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<RankedResult>>,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<RankedResult>>(&raw) {
                Ok(results) => {
                    counter!("discovery_cache_hits_total").increment(1);
                    return (results, true);
                }
                Err(e) => {
                    warn!(error = ?e, key, "cache entry undecodable, recomputing");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(error = ?e, key, "cache store unavailable, computing live");
            }
        }

        counter!("discovery_cache_misses_total").increment(1);
        let results = compute().await;

        match serde_json::to_string(&results) {
            Ok(raw) => {
                if let Err(e) = self.store.set(key, raw, ttl).await {
                    warn!(error = ?e, key, "cache write failed, serving live result");
                }
            }
            Err(e) => warn!(error = ?e, key, "cache serialization failed"),
        }

        (results, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateResult, Provider};

    fn ranked(id: &str) -> Vec<RankedResult> {
        vec![RankedResult {
            candidate: CandidateResult::new(
                Provider::ImageSearch,
                id,
                format!("https://cdn.example/{id}.jpg"),
            ),
            priority_score: 100,
        }]
    }

    #[test]
    fn key_ignores_case_and_incidental_whitespace() {
        let a = discovery_key("  Santorini   Greece ", 10, QueryContext::Generic);
        let b = discovery_key("santorini greece", 10, QueryContext::Generic);
        assert_eq!(a, b);
    }

    #[test]
    fn key_separates_limit_and_context() {
        let base = discovery_key("santorini", 10, QueryContext::Generic);
        assert_ne!(base, discovery_key("santorini", 20, QueryContext::Generic));
        assert_ne!(base, discovery_key("santorini", 10, QueryContext::Blog));
    }

    #[tokio::test]
    async fn miss_then_hit_without_recompute() {
        let cache = CacheLayer::in_memory();
        let key = discovery_key("kyoto", 5, QueryContext::Generic);

        let (first, hit) = cache
            .get_or_compute(&key, ttl::DISCOVERY, || async { ranked("k1") })
            .await;
        assert!(!hit);

        let (second, hit) = cache
            .get_or_compute(&key, ttl::DISCOVERY, || async {
                panic!("must not recompute on hit")
            })
            .await;
        assert!(hit);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let cache = CacheLayer::in_memory();
        let key = discovery_key("oslo", 5, QueryContext::Generic);

        let _ = cache
            .get_or_compute(&key, Duration::from_millis(10), || async { ranked("old") })
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let (fresh, hit) = cache
            .get_or_compute(&key, ttl::DISCOVERY, || async { ranked("new") })
            .await;
        assert!(!hit);
        assert_eq!(fresh[0].candidate.id, "new");
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("store down"))
        }
        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("store down"))
        }
    }

    #[tokio::test]
    async fn store_failure_degrades_to_live_compute() {
        let cache = CacheLayer::new(Arc::new(BrokenStore));
        let (results, hit) = cache
            .get_or_compute("k", ttl::DISCOVERY, || async { ranked("live") })
            .await;
        assert!(!hit);
        assert_eq!(results[0].candidate.id, "live");
    }
}
