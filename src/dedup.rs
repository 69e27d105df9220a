// src/dedup.rs
//! Order-preserving deduplication of candidates across providers.
//!
//! Canonical key: normalized URL (lowercased, query string and fragment
//! stripped) whenever a URL is present — that is what catches the same photo
//! surfaced by two providers. `(provider, id)` is the fallback for candidates
//! without a URL. One strategy, applied uniformly.

use std::collections::HashSet;

use url::Url;

use crate::types::{CandidateResult, Provider};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Url(String),
    ProviderId(Provider, String),
}

fn key_for(candidate: &CandidateResult) -> DedupKey {
    if candidate.url.trim().is_empty() {
        DedupKey::ProviderId(candidate.source_provider, candidate.id.clone())
    } else {
        DedupKey::Url(normalize_url(&candidate.url))
    }
}

/// Lowercase the URL and strip query string, fragment, and trailing slash.
/// Unparseable URLs are normalized textually so dedup still works on them.
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut u) => {
            u.set_query(None);
            u.set_fragment(None);
            u.as_str().trim_end_matches('/').to_lowercase()
        }
        Err(_) => raw.trim().trim_end_matches('/').to_lowercase(),
    }
}

/// Collapse duplicates, keeping the first-seen candidate of each identity.
/// Pure; O(n) with a seen-set.
pub fn dedupe(results: Vec<CandidateResult>) -> Vec<CandidateResult> {
    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(results.len());
    results
        .into_iter()
        .filter(|c| seen.insert(key_for(c)))
        .collect()
}
