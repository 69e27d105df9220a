// src/ranking.rs
//! # Provider Weights & Ranking
//!
//! Static, auditable per-provider priority weights for travel imagery.
//! Predictability and ease of tuning beat marginal relevance gains here, so
//! this is a fixed table rather than a learned model.
//!
//! - Loads from JSON config (`provider_weights.json`).
//! - Includes a built-in `default_seed()`.
//! - Ranking is a stable descending sort: ties keep discovery order.

use std::collections::HashMap;
use std::path::Path;
use std::{env, fs};

use serde::Deserialize;

use crate::types::{CandidateResult, Provider, RankedResult};

pub const DEFAULT_PROVIDER_WEIGHTS_PATH: &str = "config/provider_weights.json";
pub const ENV_PROVIDER_WEIGHTS_PATH: &str = "PROVIDER_WEIGHTS_PATH";

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderWeights {
    /// Weight when a provider is missing from the table.
    #[serde(default = "default_default_weight")]
    pub default_weight: i32,
    /// Weights keyed by the provider's kebab-case name.
    #[serde(default)]
    pub weights: HashMap<String, i32>,
}

fn default_default_weight() -> i32 {
    50
}

impl ProviderWeights {
    /// Load from a JSON file, falling back to `default_seed()` on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Env-var path override, then the conventional config path, then seed.
    pub fn load_default() -> Self {
        let path = env::var(ENV_PROVIDER_WEIGHTS_PATH)
            .unwrap_or_else(|_| DEFAULT_PROVIDER_WEIGHTS_PATH.to_string());
        Self::load_from_file(path)
    }

    pub fn default_seed() -> Self {
        let mut weights = HashMap::new();
        for (k, v) in [
            ("image-search", 100),
            ("community", 90),
            ("stock-primary", 80),
            ("stock-secondary", 70),
            ("geocoder", 60),
            ("map-data", 50),
        ] {
            weights.insert(k.to_string(), v);
        }
        Self {
            default_weight: default_default_weight(),
            weights,
        }
    }

    pub fn weight_for(&self, provider: Provider) -> i32 {
        self.weights
            .get(provider.as_str())
            .copied()
            .unwrap_or(self.default_weight)
    }
}

/// Assign per-provider priority scores and produce a total order: descending
/// by score, stable on ties (discovery order preserved, never random).
pub fn rank(results: Vec<CandidateResult>, weights: &ProviderWeights) -> Vec<RankedResult> {
    let mut ranked: Vec<RankedResult> = results
        .into_iter()
        .map(|candidate| {
            let priority_score = weights.weight_for(candidate.source_provider);
            RankedResult {
                candidate,
                priority_score,
            }
        })
        .collect();
    // Vec::sort_by is stable, which is what keeps ties in discovery order.
    ranked.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    ranked
}
