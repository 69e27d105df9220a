// src/filter.rs
//! Keyword/metadata quality gate for candidate results.
//!
//! All rules are data, not code: the token blacklist, the engagement floor,
//! and the extension allow-list load from TOML with a built-in seed as
//! fallback. The predicate itself is deterministic and side-effect-free; it
//! never inspects image content.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::types::CandidateResult;

pub const DEFAULT_QUALITY_FILTER_PATH: &str = "config/quality_filter.toml";
pub const ENV_QUALITY_FILTER_PATH: &str = "QUALITY_FILTER_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
pub struct QualityFilterConfig {
    /// Tokens rejected anywhere in the URL or title (case-insensitive).
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Minimum provider-native engagement score. Candidates without a native
    /// score skip this check entirely.
    #[serde(default = "default_min_engagement")]
    pub min_engagement: f64,
    /// Allowed image file extensions. URLs whose path carries no extension
    /// (POI pages, CDN urls without a suffix) are not rejected by this rule.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_min_engagement() -> f64 {
    100.0
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl QualityFilterConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading quality filter config from {}", path.display()))?;
        toml::from_str(&content).context("parsing quality filter config")
    }

    /// Load using env var + fallback:
    /// 1) $QUALITY_FILTER_CONFIG_PATH
    /// 2) config/quality_filter.toml
    /// 3) built-in seed
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_QUALITY_FILTER_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!(
                "QUALITY_FILTER_CONFIG_PATH points to non-existent path"
            ));
        }
        let default = PathBuf::from(DEFAULT_QUALITY_FILTER_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default_seed())
    }

    /// Built-in token list covering monochrome assets, explicit content,
    /// people close-ups, low-light shots, and non-photographic containers.
    pub fn default_seed() -> Self {
        let blacklist = [
            "black-and-white",
            "black and white",
            "monochrome",
            "grayscale",
            "greyscale",
            "nsfw",
            "nude",
            "explicit",
            "xxx",
            "portrait",
            "selfie",
            "close-up",
            "closeup",
            "night",
            "nighttime",
            "gallery",
            "video",
            "youtube",
            "gif",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Self {
            blacklist,
            min_engagement: default_min_engagement(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

pub struct QualityFilter {
    blacklist: Vec<String>,
    min_engagement: f64,
    allowed_extensions: Vec<String>,
}

impl QualityFilter {
    pub fn new(config: QualityFilterConfig) -> Self {
        Self {
            blacklist: config
                .blacklist
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            min_engagement: config.min_engagement,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn from_default_config() -> Self {
        let cfg = QualityFilterConfig::load_default().unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "quality filter config unreadable, using seed");
            QualityFilterConfig::default_seed()
        });
        Self::new(cfg)
    }

    /// Deterministic accept/reject. False negatives are tolerable; a
    /// provider whose whole batch is rejected simply contributes nothing.
    pub fn is_acceptable(&self, candidate: &CandidateResult) -> bool {
        if candidate.nsfw {
            return false;
        }

        let url = candidate.url.to_lowercase();
        let title = candidate
            .title
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        if self
            .blacklist
            .iter()
            .any(|t| url.contains(t) || title.contains(t))
        {
            return false;
        }

        if let Some(score) = candidate.native_score {
            if score < self.min_engagement {
                return false;
            }
        }

        if let Some(ext) = url_extension(&url) {
            if !self.allowed_extensions.iter().any(|a| a == &ext) {
                return false;
            }
        }

        true
    }
}

/// Extension of the URL path, ignoring query string and fragment.
fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_lowercase())
}
