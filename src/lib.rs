// src/lib.rs
// Public library surface for integration tests (and the server binary).

pub mod api;
pub mod cache;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod filter;
pub mod geo;
pub mod metrics;
pub mod providers;
pub mod ranking;
pub mod ratelimit;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::engine::{AggregationEngine, Discovery};
pub use crate::types::{CandidateResult, ContentQuery, Provider, QueryContext, RankedResult};
