// src/api.rs
//! HTTP surface for the discovery engine.
//!
//! Only a validation failure produces a 4xx. Anything else — provider
//! outages included — answers `success: true` with whatever results could
//! be assembled, because partial/empty results are an expected outcome.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::engine::AggregationEngine;
use crate::error::ValidationError;
use crate::geo::GeoPoint;
use crate::types::{ContentQuery, QueryContext, RankedResult, DEFAULT_LIMIT, MAX_LIMIT};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AggregationEngine>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/discover", post(discover))
        .route("/feed/location", post(feed_location))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub context: Option<QueryContext>,
    #[serde(default)]
    pub center: Option<CenterRequest>,
    #[serde(default)]
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CenterRequest {
    pub lat: f64,
    pub lng: f64,
}

#[derive(serde::Serialize)]
pub struct DiscoverResponse {
    pub success: bool,
    pub results: Vec<RankedResult>,
    pub count: usize,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiscoverResponse {
    fn ok(results: Vec<RankedResult>, cached: bool) -> Self {
        Self {
            success: true,
            count: results.len(),
            results,
            cached,
            error: None,
        }
    }

    fn invalid(err: &ValidationError) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            count: 0,
            cached: false,
            error: Some(err.to_string()),
        }
    }
}

fn build_query(req: &DiscoverRequest, force_feed: bool) -> Result<ContentQuery, ValidationError> {
    // Callers may ask for anything up to MAX_LIMIT; more is capped, not an
    // error — coordinates are the only thing we refuse to clamp.
    let limit = req.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let context = req.context.unwrap_or_default();

    let center = match &req.center {
        Some(c) => Some(GeoPoint::new(c.lat, c.lng)?),
        None => None,
    };

    if force_feed || context == QueryContext::LocationFeed {
        let center = center.ok_or(ValidationError::MissingCenter)?;
        return ContentQuery::location_feed(&req.query, limit, center, req.radius_km);
    }

    if req.radius_km.is_some() && center.is_none() {
        return Err(ValidationError::RadiusWithoutCenter);
    }
    let mut query = ContentQuery::new(&req.query, limit, context)?;
    query.center = center;
    query.radius_km = req.radius_km;
    Ok(query)
}

async fn run(state: &AppState, req: &DiscoverRequest, force_feed: bool) -> (StatusCode, Json<DiscoverResponse>) {
    let query = match build_query(req, force_feed) {
        Ok(q) => q,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(DiscoverResponse::invalid(&e))),
    };
    match state.engine.discover(&query).await {
        Ok(found) => (
            StatusCode::OK,
            Json(DiscoverResponse::ok(found.results, found.cached)),
        ),
        Err(e) => (StatusCode::BAD_REQUEST, Json(DiscoverResponse::invalid(&e))),
    }
}

async fn discover(
    State(state): State<AppState>,
    Json(req): Json<DiscoverRequest>,
) -> (StatusCode, Json<DiscoverResponse>) {
    run(&state, &req, false).await
}

async fn feed_location(
    State(state): State<AppState>,
    Json(req): Json<DiscoverRequest>,
) -> (StatusCode, Json<DiscoverResponse>) {
    run(&state, &req, true).await
}
