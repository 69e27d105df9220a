// tests/api_http.rs
//! In-process HTTP tests for the discovery API: envelope shape, validation
//! failures, and cache diagnostics.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot
use vista_aggregator::api::{create_router, AppState};
use vista_aggregator::cache::CacheLayer;
use vista_aggregator::engine::AggregationEngine;
use vista_aggregator::filter::{QualityFilter, QualityFilterConfig};
use vista_aggregator::providers::image_search::ImageSearchProvider;
use vista_aggregator::providers::ProviderAdapter;
use vista_aggregator::ranking::ProviderWeights;
use vista_aggregator::ratelimit::RateLimiter;

const IMAGE_SEARCH_FIXTURE: &str = r#"{
    "value": [
        {
            "imageId": "f1",
            "contentUrl": "https://cdn.imagesearch.example/caldera.jpg",
            "name": "Caldera view"
        },
        {
            "imageId": "f2",
            "contentUrl": "https://cdn.imagesearch.example/harbor.jpg",
            "name": "Old harbor"
        }
    ]
}"#;

fn app() -> Router {
    let providers: Vec<Arc<dyn ProviderAdapter>> = vec![Arc::new(
        ImageSearchProvider::from_fixture(IMAGE_SEARCH_FIXTURE),
    )];
    let engine = AggregationEngine::new(
        providers,
        Arc::new(RateLimiter::default()),
        CacheLayer::in_memory(),
        QualityFilter::new(QualityFilterConfig::default_seed()),
        ProviderWeights::default_seed(),
    );
    create_router(AppState {
        engine: Arc::new(engine),
    })
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request build");
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

#[tokio::test]
async fn health_answers_ok() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn discover_returns_success_envelope() {
    let app = app();
    let (status, body) = post_json(&app, "/discover", json!({"query": "Santorini"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["cached"], json!(false));
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn second_identical_request_reports_cached() {
    let app = app();
    let (_, first) = post_json(&app, "/discover", json!({"query": "Santorini"})).await;
    let (_, second) = post_json(&app, "/discover", json!({"query": "  santorini "})).await;
    assert_eq!(second["cached"], json!(true));
    assert_eq!(first["results"], second["results"]);
}

#[tokio::test]
async fn empty_query_is_a_client_error() {
    let app = app();
    let (status, body) = post_json(&app, "/discover", json!({"query": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn feed_without_center_is_a_client_error() {
    let app = app();
    let (status, body) = post_json(&app, "/feed/location", json!({"query": "Paris"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("center"));
}

#[tokio::test]
async fn out_of_range_coordinates_are_rejected_not_clamped() {
    let app = app();
    let (status, body) = post_json(
        &app,
        "/feed/location",
        json!({"query": "Paris", "center": {"lat": 123.0, "lng": 2.35}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("latitude"));
}
