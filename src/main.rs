//! Travel Imagery Discovery Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the aggregation engine, metrics,
//! and middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vista_aggregator::cache::ttl;
use vista_aggregator::metrics::Metrics;
use vista_aggregator::{create_router, AggregationEngine, AppState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments. This is what
    // carries the provider API keys and config path overrides.
    let _ = dotenvy::dotenv();

    init_tracing();

    let metrics = Metrics::init(ttl::DISCOVERY.as_secs());

    let engine = Arc::new(AggregationEngine::from_env());
    let router = create_router(AppState { engine }).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "vista-aggregator listening");
    axum::serve(listener, router).await?;
    Ok(())
}
