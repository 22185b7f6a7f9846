//! Rating Service: binary entrypoint
//! Boots the Axum HTTP server behind the dashboard: composite ratings,
//! financial ratios, alerts and Prometheus metrics.

use shuttle_axum::ShuttleAxum;
use stock_rating_aggregator::{app_from_config, init_tracing, metrics::Metrics, AppConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::load_default()?;
    tracing::info!(
        sources = ?cfg.weights.sources().collect::<Vec<_>>(),
        cache_capacity = cfg.cache.capacity,
        timeout_secs = cfg.fetch.timeout_secs,
        "rating service config loaded"
    );

    let metrics = Metrics::init()?;
    let router = app_from_config(&cfg)?.merge(metrics.router());

    Ok(router.into())
}
