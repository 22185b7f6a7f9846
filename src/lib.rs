// src/lib.rs
// Public library surface for the service binary, the batch updater and integration tests.

pub mod aggregator;
pub mod alerts;
pub mod api;
pub mod batch;
pub mod cache;
pub mod config;
pub mod financials;
pub mod metrics;
pub mod notify;
pub mod ratings;
pub mod source_weights;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{AggregateError, Aggregator, CompositeRating, ConfigError, Coverage};
pub use crate::api::{create_router, AppState};
pub use crate::cache::RatingCache;
pub use crate::config::AppConfig;
pub use crate::ratings::{RatingRecord, SourceAdapter, SourceId, Unavailable};
pub use crate::source_weights::SourceWeights;

use std::sync::Arc;
use std::time::Duration;

/// Build the aggregator described by `cfg`: one adapter per weighted source,
/// a shared cache of `cfg.cache.capacity` entries and the per-adapter timeout.
pub fn aggregator_from_config(cfg: &AppConfig) -> anyhow::Result<Aggregator> {
    let timeout = Duration::from_secs(cfg.fetch.timeout_secs.max(1));
    let client = ratings::providers::http_client(timeout, &cfg.fetch.user_agent);
    let adapters = ratings::providers::build_adapters(cfg, &client);

    let agg = Aggregator::new(adapters, cfg.weights.clone())?
        .with_cache(Arc::new(RatingCache::new(cfg.cache.capacity)))
        .with_timeout(timeout);
    Ok(agg)
}

/// Router with the rating API, financial ratios (when a Polygon key is set)
/// and no metrics endpoint. Used by tests and by the service entrypoint.
pub fn app_from_config(cfg: &AppConfig) -> anyhow::Result<axum::Router> {
    let aggregator = Arc::new(aggregator_from_config(cfg)?);
    let mut state = AppState::new(aggregator).with_thresholds(cfg.alerts);

    if let Some(key) = cfg.credentials.polygon_api_key.clone() {
        let timeout = Duration::from_secs(cfg.fetch.timeout_secs.max(1));
        let client = ratings::providers::http_client(timeout, &cfg.fetch.user_agent);
        state = state.with_statements(Arc::new(financials::PolygonFinancials::new(client, key)));
    }

    Ok(create_router(state))
}

/// Tracing setup shared by the binaries.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stock_rating_aggregator=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
