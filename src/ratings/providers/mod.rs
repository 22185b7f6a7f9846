// src/ratings/providers/mod.rs
pub mod polygon;
pub mod tipranks;
pub mod tradingview;
pub mod yahoo;

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::ratings::{SourceAdapter, SourceId};

pub use polygon::PolygonAdapter;
pub use tipranks::TipRanksAdapter;
pub use tradingview::TradingViewAdapter;
pub use yahoo::YahooAdapter;

/// Shared HTTP client for all providers.
pub fn http_client(timeout: Duration, user_agent: &str) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "falling back to default http client");
            Client::new()
        })
}

/// One adapter per source that has a weight in the config, in `SourceId` order.
pub fn build_adapters(cfg: &AppConfig, client: &Client) -> Vec<Arc<dyn SourceAdapter>> {
    cfg.weights
        .sources()
        .map(|source| -> Arc<dyn SourceAdapter> {
            match source {
                SourceId::Yahoo => Arc::new(
                    YahooAdapter::new(client.clone()).with_inverted_scale(cfg.yahoo.invert_scale),
                ),
                SourceId::TradingView => Arc::new(TradingViewAdapter::new(client.clone())),
                SourceId::TipRanks => Arc::new(TipRanksAdapter::new(
                    client.clone(),
                    cfg.credentials.tipranks_api_key.clone(),
                )),
                SourceId::Polygon => Arc::new(PolygonAdapter::new(
                    client.clone(),
                    cfg.credentials.polygon_api_key.clone(),
                )),
            }
        })
        .collect()
}
