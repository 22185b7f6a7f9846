use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the rating series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        describe();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("rating_aggregations_total", "Composite rating requests.");
    describe_counter!(
        "rating_degraded_total",
        "Composite ratings built from fewer than all configured sources."
    );
    describe_counter!("rating_adapter_calls_total", "Provider fetches actually executed.");
    describe_counter!(
        "rating_adapter_unavailable_total",
        "Provider outcomes treated as unavailable."
    );
    describe_counter!("rating_cache_hits_total", "Rating lookups served from cache.");
    describe_counter!("rating_cache_misses_total", "Rating lookups that ran a fetch.");
    describe_counter!("rating_cache_evictions_total", "Least recently used entries dropped.");
    describe_histogram!("rating_adapter_fetch_ms", "Provider fetch time in milliseconds.");
}
