//! # Rating Aggregator
//! Combines per-source analyst ratings into one weighted composite score.
//!
//! Policy: every configured adapter is asked once per ticker (through the
//! cache when one is attached). Sources that come back `Unavailable` are
//! dropped. The composite is the weighted mean over only the sources that
//! returned a score, so a missing source redistributes its share instead of
//! pulling the result toward zero. An aggregation in which nobody answered is
//! a normal result (`final_score = None`), not an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::RatingCache;
use crate::ratings::{round2, FetchOutcome, RatingRecord, SourceAdapter, SourceId, Unavailable};
use crate::source_weights::SourceWeights;

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(15);

static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\^?[A-Za-z0-9][A-Za-z0-9.\-=]{0,15}$").expect("static ticker regex"));

/// Rejected before any adapter is called.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("invalid ticker {0:?}")]
    InvalidInput(String),
}

/// Programmer/configuration mistakes caught when an [`Aggregator`] is built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("weight for {source_id} must be finite and non-negative, got {weight}")]
    InvalidWeight { source_id: SourceId, weight: f64 },
    #[error("no weight configured for source {0}")]
    MissingWeight(SourceId),
    #[error("source {0} configured more than once")]
    DuplicateSource(SourceId),
    #[error("no rating sources configured")]
    NoSources,
}

/// How much of the configured source set made it into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// Every configured source returned a record.
    Full,
    /// At least one configured source was unavailable.
    Partial,
    /// No source contributed a score; `final_score` is `None`.
    NoContribution,
}

/// One aggregation result. Built fresh per call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRating {
    pub ticker: String,
    pub final_score: Option<f64>,
    /// Records from every source that answered, in adapter order.
    pub contributions: Vec<(SourceId, RatingRecord)>,
    pub timestamp: DateTime<Utc>,
    pub degraded: bool,
    pub coverage: Coverage,
}

impl CompositeRating {
    /// Composite on a 0–100 scale (`final_score × 20`).
    pub fn percent_score(&self) -> Option<f64> {
        self.final_score.map(|s| round2(s * 20.0))
    }

    pub fn contribution(&self, source: SourceId) -> Option<&RatingRecord> {
        self.contributions
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, r)| r)
    }

    /// Same result ignoring the creation instant.
    pub fn same_rating(&self, other: &CompositeRating) -> bool {
        self.ticker == other.ticker
            && self.final_score == other.final_score
            && self.contributions == other.contributions
            && self.degraded == other.degraded
            && self.coverage == other.coverage
    }
}

/// Validate and trim a ticker. Syntax beyond a basic symbol shape is left to
/// the providers.
pub fn validate_ticker(raw: &str) -> Result<&str, AggregateError> {
    let t = raw.trim();
    if TICKER_RE.is_match(t) {
        Ok(t)
    } else {
        Err(AggregateError::InvalidInput(raw.to_string()))
    }
}

fn timeout_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    weights: SourceWeights,
    cache: Option<Arc<RatingCache>>,
    timeout: Duration,
}

impl Aggregator {
    /// Every adapter needs a valid weight, and each source may appear once.
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        weights: SourceWeights,
    ) -> Result<Self, ConfigError> {
        if adapters.is_empty() {
            return Err(ConfigError::NoSources);
        }
        weights.validate()?;

        let mut seen = HashSet::new();
        for a in &adapters {
            let s = a.source();
            if !seen.insert(s) {
                return Err(ConfigError::DuplicateSource(s));
            }
            if weights.weight_for(s).is_none() {
                return Err(ConfigError::MissingWeight(s));
            }
        }

        Ok(Self {
            adapters,
            weights,
            cache: None,
            timeout: DEFAULT_ADAPTER_TIMEOUT,
        })
    }

    pub fn with_cache(mut self, cache: Arc<RatingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sources(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|a| a.source()).collect()
    }

    pub fn cache(&self) -> Option<&Arc<RatingCache>> {
        self.cache.as_ref()
    }

    pub async fn aggregate(&self, ticker: &str) -> Result<CompositeRating, AggregateError> {
        let ticker = validate_ticker(ticker)?;
        counter!("rating_aggregations_total").increment(1);

        // 1) Ask every source; failures stay local to their adapter.
        let mut contributions = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let source = adapter.source();
            match self.fetch_one(adapter.as_ref(), ticker).await {
                Ok(rec) => contributions.push((source, rec)),
                Err(reason) => {
                    counter!("rating_adapter_unavailable_total", "source" => source.as_str())
                        .increment(1);
                    tracing::warn!(source = %source, ticker, reason = reason.kind(), detail = %reason, "source unavailable");
                }
            }
        }

        // 2) Weighted mean over the records that carry a score.
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for (source, rec) in &contributions {
            if let (Some(score), Some(w)) = (rec.score, self.weights.weight_for(*source)) {
                weighted_sum += score * w;
                total_weight += w;
            }
        }
        let final_score = (total_weight > 0.0).then(|| round2(weighted_sum / total_weight));

        let degraded = final_score.is_none() || contributions.len() < self.adapters.len();
        let coverage = match (final_score, degraded) {
            (None, _) => Coverage::NoContribution,
            (Some(_), true) => Coverage::Partial,
            (Some(_), false) => Coverage::Full,
        };
        if degraded {
            counter!("rating_degraded_total").increment(1);
        }

        tracing::info!(
            ticker,
            final_score = ?final_score,
            contributed = contributions.len(),
            configured = self.adapters.len(),
            degraded,
            "composite rating"
        );

        Ok(CompositeRating {
            ticker: ticker.to_string(),
            final_score,
            contributions,
            timestamp: Utc::now(),
            degraded,
            coverage,
        })
    }

    async fn fetch_one(&self, adapter: &dyn SourceAdapter, ticker: &str) -> FetchOutcome {
        let source = adapter.source();
        let timeout = self.timeout;
        let call = || async move {
            counter!("rating_adapter_calls_total", "source" => source.as_str()).increment(1);
            let t0 = Instant::now();
            let out = match tokio::time::timeout(timeout, adapter.fetch(ticker)).await {
                Ok(out) => out,
                Err(_) => Err(Unavailable::Timeout(timeout_ms(timeout))),
            };
            histogram!("rating_adapter_fetch_ms", "source" => source.as_str())
                .record(t0.elapsed().as_secs_f64() * 1_000.0);
            // An answer with nothing in it counts as no answer.
            match out {
                Ok(rec) if rec.is_empty() => Err(Unavailable::NoData),
                other => other,
            }
        };

        match &self.cache {
            Some(cache) => cache.get_or_fetch(source, ticker, call).await,
            None => call().await,
        }
    }
}
