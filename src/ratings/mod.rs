// src/ratings/mod.rs
//! Per-provider analyst rating shapes and the adapter contract.
//!
//! Every provider adapter turns its own payload into a [`RatingRecord`] on the
//! common 1–5 scale, or into an [`Unavailable`] value. The aggregator never
//! sees provider schemas and never distinguishes "no data" from "fetch failed".

pub mod providers;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lower and upper bound of the common "buy strength" scale.
pub const SCALE_MIN: f64 = 1.0;
pub const SCALE_MAX: f64 = 5.0;

/// External origin of an analyst rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Yahoo,
    TradingView,
    TipRanks,
    Polygon,
}

impl SourceId {
    pub const ALL: [SourceId; 4] = [
        SourceId::Yahoo,
        SourceId::TradingView,
        SourceId::TipRanks,
        SourceId::Polygon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Yahoo => "yahoo",
            SourceId::TradingView => "tradingview",
            SourceId::TipRanks => "tipranks",
            SourceId::Polygon => "polygon",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    /// Case-insensitive; tolerates separators ("Trading View", "trading_view").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "yahoo" | "yahoofinance" => Ok(SourceId::Yahoo),
            "tradingview" => Ok(SourceId::TradingView),
            "tipranks" => Ok(SourceId::TipRanks),
            "polygon" | "benzinga" => Ok(SourceId::Polygon),
            _ => Err(format!("unknown rating source: {s}")),
        }
    }
}

/// One provider's normalized rating for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub source: SourceId,
    /// On the 1–5 scale; absent when the provider answered without a score.
    pub score: Option<f64>,
    /// Number of underlying analyst opinions, when the provider reports it.
    pub sample_count: Option<u32>,
    /// Provider-specific extras (breakdown counts, labels). Opaque to the aggregator.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub raw_fields: BTreeMap<String, serde_json::Value>,
}

impl RatingRecord {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            score: None,
            sample_count: None,
            raw_fields: BTreeMap::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_sample_count(mut self, n: u32) -> Self {
        self.sample_count = Some(n);
        self
    }

    pub fn with_raw(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.raw_fields.insert(key.to_string(), value.into());
        self
    }

    /// A record carrying nothing at all is the same as no answer.
    pub fn is_empty(&self) -> bool {
        self.score.is_none() && self.sample_count.is_none() && self.raw_fields.is_empty()
    }
}

/// Why a source produced no record. All variants mean the same thing to the
/// aggregator; the reason only feeds logs and metrics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Unavailable {
    #[error("provider returned no usable rating")]
    NoData,
    #[error("provider credential not configured")]
    MissingCredential,
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("score {0} outside the 1-5 scale")]
    OutOfRange(f64),
    #[error("provider did not answer within {0} ms")]
    Timeout(u64),
}

impl Unavailable {
    /// Short label used as a metrics/log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Unavailable::NoData => "no_data",
            Unavailable::MissingCredential => "missing_credential",
            Unavailable::Http(_) => "http",
            Unavailable::Parse(_) => "parse",
            Unavailable::OutOfRange(_) => "out_of_range",
            Unavailable::Timeout(_) => "timeout",
        }
    }
}

impl From<reqwest::Error> for Unavailable {
    fn from(e: reqwest::Error) -> Self {
        // Query strings carry provider API keys.
        let e = e.without_url();
        if e.is_decode() {
            Unavailable::Parse(e.to_string())
        } else {
            Unavailable::Http(e.to_string())
        }
    }
}

pub type FetchOutcome = Result<RatingRecord, Unavailable>;

/// One external analyst-rating provider.
///
/// Implementations must contain every failure inside the returned
/// [`FetchOutcome`]; nothing a provider does may abort the caller.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceId;
    async fn fetch(&self, ticker: &str) -> FetchOutcome;
}

/// Accept a score only if it is finite and on the common scale.
pub fn check_scale(score: f64) -> Result<f64, Unavailable> {
    if score.is_finite() && (SCALE_MIN..=SCALE_MAX).contains(&score) {
        Ok(score)
    } else {
        Err(Unavailable::OutOfRange(score))
    }
}

/// Mirror a score on the 1–5 scale (1 ↔ 5, 2 ↔ 4, 3 stays).
pub fn invert_scale(score: f64) -> f64 {
    SCALE_MIN + SCALE_MAX - score
}

/// Round to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
