// src/ratings/providers/polygon.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::ratings::{check_scale, round2, FetchOutcome, RatingRecord, SourceAdapter, SourceId, Unavailable};

pub const POLYGON_BASE_URL: &str = "https://api.polygon.io";

#[derive(Debug, Deserialize)]
struct ConsensusResponse {
    #[serde(default)]
    results: Vec<ConsensusResult>,
}

#[derive(Debug, Deserialize)]
struct ConsensusResult {
    #[serde(default)]
    consensus_rating: Option<String>,
    #[serde(default)]
    consensus_price_target: Option<f64>,
    #[serde(default)]
    buy_count: Option<u32>,
    #[serde(default)]
    hold_count: Option<u32>,
    #[serde(default)]
    sell_count: Option<u32>,
    #[serde(default)]
    contributors: Option<u32>,
}

/// Benzinga consensus ratings served through Polygon.
///
/// The score is the mean of the buy/hold/sell breakdown weighted 5/3/1; when
/// no breakdown is reported the consensus label is mapped instead.
pub struct PolygonAdapter {
    mode: Mode,
    api_key: Option<String>,
}

enum Mode {
    Fixture(String),
    Http { base_url: String, client: Client },
}

impl PolygonAdapter {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, POLYGON_BASE_URL, api_key)
    }

    pub fn with_base_url(client: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            },
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn from_fixture(body: &str, api_key: Option<String>) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn parse(body: &str) -> FetchOutcome {
        let resp: ConsensusResponse =
            serde_json::from_str(body).map_err(|e| Unavailable::Parse(e.to_string()))?;
        let r = resp.results.into_iter().next().ok_or(Unavailable::NoData)?;

        let (buy, hold, sell) = (
            r.buy_count.unwrap_or(0),
            r.hold_count.unwrap_or(0),
            r.sell_count.unwrap_or(0),
        );
        let total = buy.saturating_add(hold).saturating_add(sell);

        let score = if total > 0 {
            Some(round2(
                (5.0 * buy as f64 + 3.0 * hold as f64 + sell as f64) / total as f64,
            ))
        } else {
            r.consensus_rating.as_deref().and_then(label_score)
        };

        let mut rec = RatingRecord::new(SourceId::Polygon);
        if let Some(s) = score {
            rec.score = Some(check_scale(s)?);
        }
        rec.sample_count = r.contributors.or((total > 0).then_some(total));
        if total > 0 {
            rec = rec
                .with_raw("buy", buy)
                .with_raw("hold", hold)
                .with_raw("sell", sell);
        }
        if let Some(label) = r.consensus_rating {
            rec = rec.with_raw("consensus_rating", label);
        }
        if let Some(pt) = r.consensus_price_target {
            rec = rec.with_raw("consensus_price_target", pt);
        }

        if rec.is_empty() {
            return Err(Unavailable::NoData);
        }
        Ok(rec)
    }
}

fn label_score(label: &str) -> Option<f64> {
    let norm = label.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match norm.as_str() {
        "strong_buy" => Some(5.0),
        "buy" | "outperform" | "overweight" => Some(4.0),
        "hold" | "neutral" => Some(3.0),
        "sell" | "underperform" | "underweight" => Some(2.0),
        "strong_sell" => Some(1.0),
        _ => None,
    }
}

#[async_trait]
impl SourceAdapter for PolygonAdapter {
    fn source(&self) -> SourceId {
        SourceId::Polygon
    }

    async fn fetch(&self, ticker: &str) -> FetchOutcome {
        let Some(key) = self.api_key.as_deref() else {
            return Err(Unavailable::MissingCredential);
        };

        match &self.mode {
            Mode::Fixture(body) => Self::parse(body),
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/benzinga/v1/consensus-ratings/{ticker}");
                let body = client
                    .get(&url)
                    .query(&[("apiKey", key)])
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                Self::parse(&body)
            }
        }
    }
}
