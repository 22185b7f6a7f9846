// src/ratings/providers/yahoo.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::ratings::{check_scale, invert_scale, FetchOutcome, RatingRecord, SourceAdapter, SourceId, Unavailable};

pub const YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    financial_data: Option<FinancialData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    #[serde(default)]
    recommendation_mean: Option<RawValue<f64>>,
    #[serde(default)]
    recommendation_key: Option<String>,
    #[serde(default)]
    number_of_analyst_opinions: Option<RawValue<u32>>,
}

/// Yahoo wraps numbers as `{"raw": 2.1, "fmt": "2.10"}`.
#[derive(Debug, Deserialize)]
struct RawValue<T> {
    #[serde(default)]
    raw: Option<T>,
}

/// Analyst consensus from Yahoo Finance `quoteSummary` (module `financialData`).
///
/// `recommendationMean` is 1 = strong buy … 5 = sell. By default the value is
/// passed through untouched; `with_inverted_scale(true)` mirrors it so that a
/// higher number means a stronger buy.
pub struct YahooAdapter {
    mode: Mode,
    invert: bool,
}

enum Mode {
    Fixture(String),
    Http { base_url: String, client: Client },
}

impl YahooAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, YAHOO_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            },
            invert: false,
        }
    }

    /// Serve a canned `quoteSummary` body instead of calling Yahoo.
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            invert: false,
        }
    }

    pub fn with_inverted_scale(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    fn parse(&self, body: &str) -> FetchOutcome {
        let resp: QuoteSummaryResponse =
            serde_json::from_str(body).map_err(|e| Unavailable::Parse(e.to_string()))?;

        let data = resp
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.financial_data)
            .ok_or(Unavailable::NoData)?;

        let mut rec = RatingRecord::new(SourceId::Yahoo);
        if let Some(mean) = data.recommendation_mean.and_then(|v| v.raw) {
            let mean = check_scale(mean)?;
            rec.score = Some(if self.invert { invert_scale(mean) } else { mean });
        }
        rec.sample_count = data.number_of_analyst_opinions.and_then(|v| v.raw);
        if let Some(key) = data.recommendation_key.filter(|k| !k.is_empty() && k != "none") {
            rec = rec.with_raw("recommendation_key", key);
        }

        if rec.is_empty() {
            return Err(Unavailable::NoData);
        }
        Ok(rec)
    }
}

#[async_trait]
impl SourceAdapter for YahooAdapter {
    fn source(&self) -> SourceId {
        SourceId::Yahoo
    }

    async fn fetch(&self, ticker: &str) -> FetchOutcome {
        match &self.mode {
            Mode::Fixture(body) => self.parse(body),
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/v10/finance/quoteSummary/{ticker}");
                let body = client
                    .get(&url)
                    .query(&[("modules", "financialData")])
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                self.parse(&body)
            }
        }
    }
}
