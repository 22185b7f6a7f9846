// src/ratings/providers/tipranks.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::ratings::{check_scale, FetchOutcome, RatingRecord, SourceAdapter, SourceId, Unavailable};

pub const TIPRANKS_BASE_URL: &str = "https://www.tipranks.com";

#[derive(Debug, Deserialize)]
struct StockData {
    #[serde(default)]
    consensus: Option<Consensus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Consensus {
    /// 1 (strong sell) … 5 (strong buy).
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    num_of_analysts: Option<u32>,
    #[serde(default)]
    buy: Option<u32>,
    #[serde(default)]
    hold: Option<u32>,
    #[serde(default)]
    sell: Option<u32>,
    #[serde(default)]
    rating: Option<String>,
}

/// TipRanks analyst consensus. Needs an API key; without one every fetch is
/// `MissingCredential` and no request is made.
pub struct TipRanksAdapter {
    mode: Mode,
    api_key: Option<String>,
}

enum Mode {
    Fixture(String),
    Http { base_url: String, client: Client },
}

impl TipRanksAdapter {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, TIPRANKS_BASE_URL, api_key)
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
        let data: StockData =
            serde_json::from_str(body).map_err(|e| Unavailable::Parse(e.to_string()))?;
        let c = data.consensus.ok_or(Unavailable::NoData)?;

        let mut rec = RatingRecord::new(SourceId::TipRanks);
        if let Some(score) = c.score {
            rec.score = Some(check_scale(score)?);
        }
        rec.sample_count = c.num_of_analysts;
        for (key, value) in [("buy", c.buy), ("hold", c.hold), ("sell", c.sell)] {
            if let Some(v) = value {
                rec = rec.with_raw(key, v);
            }
        }
        if let Some(label) = c.rating {
            rec = rec.with_raw("rating", label);
        }

        if rec.is_empty() {
            return Err(Unavailable::NoData);
        }
        Ok(rec)
    }
}

#[async_trait]
impl SourceAdapter for TipRanksAdapter {
    fn source(&self) -> SourceId {
        SourceId::TipRanks
    }

    async fn fetch(&self, ticker: &str) -> FetchOutcome {
        let Some(key) = self.api_key.as_deref() else {
            return Err(Unavailable::MissingCredential);
        };

        match &self.mode {
            Mode::Fixture(body) => Self::parse(body),
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/api/stocks/getData/");
                let body = client
                    .get(&url)
                    .query(&[("name", ticker), ("apiKey", key)])
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
