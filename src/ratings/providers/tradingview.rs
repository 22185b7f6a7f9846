// src/ratings/providers/tradingview.rs
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::ratings::{check_scale, FetchOutcome, RatingRecord, SourceAdapter, SourceId, Unavailable};

pub const TRADINGVIEW_BASE_URL: &str = "https://www.tradingview.com";

const SCORE_SELECTOR: &str = "div.analyst-ratings__score";
const COUNT_SELECTOR: &str = "div.analyst-ratings__count";

/// Scrapes the analyst score widget from a TradingView symbol page.
pub struct TradingViewAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { base_url: String, client: Client },
}

impl TradingViewAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, TRADINGVIEW_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            },
        }
    }

    pub fn from_fixture(html: &str) -> Self {
        Self {
            mode: Mode::Fixture(html.to_string()),
        }
    }
}

/// Sync on purpose: `Html` is not `Send` and must not live across an await.
fn parse_page(html: &str) -> FetchOutcome {
    let doc = Html::parse_document(html);

    let score_sel =
        Selector::parse(SCORE_SELECTOR).map_err(|e| Unavailable::Parse(e.to_string()))?;
    let text = doc
        .select(&score_sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or(Unavailable::NoData)?;

    let score: f64 = text
        .trim()
        .parse()
        .map_err(|_| Unavailable::Parse(format!("non-numeric score {:?}", text.trim())))?;

    let mut rec = RatingRecord::new(SourceId::TradingView).with_score(check_scale(score)?);

    // Optional "Based on 42 analysts" line.
    if let Ok(count_sel) = Selector::parse(COUNT_SELECTOR) {
        rec.sample_count = doc
            .select(&count_sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(|t| {
                t.split_whitespace()
                    .find_map(|w| w.trim_matches(|c: char| !c.is_ascii_digit()).parse().ok())
            });
    }

    Ok(rec)
}

#[async_trait]
impl SourceAdapter for TradingViewAdapter {
    fn source(&self) -> SourceId {
        SourceId::TradingView
    }

    async fn fetch(&self, ticker: &str) -> FetchOutcome {
        match &self.mode {
            Mode::Fixture(html) => parse_page(html),
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/symbols/{ticker}/");
                let html = client
                    .get(&url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                parse_page(&html)
            }
        }
    }
}
