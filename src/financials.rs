//! Basic balance-sheet ratios (ROE, debt-to-equity) from the latest filing.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ratings::providers::polygon::POLYGON_BASE_URL;
use crate::ratings::round2;

/// The handful of statement lines the ratios need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statements {
    pub net_income: Option<f64>,
    pub stockholders_equity: Option<f64>,
    pub total_liabilities: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatios {
    /// Return on equity, percent.
    pub roe: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

impl FinancialRatios {
    pub fn from_statements(s: &Statements) -> Self {
        Self {
            roe: calculate_roe(s),
            debt_to_equity: calculate_debt_to_equity(s),
        }
    }
}

/// `net_income / equity × 100`, two decimals. `None` without positive equity.
pub fn calculate_roe(s: &Statements) -> Option<f64> {
    let equity = s.stockholders_equity.filter(|e| *e > 0.0)?;
    let ni = s.net_income?;
    Some(round2(ni / equity * 100.0))
}

/// `total_liabilities / equity`, two decimals. `None` without positive equity.
pub fn calculate_debt_to_equity(s: &Statements) -> Option<f64> {
    let equity = s.stockholders_equity.filter(|e| *e > 0.0)?;
    let liab = s.total_liabilities?;
    Some(round2(liab / equity))
}

/// Anything that can hand back the latest statements for a ticker.
#[async_trait::async_trait]
pub trait StatementsSource: Send + Sync {
    async fn fetch_statements(&self, ticker: &str) -> Result<Statements>;
}

#[derive(Debug, Deserialize)]
struct FinancialsResponse {
    #[serde(default)]
    results: Vec<FinancialsResult>,
}

#[derive(Debug, Deserialize)]
struct FinancialsResult {
    financials: FinancialsBlock,
}

#[derive(Debug, Deserialize)]
struct FinancialsBlock {
    #[serde(default)]
    income_statement: serde_json::Value,
    #[serde(default)]
    balance_sheet: serde_json::Value,
}

fn line(block: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| block.get(*k).and_then(|v| v.get("value")).and_then(|v| v.as_f64()))
}

/// Latest filing from Polygon `vX/reference/financials`.
pub struct PolygonFinancials {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PolygonFinancials {
    pub fn new(client: Client, api_key: String) -> Self {
        Self::with_base_url(client, POLYGON_BASE_URL, api_key)
    }

    pub fn with_base_url(client: Client, base_url: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn parse(body: &str) -> Result<Statements> {
        let resp: FinancialsResponse =
            serde_json::from_str(body).context("parsing polygon financials")?;
        let latest = resp
            .results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no filings returned"))?;
        let income = &latest.financials.income_statement;
        let balance = &latest.financials.balance_sheet;

        Ok(Statements {
            net_income: line(income, &["net_income_loss", "net_income_loss_attributable_to_parent"]),
            stockholders_equity: line(balance, &["equity_attributable_to_parent", "equity"]),
            total_liabilities: line(balance, &["liabilities"]),
        })
    }
}

#[async_trait::async_trait]
impl StatementsSource for PolygonFinancials {
    async fn fetch_statements(&self, ticker: &str) -> Result<Statements> {
        let url = format!("{}/vX/reference/financials", self.base_url);
        let body = self
            .client
            .get(&url)
            .query(&[
                ("ticker", ticker),
                ("timeframe", "quarterly"),
                ("limit", "1"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("polygon financials get()")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("polygon financials non-2xx")?
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("polygon financials .text()")?;
        Self::parse(&body)
    }
}
