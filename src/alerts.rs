//! Threshold alerts over a composite rating and balance-sheet ratios.
//!
//! A value that is missing never trips its predicate: no rating means no
//! strong-buy check, no ROE means no low-ROE check.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::financials::FinancialRatios;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Composite score at or above which a strong-buy alert fires.
    pub strong_buy: f64,
    /// ROE (percent) below which a low-return alert fires.
    pub min_roe: f64,
    /// Debt-to-equity above which a leverage alert fires.
    pub max_debt_to_equity: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            strong_buy: 4.5,
            min_roe: 5.0,
            max_debt_to_equity: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    StrongBuy,
    LowRoe,
    HighLeverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub ticker: String,
    /// The value that tripped the threshold.
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub fn check_alerts(
    ticker: &str,
    final_score: Option<f64>,
    ratios: Option<&FinancialRatios>,
    th: &AlertThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(score) = final_score.filter(|s| *s >= th.strong_buy) {
        alerts.push(Alert {
            kind: AlertKind::StrongBuy,
            ticker: ticker.to_string(),
            value: score,
            threshold: th.strong_buy,
            message: format!("{ticker}: strong buy consensus (composite {score:.2} >= {:.2})", th.strong_buy),
        });
    }

    let ratios = ratios.copied().unwrap_or_default();

    if let Some(roe) = ratios.roe.filter(|r| *r < th.min_roe) {
        alerts.push(Alert {
            kind: AlertKind::LowRoe,
            ticker: ticker.to_string(),
            value: roe,
            threshold: th.min_roe,
            message: format!("{ticker}: low return on equity (ROE {roe:.2}% < {:.2}%)", th.min_roe),
        });
    }

    if let Some(de) = ratios.debt_to_equity.filter(|d| *d > th.max_debt_to_equity) {
        alerts.push(Alert {
            kind: AlertKind::HighLeverage,
            ticker: ticker.to_string(),
            value: de,
            threshold: th.max_debt_to_equity,
            message: format!(
                "{ticker}: high debt-to-equity, financial risk ({de:.2} > {:.2})",
                th.max_debt_to_equity
            ),
        });
    }

    alerts
}
