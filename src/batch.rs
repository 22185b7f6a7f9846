// src/batch.rs
//! Batch refresh: aggregate a fixed ticker list and keep the latest row per
//! ticker in a flat CSV file.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aggregator::{Aggregator, CompositeRating};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    pub ticker: String,
    pub final_score: Option<f64>,
    pub percent_score: Option<f64>,
    /// Contributing sources joined with `|`.
    pub sources: String,
    pub degraded: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<&CompositeRating> for BatchRow {
    fn from(r: &CompositeRating) -> Self {
        Self {
            ticker: r.ticker.clone(),
            final_score: r.final_score,
            percent_score: r.percent_score(),
            sources: r
                .contributions
                .iter()
                .map(|(s, _)| s.as_str())
                .collect::<Vec<_>>()
                .join("|"),
            degraded: r.degraded,
            timestamp: r.timestamp,
        }
    }
}

/// Aggregate each ticker in order. Invalid tickers are logged and skipped;
/// duplicates keep only their last row.
pub async fn run_batch<S: AsRef<str>>(aggregator: &Aggregator, tickers: &[S]) -> Vec<BatchRow> {
    let mut rows: Vec<BatchRow> = Vec::with_capacity(tickers.len());
    for t in tickers {
        match aggregator.aggregate(t.as_ref()).await {
            Ok(rating) => {
                let row = BatchRow::from(&rating);
                rows.retain(|r| r.ticker != row.ticker);
                rows.push(row);
            }
            Err(e) => {
                tracing::warn!(error = %e, ticker = t.as_ref(), "skipping ticker");
            }
        }
    }
    tracing::info!(target: "batch", rows = rows.len(), "batch refresh done");
    rows
}

/// Overwrite `path` with one CSV row per ticker, creating parent directories.
pub fn write_csv(rows: &[BatchRow], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output dir {}", dir.display()))?;
    }
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    for row in rows {
        w.serialize(row).context("writing csv row")?;
    }
    w.flush().context("flushing csv")?;
    Ok(())
}
