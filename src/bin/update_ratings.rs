//! Batch refresh: aggregate the configured tickers, write the latest row per
//! ticker to CSV and send any threshold alerts.
//!
//! Usage: `update_ratings [TICKER ...]` (defaults to `[batch] tickers`).

use anyhow::Result;
use std::time::Duration;
use stock_rating_aggregator::alerts::check_alerts;
use stock_rating_aggregator::batch::{run_batch, write_csv};
use stock_rating_aggregator::financials::{FinancialRatios, PolygonFinancials, StatementsSource};
use stock_rating_aggregator::notify::{dispatch, EmailNotifier, LogNotifier, Notifier};
use stock_rating_aggregator::ratings::providers::http_client;
use stock_rating_aggregator::{aggregator_from_config, init_tracing, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let tickers = if args.is_empty() {
        cfg.batch.tickers.clone()
    } else {
        args
    };

    let aggregator = aggregator_from_config(&cfg)?;
    let rows = run_batch(&aggregator, &tickers).await;
    write_csv(&rows, &cfg.batch.output)?;

    let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier)];
    if let Some(smtp) = &cfg.smtp {
        match EmailNotifier::from_config(smtp) {
            Ok(n) => notifiers.push(Box::new(n)),
            Err(e) => tracing::warn!(error = ?e, "email alerts disabled"),
        }
    }

    let statements = cfg.credentials.polygon_api_key.clone().map(|key| {
        let timeout = Duration::from_secs(cfg.fetch.timeout_secs.max(1));
        PolygonFinancials::new(http_client(timeout, &cfg.fetch.user_agent), key)
    });

    let mut alerts = Vec::new();
    for row in &rows {
        let ratios = match &statements {
            Some(src) => match src.fetch_statements(&row.ticker).await {
                Ok(s) => Some(FinancialRatios::from_statements(&s)),
                Err(e) => {
                    tracing::warn!(error = ?e, ticker = %row.ticker, "statements unavailable");
                    None
                }
            },
            None => None,
        };
        alerts.extend(check_alerts(&row.ticker, row.final_score, ratios.as_ref(), &cfg.alerts));
    }
    let delivered = dispatch(&notifiers, &alerts).await;

    println!(
        "update_ratings: {} rows -> {} ({} alerts, {} deliveries)",
        rows.len(),
        cfg.batch.output.display(),
        alerts.len(),
        delivered
    );
    Ok(())
}
