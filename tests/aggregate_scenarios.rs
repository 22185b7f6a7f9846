// tests/aggregate_scenarios.rs
//
// End-to-end aggregation scenarios with in-process adapters.
//
// Covered:
// - weighted mean over the sources that answered (4.0 @ 0.5 + 5.0 @ 0.3 -> 4.38)
// - all sources down -> no score, empty contributions, degraded
// - invalid ticker rejected before any adapter runs
// - final score stays on the 1..5 scale for arbitrary inputs
// - repeated calls give the same rating
// - slow adapters are cut off by the per-adapter timeout

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stock_rating_aggregator::ratings::FetchOutcome;
use stock_rating_aggregator::{
    AggregateError, Aggregator, Coverage, RatingRecord, SourceAdapter, SourceId, SourceWeights,
    Unavailable,
};

struct Scripted {
    source: SourceId,
    outcome: FetchOutcome,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceAdapter for Scripted {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch(&self, _ticker: &str) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

fn scripted(source: SourceId, outcome: FetchOutcome, calls: &Arc<AtomicUsize>) -> Arc<dyn SourceAdapter> {
    Arc::new(Scripted {
        source,
        outcome,
        calls: calls.clone(),
    })
}

fn scored(source: SourceId, score: f64) -> FetchOutcome {
    Ok(RatingRecord::new(source).with_score(score))
}

#[tokio::test]
async fn partial_coverage_redistributes_weight() {
    let calls = Arc::new(AtomicUsize::new(0));
    let agg = Aggregator::new(
        vec![
            scripted(SourceId::Yahoo, scored(SourceId::Yahoo, 4.0), &calls),
            scripted(SourceId::TradingView, scored(SourceId::TradingView, 5.0), &calls),
            scripted(SourceId::TipRanks, Err(Unavailable::MissingCredential), &calls),
        ],
        SourceWeights::default_seed(),
    )
    .expect("valid config");

    let r = agg.aggregate("AAPL").await.expect("aggregate");
    assert_eq!(r.ticker, "AAPL");
    assert_eq!(r.final_score, Some(4.38));
    assert_eq!(r.percent_score(), Some(87.6));
    assert!(r.degraded);
    assert_eq!(r.coverage, Coverage::Partial);
    assert_eq!(r.contributions.len(), 2);
    assert_eq!(r.contributions[0].0, SourceId::Yahoo);
    assert_eq!(r.contributions[1].0, SourceId::TradingView);
    assert!(r.contribution(SourceId::TipRanks).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn all_sources_down_is_a_result_not_an_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let agg = Aggregator::new(
        vec![
            scripted(SourceId::Yahoo, Err(Unavailable::Http("503".into())), &calls),
            scripted(SourceId::TradingView, Err(Unavailable::Parse("bad".into())), &calls),
            scripted(SourceId::TipRanks, Err(Unavailable::NoData), &calls),
        ],
        SourceWeights::default_seed(),
    )
    .expect("valid config");

    let r = agg.aggregate("MSFT").await.expect("aggregate");
    assert_eq!(r.final_score, None);
    assert!(r.contributions.is_empty());
    assert!(r.degraded);
    assert_eq!(r.coverage, Coverage::NoContribution);
}

#[tokio::test]
async fn invalid_ticker_never_reaches_adapters() {
    let calls = Arc::new(AtomicUsize::new(0));
    let agg = Aggregator::new(
        vec![scripted(SourceId::Yahoo, scored(SourceId::Yahoo, 4.0), &calls)],
        SourceWeights::default_seed(),
    )
    .expect("valid config");

    for bad in ["", "   ", "AA PL", "AAPL;rm -rf"] {
        let err = agg.aggregate(bad).await.expect_err("must be rejected");
        assert!(matches!(err, AggregateError::InvalidInput(_)), "{bad:?}");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn final_score_is_bounded_by_inputs() {
    let cases: &[(f64, f64, f64, f64)] = &[
        (1.0, 5.0, 0.9, 0.1),
        (5.0, 5.0, 0.0, 1.0),
        (1.0, 1.0, 3.0, 7.0),
        (2.5, 3.75, 0.5, 0.5),
        (4.99, 1.01, 0.33, 0.67),
    ];
    for &(a, b, wa, wb) in cases {
        let calls = Arc::new(AtomicUsize::new(0));
        let agg = Aggregator::new(
            vec![
                scripted(SourceId::Yahoo, scored(SourceId::Yahoo, a), &calls),
                scripted(SourceId::Polygon, scored(SourceId::Polygon, b), &calls),
            ],
            SourceWeights::new()
                .with(SourceId::Yahoo, wa)
                .with(SourceId::Polygon, wb),
        )
        .expect("valid config");

        let score = agg
            .aggregate("AAPL")
            .await
            .expect("aggregate")
            .final_score
            .expect("some score");
        assert!((1.0..=5.0).contains(&score), "{score} for {a}/{b}");
        assert!(score >= a.min(b) - 0.005 && score <= a.max(b) + 0.005);
    }
}

#[tokio::test]
async fn repeated_aggregation_is_stable() {
    let calls = Arc::new(AtomicUsize::new(0));
    let agg = Aggregator::new(
        vec![
            scripted(SourceId::Yahoo, scored(SourceId::Yahoo, 3.3), &calls),
            scripted(SourceId::TradingView, Err(Unavailable::NoData), &calls),
        ],
        SourceWeights::default_seed(),
    )
    .expect("valid config");

    let first = agg.aggregate("GOOGL").await.expect("aggregate");
    let second = agg.aggregate("GOOGL").await.expect("aggregate");
    assert!(first.same_rating(&second));
    assert!(second.timestamp >= first.timestamp);
}

struct Slow;

#[async_trait]
impl SourceAdapter for Slow {
    fn source(&self) -> SourceId {
        SourceId::TipRanks
    }

    async fn fetch(&self, _ticker: &str) -> FetchOutcome {
        tokio::time::sleep(Duration::from_secs(30)).await;
        scored(SourceId::TipRanks, 1.0)
    }
}

#[tokio::test(start_paused = true)]
async fn slow_adapter_times_out_without_blocking_others() {
    let calls = Arc::new(AtomicUsize::new(0));
    let agg = Aggregator::new(
        vec![
            scripted(SourceId::Yahoo, scored(SourceId::Yahoo, 4.0), &calls),
            Arc::new(Slow),
        ],
        SourceWeights::default_seed(),
    )
    .expect("valid config")
    .with_timeout(Duration::from_millis(50));

    let r = agg.aggregate("AAPL").await.expect("aggregate");
    assert_eq!(r.final_score, Some(4.0));
    assert!(r.degraded);
    assert!(r.contribution(SourceId::TipRanks).is_none());
}
