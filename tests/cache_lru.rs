// tests/cache_lru.rs
//
// Cache behaviour as seen through the aggregator: memoization per
// (source, ticker), least-recently-used eviction and one fetch per key under
// concurrent requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stock_rating_aggregator::ratings::FetchOutcome;
use stock_rating_aggregator::{
    Aggregator, RatingCache, RatingRecord, SourceAdapter, SourceId, SourceWeights, Unavailable,
};

/// Counts fetches per ticker and answers after an optional delay.
struct Counting {
    source: SourceId,
    calls: Arc<AtomicUsize>,
    delay: Duration,
    fail: bool,
}

#[async_trait]
impl SourceAdapter for Counting {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch(&self, _ticker: &str) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            Err(Unavailable::Http("503 Service Unavailable".into()))
        } else {
            Ok(RatingRecord::new(self.source).with_score(3.5))
        }
    }
}

fn counting(source: SourceId, calls: &Arc<AtomicUsize>) -> Arc<dyn SourceAdapter> {
    Arc::new(Counting {
        source,
        calls: calls.clone(),
        delay: Duration::ZERO,
        fail: false,
    })
}

fn yahoo_only() -> SourceWeights {
    SourceWeights::new().with(SourceId::Yahoo, 1.0)
}

#[tokio::test]
async fn least_recently_used_ticker_is_refetched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(RatingCache::new(2));
    let agg = Aggregator::new(vec![counting(SourceId::Yahoo, &calls)], yahoo_only())
        .expect("valid config")
        .with_cache(cache.clone());

    for t in ["AAPL", "MSFT", "GOOGL"] {
        agg.aggregate(t).await.expect("aggregate");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(SourceId::Yahoo, "AAPL"));
    assert!(cache.contains(SourceId::Yahoo, "MSFT"));
    assert!(cache.contains(SourceId::Yahoo, "GOOGL"));

    // GOOGL is cached; AAPL was evicted and needs a new fetch.
    agg.aggregate("GOOGL").await.expect("aggregate");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    agg.aggregate("AAPL").await.expect("aggregate");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(!cache.contains(SourceId::Yahoo, "MSFT"));
}

#[tokio::test]
async fn lookups_refresh_recency() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(RatingCache::new(2));
    let agg = Aggregator::new(vec![counting(SourceId::Yahoo, &calls)], yahoo_only())
        .expect("valid config")
        .with_cache(cache.clone());

    agg.aggregate("AAPL").await.expect("aggregate");
    agg.aggregate("MSFT").await.expect("aggregate");
    agg.aggregate("AAPL").await.expect("aggregate");
    agg.aggregate("GOOGL").await.expect("aggregate");

    assert!(cache.contains(SourceId::Yahoo, "AAPL"));
    assert!(!cache.contains(SourceId::Yahoo, "MSFT"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unavailable_outcomes_are_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let failing: Arc<dyn SourceAdapter> = Arc::new(Counting {
        source: SourceId::TradingView,
        calls: calls.clone(),
        delay: Duration::ZERO,
        fail: true,
    });
    let agg = Aggregator::new(vec![failing], SourceWeights::default_seed())
        .expect("valid config")
        .with_cache(Arc::new(RatingCache::new(10)));

    for _ in 0..3 {
        let r = agg.aggregate("TSLA").await.expect("aggregate");
        assert_eq!(r.final_score, None);
        assert!(r.degraded);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sources_are_cached_independently() {
    let yahoo_calls = Arc::new(AtomicUsize::new(0));
    let tv_calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(RatingCache::new(10));
    let agg = Aggregator::new(
        vec![
            counting(SourceId::Yahoo, &yahoo_calls),
            counting(SourceId::TradingView, &tv_calls),
        ],
        SourceWeights::default_seed(),
    )
    .expect("valid config")
    .with_cache(cache.clone());

    agg.aggregate("NVDA").await.expect("aggregate");
    agg.aggregate("NVDA").await.expect("aggregate");

    assert_eq!(cache.len(), 2);
    assert_eq!(yahoo_calls.load(Ordering::SeqCst), 1);
    assert_eq!(tv_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_fetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let slow: Arc<dyn SourceAdapter> = Arc::new(Counting {
        source: SourceId::Yahoo,
        calls: calls.clone(),
        delay: Duration::from_millis(200),
        fail: false,
    });
    let agg = Aggregator::new(vec![slow], yahoo_only())
        .expect("valid config")
        .with_cache(Arc::new(RatingCache::new(10)));

    let (a, b, c) = tokio::join!(
        agg.aggregate("AMZN"),
        agg.aggregate("AMZN"),
        agg.aggregate("AMZN")
    );
    let (a, b, c) = (a.expect("a"), b.expect("b"), c.expect("c"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(a.same_rating(&b));
    assert!(b.same_rating(&c));
    assert_eq!(a.final_score, Some(3.5));
}

#[tokio::test(start_paused = true)]
async fn in_flight_ticker_survives_eviction_pressure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let slow: Arc<dyn SourceAdapter> = Arc::new(Counting {
        source: SourceId::Yahoo,
        calls: calls.clone(),
        delay: Duration::from_millis(200),
        fail: false,
    });
    let cache = Arc::new(RatingCache::new(1));
    let agg = Aggregator::new(vec![slow], yahoo_only())
        .expect("valid config")
        .with_cache(cache.clone());

    // AAPL starts first; MSFT arrives while it is pending and AAPL is asked
    // for again before its first fetch lands.
    let (first, (msft, again)) = tokio::join!(agg.aggregate("AAPL"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        tokio::join!(agg.aggregate("MSFT"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            agg.aggregate("AAPL").await
        })
    });
    let (first, again) = (first.expect("first"), again.expect("again"));
    msft.expect("msft");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(first.same_rating(&again));
    assert!(cache.contains(SourceId::Yahoo, "AAPL"));
}
