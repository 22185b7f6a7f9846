//! # Rating Cache
//!
//! Process-lifetime memoization of adapter outcomes keyed by
//! `(SourceId, ticker)`.
//!
//! - No time-based expiry: an entry lives until it is evicted.
//! - Bounded: once `capacity` keys are held, the least recently used key with
//!   a settled outcome is dropped to make room.
//! - `Unavailable` outcomes are cached exactly like successful records.
//! - Concurrent requests for the same key share one fetch; the per-key cell is
//!   created under the map lock and filled exactly once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use metrics::counter;
use tokio::sync::OnceCell;

use crate::ratings::{FetchOutcome, SourceId};

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

type Key = (SourceId, String);

struct Slot {
    cell: Arc<OnceCell<FetchOutcome>>,
    last_used: u64,
}

struct Inner {
    slots: HashMap<Key, Slot>,
    tick: u64,
}

pub struct RatingCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl RatingCache {
    /// `capacity` of 0 is bumped to 1 so every lookup still memoizes.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                slots: HashMap::with_capacity(capacity.min(10_000)),
                tick: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, source: SourceId, ticker: &str) -> bool {
        self.lock().slots.contains_key(&(source, ticker.to_string()))
    }

    /// Return the memoized outcome for `(source, ticker)`, running `fetch` only
    /// when the key is not cached yet.
    pub async fn get_or_fetch<F, Fut>(&self, source: SourceId, ticker: &str, fetch: F) -> FetchOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        let cell = self.slot_for(source, ticker);
        if let Some(hit) = cell.get() {
            counter!("rating_cache_hits_total").increment(1);
            tracing::debug!(source = %source, ticker, "rating cache hit");
            return hit.clone();
        }

        let mut ran = false;
        let out = cell
            .get_or_init(|| {
                ran = true;
                fetch()
            })
            .await
            .clone();
        if ran {
            counter!("rating_cache_misses_total").increment(1);
        } else {
            // Another caller filled the cell while we waited.
            counter!("rating_cache_hits_total").increment(1);
        }
        out
    }

    /// Look up (or create) the cell for a key, touching its recency and
    /// evicting the least recently used key when over capacity.
    ///
    /// Only filled cells are eviction candidates: dropping a pending cell
    /// would let a later request start a second fetch for the same key. When
    /// every held key is still pending the map grows past `capacity` until
    /// those fetches land.
    fn slot_for(&self, source: SourceId, ticker: &str) -> Arc<OnceCell<FetchOutcome>> {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let key = (source, ticker.to_string());

        if let Some(slot) = inner.slots.get_mut(&key) {
            slot.last_used = tick;
            return slot.cell.clone();
        }

        while inner.slots.len() >= self.capacity {
            let oldest = inner
                .slots
                .iter()
                .filter(|(_, s)| s.cell.initialized())
                .min_by_key(|(_, s)| s.last_used)
                .map(|(k, _)| k.clone());
            let Some(k) = oldest else { break };
            inner.slots.remove(&k);
            counter!("rating_cache_evictions_total").increment(1);
            tracing::debug!(source = %k.0, ticker = %k.1, "rating cache evict");
        }

        let cell = Arc::new(OnceCell::new());
        inner.slots.insert(
            key,
            Slot {
                cell: cell.clone(),
                last_used: tick,
            },
        );
        cell
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

impl Default for RatingCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
