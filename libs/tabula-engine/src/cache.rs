use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use tokio::time::Instant;

use tabula_api::error::FetchError;
use tabula_api::value::RowSet;

/// Outcome of one fetch, handed unchanged to every caller that waited on it.
pub type FetchOutcome = Result<Arc<RowSet>, FetchError>;

type InFlight = Shared<BoxFuture<'static, FetchOutcome>>;

/// Cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Max number of cached row sets. Least-recently-used goes first.
    pub capacity: NonZeroUsize,
    /// Entries are absent once `now - inserted >= ttl`.
    pub ttl: Duration,
    /// Fetches running longer fail with `FetchError::Timeout`.
    pub fetch_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN),
            ttl: Duration::from_secs(3600),
            fetch_timeout: None,
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Served from a live entry.
    pub hits: u64,
    /// Started a new fetch.
    pub misses: u64,
    /// Joined a fetch already in flight.
    pub joined: u64,
    /// Fetch functions actually invoked.
    pub fetches: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
    /// Entries dropped because their TTL ran out.
    pub expirations: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    fetches: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

struct Entry {
    rows: Arc<RowSet>,
    inserted: Instant,
}

struct State<K: Hash + Eq> {
    entries: LruCache<K, Entry>,
    in_flight: HashMap<K, InFlight>,
}

/// Clears the in-flight marker for `key` if the flight unwinds before
/// completing normally.
struct FlightMarker<K: Hash + Eq> {
    inner: Weak<Inner<K>>,
    key: Option<K>,
}

impl<K: Hash + Eq> FlightMarker<K> {
    /// The marker was already removed under the lock.
    fn disarm(mut self) {
        self.key = None;
    }
}

impl<K: Hash + Eq> Drop for FlightMarker<K> {
    fn drop(&mut self) {
        let (Some(key), Some(inner)) = (self.key.take(), self.inner.upgrade()) else {
            return;
        };
        inner.lock().in_flight.remove(&key);
    }
}

struct Inner<K: Hash + Eq> {
    state: Mutex<State<K>>,
    config: CacheConfig,
    counters: Counters,
}

impl<K: Hash + Eq> Inner<K> {
    fn lock(&self) -> MutexGuard<'_, State<K>> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("result cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Live entry for `key`, dropping it first if expired.
    fn live(&self, state: &mut State<K>, key: &K) -> Option<Arc<RowSet>> {
        let entry = state.entries.get(key)?;
        if entry.inserted.elapsed() < self.config.ttl {
            return Some(Arc::clone(&entry.rows));
        }
        state.entries.pop(key);
        Counters::bump(&self.counters.expirations);
        None
    }
}

/// Query result cache: fingerprint → row set, with TTL, LRU capacity bound
/// and single-flight fetches.
///
/// For a given key at most one fetch runs at a time. Callers arriving while
/// it runs wait for it and receive its outcome, success or failure. The
/// check-then-fetch decision and the insert-on-completion each happen under
/// one short critical section; the lock is never held across an await.
///
/// Cloning is cheap and shares the underlying cache.
pub struct ResultCache<K: Hash + Eq> {
    inner: Arc<Inner<K>>,
}

impl<K: Hash + Eq> Clone for ResultCache<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Hash + Eq> std::fmt::Debug for ResultCache<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("config", &self.inner.config)
            .field("stats", &self.inner.counters.snapshot())
            .finish()
    }
}

impl<K> ResultCache<K>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    entries: LruCache::new(config.capacity),
                    in_flight: HashMap::new(),
                }),
                config,
                counters: Counters::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Cached row set for `key`, fetching it if needed.
    ///
    /// - live entry and no `force_refresh` → the cached rows, no fetch
    /// - fetch for `key` already in flight → wait for it
    /// - otherwise → run `fetch(key)`, cache a success, share the outcome
    ///
    /// A forced refresh that finds a fetch already in flight joins it: that
    /// fetch postdates the cached entry. Flights run as spawned tasks, so a
    /// flight abandoned by all its callers still completes and clears its
    /// marker; it cannot be joined long after the fact.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, force_refresh: bool, fetch: F) -> FetchOutcome
    where
        F: FnOnce(K) -> Fut + Send + 'static,
        Fut: Future<Output = Result<RowSet, FetchError>> + Send + 'static,
    {
        let flight = {
            let mut state = self.inner.lock();

            if !force_refresh {
                if let Some(rows) = self.inner.live(&mut state, &key) {
                    Counters::bump(&self.inner.counters.hits);
                    tracing::debug!(key = ?key, "cache hit");
                    return Ok(rows);
                }
            }

            match state.in_flight.get(&key) {
                Some(flight) => {
                    Counters::bump(&self.inner.counters.joined);
                    tracing::debug!(key = ?key, "joining in-flight fetch");
                    flight.clone()
                }
                None => {
                    Counters::bump(&self.inner.counters.misses);
                    tracing::debug!(key = ?key, force_refresh, "cache miss, fetching");
                    let flight = self.spawn_flight(key.clone(), fetch);
                    state.in_flight.insert(key, flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Spawn the fetch for `key` and return a shareable handle on its outcome.
    ///
    /// The task stores the result and clears the in-flight marker, so this
    /// happens exactly once and whether or not anyone still awaits it. A
    /// panicking fetch clears the marker through `FlightMarker` and reaches
    /// waiters as `FetchError::Transport`. The task holds only a weak
    /// reference to the cache.
    fn spawn_flight<F, Fut>(&self, key: K, fetch: F) -> InFlight
    where
        F: FnOnce(K) -> Fut + Send + 'static,
        Fut: Future<Output = Result<RowSet, FetchError>> + Send + 'static,
    {
        let weak: Weak<Inner<K>> = Arc::downgrade(&self.inner);
        let timeout = self.inner.config.fetch_timeout;

        let task = tokio::spawn(async move {
            let marker = FlightMarker {
                inner: weak.clone(),
                key: Some(key.clone()),
            };
            if let Some(inner) = weak.upgrade() {
                Counters::bump(&inner.counters.fetches);
            }

            let fetched = match timeout {
                Some(limit) => tokio::time::timeout(limit, fetch(key.clone()))
                    .await
                    .unwrap_or(Err(FetchError::Timeout(limit))),
                None => fetch(key.clone()).await,
            };
            let outcome = fetched.map(Arc::new);

            let Some(inner) = weak.upgrade() else {
                return outcome;
            };
            let mut state = inner.lock();
            state.in_flight.remove(&key);
            marker.disarm();

            match &outcome {
                Ok(rows) => {
                    let entry = Entry {
                        rows: Arc::clone(rows),
                        inserted: Instant::now(),
                    };
                    if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
                        if evicted != key {
                            Counters::bump(&inner.counters.evictions);
                            tracing::debug!(key = ?evicted, "evicted least recently used entry");
                        }
                    }
                    tracing::debug!(key = ?key, rows = rows.len(), "fetch complete, cached");
                }
                Err(e) => {
                    tracing::warn!(key = ?key, error = %e, "fetch failed");
                }
            }

            outcome
        });

        async move {
            task.await.unwrap_or_else(|e| {
                if e.is_panic() {
                    tracing::error!("fetch task panicked");
                    Err(FetchError::transport("fetch task panicked"))
                } else {
                    Err(FetchError::Disconnected)
                }
            })
        }
        .boxed()
        .shared()
    }

    /// Drop the entry for `key`. An in-flight fetch is unaffected.
    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.lock().entries.pop(key).is_some()
    }

    /// Drop all entries. In-flight fetches are unaffected.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// True if a live entry exists, without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .lock()
            .entries
            .peek(key)
            .is_some_and(|e| e.inserted.elapsed() < self.inner.config.ttl)
    }

    /// Number of stored entries, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }
}
