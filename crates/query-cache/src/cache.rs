//! Keyed query cache with request deduplication and invalidation.
//!
//! # Protocol
//!
//! 1. Every key owns a `watch` channel carrying its latest [`Snapshot`].
//! 2. A read that finds fresh data returns it. Time-stale data is returned
//!    immediately and refreshed in the background. Missing, failed or
//!    invalidated data is refetched and awaited.
//! 3. At most one request per key is in flight. Each dispatch takes the next
//!    generation of its key; a result is applied only when its generation is
//!    newer than the last applied one.
//! 4. Requests run on spawned tasks. A caller that goes away stops waiting,
//!    the request still completes and its result lands in the cache.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use common::{AppError, AppResult, QueryCacheConfig};

use crate::key::QueryKey;
use crate::state::{AnyData, QueryState, QueryStatus, Snapshot};

type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, AppResult<AnyData>> + Send + Sync>;

struct InFlight {
    generation: u64,
}

struct Entry {
    /// Distinguishes a re-created key from a removed one
    id: u64,
    tx: watch::Sender<Snapshot>,
    fetcher: Option<Fetcher>,
    fetched_at: Option<Instant>,
    /// Generation of the latest dispatch
    dispatched: u64,
    /// Generation of the latest applied result or manual write
    applied: u64,
    /// Results up to this generation predate the last invalidation
    invalidated_through: u64,
    invalidated: bool,
    in_flight: Option<InFlight>,
}

enum Freshness {
    Fresh,
    Stale,
    Missing,
}

impl Entry {
    fn new(id: u64) -> Self {
        let (tx, _rx) = watch::channel(Snapshot::idle());
        Self {
            id,
            tx,
            fetcher: None,
            fetched_at: None,
            dispatched: 0,
            applied: 0,
            invalidated_through: 0,
            invalidated: false,
            in_flight: None,
        }
    }

    fn freshness(&self, stale_time: std::time::Duration) -> Freshness {
        let snapshot = self.tx.borrow();
        if self.invalidated || snapshot.status != QueryStatus::Success || snapshot.data.is_none() {
            return Freshness::Missing;
        }
        match self.fetched_at {
            Some(at) if at.elapsed() < stale_time => Freshness::Fresh,
            _ => Freshness::Stale,
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    fn has_subscribers(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

struct Inner {
    config: QueryCacheConfig,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    next_entry_id: AtomicU64,
}

/// Shared query cache. Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

/// Typed stream of snapshots for one key.
///
/// Dropping the subscription stops delivery; it never cancels a request.
pub struct Subscription<T> {
    key: QueryKey,
    rx: watch::Receiver<Snapshot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Latest state of the key
    pub fn current(&self) -> QueryState<T> {
        self.rx.borrow().typed()
    }

    /// Wait for the next change; `None` once the key is removed from the cache
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }
}

impl QueryCache {
    /// Create new cache
    pub fn new(config: QueryCacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(HashMap::new()),
                next_entry_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &QueryCacheConfig {
        &self.inner.config
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry_mut<'a>(&self, entries: &'a mut HashMap<QueryKey, Entry>, key: &QueryKey) -> &'a mut Entry {
        entries.entry(key.clone()).or_insert_with(|| {
            Entry::new(self.inner.next_entry_id.fetch_add(1, Ordering::Relaxed))
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a key through the cache, fetching with `fetcher` when needed.
    ///
    /// The fetcher is remembered for the key so that invalidation and
    /// [`refetch`](Self::refetch) can reuse it.
    pub async fn fetch<T, F, Fut>(&self, key: impl Into<QueryKey>, fetcher: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let key = key.into();
        self.resolve(&key, Some(erase(fetcher))).await.typed()
    }

    /// Force a refetch of a key using its registered fetcher and wait for it.
    ///
    /// Returns `None` when the key has never been fetched.
    pub async fn refetch<T: Send + Sync + 'static>(&self, key: impl Into<QueryKey>) -> Option<QueryState<T>> {
        let key = key.into();
        {
            let mut entries = self.entries();
            let entry = entries.get_mut(&key).filter(|e| e.fetcher.is_some())?;
            entry.invalidated = true;
            entry.invalidated_through = entry.dispatched;
        }
        Some(self.resolve(&key, None).await.typed())
    }

    /// Start a fetch for a key that is not fresh, without waiting for it.
    pub fn prefetch<T, F, Fut>(&self, key: impl Into<QueryKey>, fetcher: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let key = key.into();
        let mut entries = self.entries();
        let entry = self.entry_mut(&mut entries, &key);
        entry.fetcher = Some(erase(fetcher));
        if !matches!(entry.freshness(self.inner.config.stale_time()), Freshness::Fresh)
            && entry.in_flight.is_none()
        {
            self.dispatch(&key, entry);
        }
    }

    async fn resolve(&self, key: &QueryKey, fetcher: Option<Fetcher>) -> Snapshot {
        let stale_time = self.inner.config.stale_time();
        let mut awaited: Option<u64> = None;

        loop {
            let (generation, mut rx) = {
                let mut entries = self.entries();
                let entry = self.entry_mut(&mut entries, key);
                if let Some(fetcher) = &fetcher {
                    entry.fetcher = Some(fetcher.clone());
                }

                match entry.freshness(stale_time) {
                    Freshness::Fresh => {
                        debug!(key = %key, "Query cache hit");
                        return entry.snapshot();
                    }
                    Freshness::Stale => {
                        if entry.in_flight.is_none() {
                            debug!(key = %key, "Serving stale data, revalidating");
                            self.dispatch(key, entry);
                        }
                        return entry.snapshot();
                    }
                    Freshness::Missing => {
                        // A failed result we already waited for is final for this read
                        if let Some(g) = awaited {
                            if entry.applied >= g && !entry.invalidated {
                                return entry.snapshot();
                            }
                        }
                        if entry.fetcher.is_none() {
                            return entry.snapshot();
                        }

                        let generation = match &entry.in_flight {
                            Some(flight) => flight.generation,
                            None => self.dispatch(key, entry),
                        };
                        (generation, entry.tx.subscribe())
                    }
                }
            };

            awaited = Some(generation);
            if rx.wait_for(|s| s.generation >= generation).await.is_err() {
                // Key removed while waiting
                return Snapshot::idle();
            }
        }
    }

    /// Spawn a request for `key`. Caller holds the entries lock.
    fn dispatch(&self, key: &QueryKey, entry: &mut Entry) -> u64 {
        let Some(fetcher) = entry.fetcher.clone() else {
            return entry.applied;
        };

        entry.dispatched += 1;
        let generation = entry.dispatched;
        entry.in_flight = Some(InFlight { generation });
        entry.tx.send_modify(|s| {
            s.is_fetching = true;
            if s.data.is_none() {
                s.status = QueryStatus::Loading;
            }
        });
        debug!(key = %key, generation, "Dispatching query");

        let cache = self.clone();
        let key = key.clone();
        let entry_id = entry.id;
        let retries = self.inner.config.read_retries;
        let retry_delay = self.inner.config.retry_delay();

        tokio::spawn(async move {
            let result = AssertUnwindSafe(async {
                let mut attempt = 0;
                loop {
                    match fetcher().await {
                        Err(err) if err.is_transient() && attempt < retries => {
                            attempt += 1;
                            debug!(key = %key, attempt, "Retrying query after transient error");
                            tokio::time::sleep(retry_delay).await;
                        }
                        other => break other,
                    }
                }
            })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(AppError::internal("Query fetcher panicked")));

            cache.complete(&key, entry_id, generation, result);
        });

        generation
    }

    /// Apply a finished request unless a newer result already landed.
    fn complete(&self, key: &QueryKey, entry_id: u64, generation: u64, result: AppResult<AnyData>) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key).filter(|e| e.id == entry_id) else {
            debug!(key = %key, generation, "Discarding result for removed query");
            return;
        };

        if entry.in_flight.as_ref().map(|f| f.generation) == Some(generation) {
            entry.in_flight = None;
        }

        if generation <= entry.applied {
            warn!(key = %key, generation, applied = entry.applied, "Discarding late response");
            let fetching = entry.in_flight.is_some();
            entry.tx.send_modify(|s| {
                s.is_fetching = fetching;
                s.generation = s.generation.max(generation);
            });
            return;
        }

        entry.applied = generation;
        entry.invalidated = generation <= entry.invalidated_through;
        if result.is_ok() {
            entry.fetched_at = Some(Instant::now());
        }

        let refetch = entry.invalidated && entry.in_flight.is_none() && entry.has_subscribers();
        let fetching = entry.in_flight.is_some();
        entry.tx.send_modify(|s| {
            match result {
                Ok(data) => {
                    s.status = QueryStatus::Success;
                    s.data = Some(data);
                    s.error = None;
                    s.updated_at = Some(Utc::now());
                }
                Err(err) => {
                    debug!(key = %key, code = err.code(), "Query failed");
                    s.status = QueryStatus::Error;
                    s.error = Some(err);
                }
            }
            s.is_fetching = fetching;
            s.generation = generation;
        });

        if refetch {
            self.dispatch(key, entry);
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Subscribe to a key without fetching it
    pub fn subscribe<T: Send + Sync + 'static>(&self, key: impl Into<QueryKey>) -> Subscription<T> {
        let key = key.into();
        let mut entries = self.entries();
        let rx = self.entry_mut(&mut entries, &key).tx.subscribe();
        Subscription {
            key,
            rx,
            _marker: PhantomData,
        }
    }

    /// Subscribe to a key and make sure it is being loaded
    pub fn watch<T, F, Fut>(&self, key: impl Into<QueryKey>, fetcher: F) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let key = key.into();
        let subscription = self.subscribe(key.clone());
        self.prefetch(key, fetcher);
        subscription
    }

    // =========================================================================
    // Invalidation and writes
    // =========================================================================

    /// Mark a key stale. Subscribed keys refetch immediately, others on next read.
    pub fn invalidate(&self, key: impl Into<QueryKey>) {
        let key = key.into();
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(&key) {
            self.invalidate_entry(&key, entry);
        }
    }

    /// Invalidate every key starting with `prefix`
    pub fn invalidate_prefix(&self, prefix: impl Into<QueryKey>) -> usize {
        let prefix = prefix.into();
        let mut entries = self.entries();
        let mut count = 0;
        for (key, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(&prefix)) {
            self.invalidate_entry(key, entry);
            count += 1;
        }
        debug!(prefix = %prefix, count, "Invalidated queries");
        count
    }

    fn invalidate_entry(&self, key: &QueryKey, entry: &mut Entry) {
        entry.invalidated = true;
        entry.invalidated_through = entry.dispatched;
        if entry.has_subscribers() && entry.fetcher.is_some() && entry.in_flight.is_none() {
            self.dispatch(key, entry);
        }
    }

    /// Write a value directly. Requests dispatched earlier can no longer overwrite it.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: impl Into<QueryKey>, value: T) {
        let key = key.into();
        let mut entries = self.entries();
        let entry = self.entry_mut(&mut entries, &key);

        entry.applied = entry.dispatched;
        entry.invalidated = false;
        entry.fetched_at = Some(Instant::now());
        let generation = entry.applied;
        let fetching = entry.in_flight.is_some();
        entry.tx.send_modify(|s| {
            s.status = QueryStatus::Success;
            s.data = Some(Arc::new(value) as AnyData);
            s.error = None;
            s.updated_at = Some(Utc::now());
            s.is_fetching = fetching;
            s.generation = generation;
        });
    }

    /// Current typed state of a key without fetching
    pub fn get<T: Send + Sync + 'static>(&self, key: impl Into<QueryKey>) -> QueryState<T> {
        let key = key.into();
        self.entries()
            .get(&key)
            .map(|e| e.snapshot().typed())
            .unwrap_or_else(QueryState::idle)
    }

    /// Drop a key. In-flight results for it are discarded.
    pub fn remove(&self, key: impl Into<QueryKey>) {
        self.entries().remove(&key.into());
    }

    /// Drop every key
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Keys currently held, sorted
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Whether a request for the key is in flight
    pub fn is_fetching(&self, key: impl Into<QueryKey>) -> bool {
        self.entries()
            .get(&key.into())
            .map(|e| e.in_flight.is_some())
            .unwrap_or(false)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Run a mutation once and invalidate `keys` (as prefixes) when it succeeds.
    ///
    /// Mutations are never retried. The mutation runs on its own task so it
    /// completes, and its invalidations apply, even if the caller goes away.
    pub async fn mutate<R, Fut>(&self, mutation: Fut, keys: Vec<QueryKey>) -> AppResult<R>
    where
        R: Send + 'static,
        Fut: Future<Output = AppResult<R>> + Send + 'static,
    {
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            let result = mutation.await;
            match &result {
                Ok(_) => {
                    for key in keys {
                        cache.invalidate_prefix(key);
                    }
                }
                Err(err) => debug!(code = err.code(), "Mutation failed, cache untouched"),
            }
            result
        });

        handle
            .await
            .unwrap_or_else(|e| Err(AppError::internal(format!("Mutation task failed: {}", e))))
    }
}

fn erase<T, F, Fut>(fetcher: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetcher();
        async move { fut.await.map(|value| Arc::new(value) as AnyData) }.boxed()
    })
}
