//! Cached, single-flight query engine
//!
//! The engine sits between the view-state facade and a [`RecordSource`]. It
//! guarantees that each distinct request is computed once per cache epoch:
//!
//! - a cached request is answered from the cache,
//! - concurrent identical requests share one in-flight fetch,
//! - a failed fetch is reported to every waiter and never cached.
//!
//! ```text
//! query(request) ──▶ cache hit? ──yes──▶ Arc<QueryResult>
//!                        │no
//!                        ▼
//!                 in-flight fetch? ──yes──▶ await shared future
//!                        │no
//!                        ▼
//!                 source.fetch() ──▶ cache ──▶ every waiter
//! ```

pub mod cache;
pub mod tracker;

pub use cache::ResultCache;
pub use tracker::{RequestTicket, RequestTracker};

use crate::config::ViewConfig;
use crate::core::error::{ViewError, ViewResult};
use crate::core::query::{CacheKey, QueryResult, ViewRequest};
use crate::core::record::Record;
use crate::core::store::RecordSource;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type SharedFetch<R> = Shared<BoxFuture<'static, ViewResult<Arc<QueryResult<R>>>>>;

/// Counters describing how requests were served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests that started a fetch
    pub misses: u64,
    /// Requests that joined a fetch already in flight
    pub coalesced: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

struct EngineState<R> {
    cache: Mutex<ResultCache<R>>,
    /// In-flight fetches tagged with the epoch that started them
    in_flight: Mutex<HashMap<CacheKey, (u64, SharedFetch<R>)>>,
    epoch: AtomicU64,
    counters: Counters,
}

/// Query engine over a record source
///
/// Cheap to clone; clones share the cache.
pub struct QueryEngine<R: Record, S: RecordSource<R>> {
    source: Arc<S>,
    state: Arc<EngineState<R>>,
}

impl<R: Record, S: RecordSource<R>> Clone for QueryEngine<R, S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: Record, S: RecordSource<R>> QueryEngine<R, S> {
    /// Create an engine with an unbounded cache
    pub fn new(source: S) -> Self {
        Self::with_capacity(source, None)
    }

    /// Create an engine sized by `config.cache_capacity`
    pub fn from_config(source: S, config: &ViewConfig) -> Self {
        Self::with_capacity(source, config.cache_capacity())
    }

    pub fn with_capacity(source: S, capacity: Option<NonZeroUsize>) -> Self {
        Self {
            source: Arc::new(source),
            state: Arc::new(EngineState {
                cache: Mutex::new(ResultCache::new(capacity)),
                in_flight: Mutex::new(HashMap::new()),
                epoch: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Answer `request`, computing it at most once per cache epoch
    ///
    /// Identical requests return the same `Arc`.
    pub async fn query(&self, request: &ViewRequest) -> ViewResult<Arc<QueryResult<R>>> {
        let request = request.normalized();
        let key = request.cache_key();

        if let Some(hit) = self.state.lock_cache()?.get(&key) {
            self.state.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Query served from cache");
            return Ok(hit);
        }

        let fetch = {
            let mut in_flight = self.state.lock_in_flight()?;

            // A fetch completing between the first check and here has already
            // populated the cache before leaving the in-flight map.
            if let Some(hit) = self.state.lock_cache()?.get(&key) {
                self.state.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(hit);
            }

            match in_flight.get(&key).map(|(_, fetch)| fetch) {
                Some(fetch) => {
                    self.state.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "Joining in-flight query");
                    fetch.clone()
                }
                None => {
                    self.state.counters.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "Query cache miss, fetching");
                    let epoch = self.state.epoch.load(Ordering::SeqCst);
                    let fetch = self.start_fetch(key.clone(), request, epoch);
                    in_flight.insert(key, (epoch, fetch.clone()));
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Answer `request` unless a newer ticket was issued while it ran
    ///
    /// Returns `Ok(None)` for a superseded response; the result is still
    /// cached for whoever asks for it next.
    pub async fn query_latest(
        &self,
        request: &ViewRequest,
        ticket: RequestTicket,
        tracker: &RequestTracker,
    ) -> ViewResult<Option<Arc<QueryResult<R>>>> {
        let result = self.query(request).await?;
        if tracker.is_current(ticket) {
            Ok(Some(result))
        } else {
            tracing::debug!(?ticket, "Discarding superseded query result");
            Ok(None)
        }
    }

    /// Drop every cached result and start a new cache epoch
    ///
    /// Fetches already in flight still answer their waiters but do not
    /// populate the new epoch's cache, and later requests never join them.
    pub fn clear(&self) -> ViewResult<()> {
        let mut in_flight = self.state.lock_in_flight()?;
        self.state.epoch.fetch_add(1, Ordering::SeqCst);
        in_flight.clear();
        drop(in_flight);
        self.state.lock_cache()?.clear();
        tracing::info!("Query cache cleared");
        Ok(())
    }

    /// Number of cached results
    pub fn cached_len(&self) -> ViewResult<usize> {
        Ok(self.state.lock_cache()?.len())
    }

    pub fn stats(&self) -> EngineStats {
        let counters = &self.state.counters;
        EngineStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
        }
    }

    fn start_fetch(&self, key: CacheKey, request: ViewRequest, epoch: u64) -> SharedFetch<R> {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);

        async move {
            let result = source.fetch(&request).await.map(Arc::new);

            match &result {
                Ok(value) => match state.lock_cache() {
                    // The epoch is checked under the cache lock so a concurrent
                    // clear() either sees this entry or prevents it.
                    Ok(mut cache) if state.epoch.load(Ordering::SeqCst) == epoch => {
                        cache.insert(key.clone(), Arc::clone(value));
                    }
                    Ok(_) => tracing::debug!(key = %key, "Cache epoch changed, not caching result"),
                    Err(e) => tracing::warn!(key = %key, "Result not cached: {}", e),
                },
                Err(e) => tracing::warn!(key = %key, "Record source failed: {}", e),
            }

            if let Ok(mut in_flight) = state.lock_in_flight() {
                if in_flight.get(&key).is_some_and(|(owner, _)| *owner == epoch) {
                    in_flight.remove(&key);
                }
            }

            result
        }
        .boxed()
        .shared()
    }
}

impl<R> EngineState<R> {
    fn lock_cache(&self) -> ViewResult<MutexGuard<'_, ResultCache<R>>> {
        self.cache
            .lock()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire cache lock: {}", e)))
    }

    fn lock_in_flight(&self) -> ViewResult<MutexGuard<'_, HashMap<CacheKey, (u64, SharedFetch<R>)>>> {
        self.in_flight
            .lock()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire in-flight lock: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::FilterValue;
    use crate::core::record::JsonRecord;
    use crate::storage::InMemoryRecordSource;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn records(n: usize) -> Vec<JsonRecord> {
        (1..=n)
            .map(|i| JsonRecord::new(json!({"id": i, "status": if i <= 12 { "draft" } else { "published" }})))
            .collect()
    }

    fn engine(n: usize) -> QueryEngine<JsonRecord, InMemoryRecordSource<JsonRecord>> {
        QueryEngine::new(InMemoryRecordSource::new(records(n), vec![]))
    }

    #[tokio::test]
    async fn test_second_identical_query_hits_cache() {
        let engine = engine(45);
        let request = ViewRequest::new(1, 20);

        let first = engine.query(&request).await.unwrap();
        let second = engine.query(&request).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.source().fetch_count(), 1);
        assert_eq!(engine.stats().hits, 1);
        assert_eq!(engine.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_equivalent_requests_share_entry() {
        let engine = engine(45);
        let a = ViewRequest::new(1, 20).with_filter("title", FilterValue::text(""));
        let b = ViewRequest::new(1, 20);

        engine.query(&a).await.unwrap();
        engine.query(&b).await.unwrap();
        assert_eq!(engine.source().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_queries_coalesce() {
        let source = InMemoryRecordSource::new(records(45), vec![])
            .with_latency(Duration::from_millis(50));
        let engine = QueryEngine::new(source);
        let request = ViewRequest::new(2, 20);

        let (a, b, c) = tokio::join!(
            engine.query(&request),
            engine.query(&request),
            engine.query(&request)
        );

        let a = a.unwrap();
        assert!(Arc::ptr_eq(&a, &b.unwrap()));
        assert!(Arc::ptr_eq(&a, &c.unwrap()));
        assert_eq!(engine.source().fetch_count(), 1);
        assert_eq!(engine.stats().coalesced, 2);
    }

    #[tokio::test]
    async fn test_clear_forces_recompute() {
        let engine = engine(10);
        let request = ViewRequest::default();

        engine.query(&request).await.unwrap();
        engine.source().push(JsonRecord::new(json!({"id": 11}))).unwrap();
        assert_eq!(engine.query(&request).await.unwrap().total, 10);

        engine.clear().unwrap();
        assert_eq!(engine.cached_len().unwrap(), 0);
        assert_eq!(engine.query(&request).await.unwrap().total, 11);
        assert_eq!(engine.source().fetch_count(), 2);
    }

    /// Reports the version current when each fetch started
    struct VersionedSource {
        version: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RecordSource<JsonRecord> for VersionedSource {
        async fn fetch(&self, _request: &ViewRequest) -> ViewResult<QueryResult<JsonRecord>> {
            let version = self.version.load(Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(QueryResult {
                records: vec![],
                total_pages: 0,
                total: version,
            })
        }
    }

    #[tokio::test]
    async fn test_clear_does_not_join_fetch_from_previous_epoch() {
        let version = Arc::new(AtomicUsize::new(1));
        let engine = QueryEngine::new(VersionedSource {
            version: Arc::clone(&version),
        });
        let request = ViewRequest::default();

        let stale = tokio::spawn({
            let engine = engine.clone();
            let request = request.clone();
            async move { engine.query(&request).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        version.store(2, Ordering::SeqCst);
        engine.clear().unwrap();
        let fresh = engine.query(&request).await.unwrap();

        assert_eq!(fresh.total, 2);
        assert_eq!(stale.await.unwrap().unwrap().total, 1);
        assert_eq!(engine.stats().misses, 2);
        assert_eq!(engine.stats().coalesced, 0);

        // Only the current epoch's result is cached
        assert_eq!(engine.query(&request).await.unwrap().total, 2);
        assert_eq!(engine.cached_len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bounded_cache_evicts() {
        let source = InMemoryRecordSource::new(records(45), vec![]);
        let engine = QueryEngine::with_capacity(source, NonZeroUsize::new(1));

        engine.query(&ViewRequest::new(1, 20)).await.unwrap();
        engine.query(&ViewRequest::new(2, 20)).await.unwrap();
        engine.query(&ViewRequest::new(1, 20)).await.unwrap();

        assert_eq!(engine.cached_len().unwrap(), 1);
        assert_eq!(engine.source().fetch_count(), 3);
    }

    struct FailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource<JsonRecord> for FailingSource {
        async fn fetch(&self, _request: &ViewRequest) -> ViewResult<QueryResult<JsonRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ViewError::fetch_failed("backend down"))
        }
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let engine = QueryEngine::new(FailingSource {
            calls: AtomicUsize::new(0),
        });
        let request = ViewRequest::default();

        assert!(engine.query(&request).await.is_err());
        let err = engine.query(&request).await.unwrap_err();

        assert_eq!(err.error_code(), "SOURCE_ERROR");
        assert_eq!(engine.source().calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cached_len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_latest_discards_superseded() {
        let engine = engine(45);
        let tracker = RequestTracker::new();

        let stale = tracker.issue();
        let fresh = tracker.issue();

        let old = engine
            .query_latest(&ViewRequest::new(1, 20), stale, &tracker)
            .await
            .unwrap();
        let new = engine
            .query_latest(&ViewRequest::new(2, 20), fresh, &tracker)
            .await
            .unwrap();

        assert!(old.is_none());
        assert_eq!(new.unwrap().records[0].id(), "21");
    }
}
