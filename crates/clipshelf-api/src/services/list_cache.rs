//! In-process cache for list-query results.
//!
//! Caches shaped video lists under the canonical criteria key
//! ([`clipshelf_core::ListCriteria::cache_key`]) to avoid redundant
//! store round-trips for identical criteria within the freshness
//! window, and collapses concurrent identical fetches onto a single
//! in-flight store call.
//!
//! The cache is process-local session state: an explicit map from key
//! to `{value, fetched_at}` plus a map from key to the in-flight
//! fetch slot. Failed fetches surface their error to every joined
//! caller and leave the entry absent, so the next request retries
//! cleanly. Coarse invalidation clears the whole `videos` namespace
//! and bumps a generation counter so fetches that were already in
//! flight cannot repopulate the cache with pre-invalidation results.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info};

use clipshelf_core::defaults::LIST_CACHE_TTL;
use clipshelf_core::{Error, Result, Video};

/// In-process list-result cache with in-flight deduplication.
#[derive(Clone)]
pub struct ListCache {
    inner: Arc<ListCacheInner>,
}

struct ListCacheInner {
    /// Freshness window for cached entries.
    ttl: Duration,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, watch::Receiver<FetchSlot>>,
    /// Bumped on invalidation; a fetch only stores its result when
    /// the generation it started under is still current.
    generation: u64,
    stats: CacheStats,
}

struct CacheEntry {
    videos: Arc<Vec<Video>>,
    fetched_at: Instant,
}

/// Progress of an in-flight fetch, broadcast to joined callers.
/// Errors travel as messages because the underlying error is not
/// cloneable across waiters.
#[derive(Clone)]
enum FetchSlot {
    Pending,
    Done(std::result::Result<Arc<Vec<Video>>, String>),
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

impl ListCache {
    /// Create a cache with the default 5-minute freshness window.
    pub fn new() -> Self {
        Self::with_ttl(LIST_CACHE_TTL)
    }

    /// Create a cache with a custom freshness window.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(ListCacheInner {
                ttl,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Get the freshness window.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Current statistics snapshot.
    pub async fn stats(&self) -> CacheStats {
        self.inner.state.lock().await.stats
    }

    /// Return the cached value for `key`, or run `fetch` to produce
    /// it.
    ///
    /// Exactly one fetch runs per key at a time: callers arriving
    /// while a fetch is in flight receive that fetch's result instead
    /// of issuing their own store call. Requests for different keys
    /// proceed independently and may resolve out of order; results
    /// are keyed by criteria, never by arrival.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Arc<Vec<Video>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Video>>>,
    {
        let (tx, generation) = {
            let mut state = self.inner.state.lock().await;

            if let Some(entry) = state.entries.get(key) {
                if entry.fetched_at.elapsed() < self.inner.ttl {
                    let videos = entry.videos.clone();
                    state.stats.hits += 1;
                    debug!(cache_key = key, "Cache HIT");
                    return Ok(videos);
                }
                state.entries.remove(key);
            }

            if let Some(rx) = state.in_flight.get(key) {
                let rx = rx.clone();
                drop(state);
                return self.join_in_flight(key, rx).await;
            }

            state.stats.misses += 1;
            debug!(cache_key = key, "Cache MISS");

            let (tx, rx) = watch::channel(FetchSlot::Pending);
            state.in_flight.insert(key.to_string(), rx);
            (tx, state.generation)
        };

        let result = fetch().await;

        let mut state = self.inner.state.lock().await;
        state.in_flight.remove(key);

        let outcome = match result {
            Ok(videos) => {
                let videos = Arc::new(videos);
                if state.generation == generation {
                    state.entries.insert(
                        key.to_string(),
                        CacheEntry {
                            videos: videos.clone(),
                            fetched_at: Instant::now(),
                        },
                    );
                } else {
                    // Superseded by an invalidation while in flight:
                    // the caller still gets its answer, the cache
                    // does not.
                    debug!(cache_key = key, "Cache SKIP: generation superseded");
                }
                Ok(videos)
            }
            Err(e) => {
                state.stats.errors += 1;
                Err(e)
            }
        };
        drop(state);

        let _ = tx.send(FetchSlot::Done(match &outcome {
            Ok(videos) => Ok(videos.clone()),
            Err(e) => Err(e.to_string()),
        }));

        outcome
    }

    /// Wait on another caller's in-flight fetch for the same key.
    async fn join_in_flight(
        &self,
        key: &str,
        mut rx: watch::Receiver<FetchSlot>,
    ) -> Result<Arc<Vec<Video>>> {
        let received = rx
            .wait_for(|slot| matches!(slot, FetchSlot::Done(_)))
            .await
            .map(|slot| slot.clone());
        let done = match received {
            Ok(slot) => slot,
            Err(_) => {
                // The leading fetch was dropped without completing.
                // Clear its slot so the next caller can retry.
                let mut state = self.inner.state.lock().await;
                if let Some(existing) = state.in_flight.get(key) {
                    if existing.has_changed().is_err() {
                        state.in_flight.remove(key);
                    }
                }
                return Err(Error::Query("in-flight fetch was abandoned".to_string()));
            }
        };

        match done {
            FetchSlot::Done(Ok(videos)) => {
                let mut state = self.inner.state.lock().await;
                state.stats.hits += 1;
                drop(state);
                Ok(videos)
            }
            FetchSlot::Done(Err(message)) => Err(Error::Query(message)),
            FetchSlot::Pending => Err(Error::Internal(
                "in-flight fetch resolved without a result".to_string(),
            )),
        }
    }

    /// Invalidate every cached entry in the `videos` namespace.
    ///
    /// Called after a successful record creation: a new record may
    /// affect any filter combination, so correctness wins over
    /// precision.
    pub async fn invalidate_all(&self) {
        let mut state = self.inner.state.lock().await;
        let removed = state.entries.len();
        state.entries.clear();
        state.generation += 1;
        info!(
            subsystem = "cache",
            component = "list_cache",
            op = "invalidate_all",
            removed, "Cache FLUSH"
        );
    }
}

impl Default for ListCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use clipshelf_core::ListCriteria;

    fn sample_videos(n: usize) -> Vec<Video> {
        (0..n)
            .map(|i| Video {
                id: uuid::Uuid::now_v7(),
                title: format!("video {}", i),
                thumbnail_url: "https://thumbs.test/v.jpg".to_string(),
                duration_seconds: 60,
                views: 0,
                created_at_utc: chrono::Utc::now(),
                updated_at_utc: chrono::Utc::now(),
                tags: vec![],
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_hit_issues_zero_fetches() {
        let cache = ListCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let videos = cache
                .get_or_fetch("videos:k1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_videos(2))
                })
                .await
                .unwrap();
            assert_eq!(videos.len(), 2);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refetches_exactly_once() {
        let cache = ListCache::new();
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_videos(1))
        };

        cache.get_or_fetch("videos:k1", fetch).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        cache.get_or_fetch("videos:k1", fetch).await.unwrap();
        cache.get_or_fetch("videos:k1", fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_ttl_stays_cached() {
        let cache = ListCache::new();
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_videos(1))
        };

        cache.get_or_fetch("videos:k1", fetch).await.unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        cache.get_or_fetch("videos:k1", fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_fetches_collapse_to_one() {
        let cache = ListCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());

        let lead = {
            let cache = cache.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("videos:k1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok(sample_videos(3))
                    })
                    .await
            })
        };

        // Give the leader time to register its in-flight slot.
        tokio::task::yield_now().await;

        let join = {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("videos:k1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(sample_videos(99))
                    })
                    .await
            })
        };

        tokio::task::yield_now().await;
        gate.notify_waiters();

        let lead_result = lead.await.unwrap().unwrap();
        let join_result = join.await.unwrap().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lead_result.len(), 3);
        assert_eq!(join_result.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_is_not_cached() {
        let cache = ListCache::new();
        let calls = AtomicUsize::new(0);

        let failing = cache
            .get_or_fetch("videos:k1", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Query("store down".to_string()))
            })
            .await;
        assert!(failing.is_err());

        let recovered = cache
            .get_or_fetch("videos:k1", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_videos(1))
            })
            .await;
        assert!(recovered.is_ok());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().await.errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_all_clears_entries() {
        let cache = ListCache::new();
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_videos(1))
        };

        cache.get_or_fetch("videos:k1", fetch).await.unwrap();
        cache.invalidate_all().await;
        cache.get_or_fetch("videos:k1", fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_in_flight_result_discarded_after_invalidation() {
        let cache = ListCache::new();
        let gate = Arc::new(tokio::sync::Notify::new());

        let lead = {
            let cache = cache.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("videos:k1", || async move {
                        gate.notified().await;
                        Ok(sample_videos(1))
                    })
                    .await
            })
        };

        tokio::task::yield_now().await;

        // A record is created while the fetch is in flight.
        cache.invalidate_all().await;
        gate.notify_waiters();

        // The leader still receives its result...
        assert_eq!(lead.await.unwrap().unwrap().len(), 1);

        // ...but the pre-invalidation result must not have been stored.
        let calls = AtomicUsize::new(0);
        cache
            .get_or_fetch("videos:k1", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_videos(2))
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_fetch_independently() {
        let cache = ListCache::new();
        let calls = AtomicUsize::new(0);

        let a = ListCriteria::new(clipshelf_core::SortOrder::Newest, "a", Vec::<&str>::new());
        let b = ListCriteria::new(clipshelf_core::SortOrder::Newest, "b", Vec::<&str>::new());

        for criteria in [&a, &b] {
            cache
                .get_or_fetch(&criteria.cache_key(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_videos(1))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
