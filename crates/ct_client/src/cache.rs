use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ct_core::{RequestError, RequestResult};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

const DEFAULT_RETENTION: Duration = Duration::from_secs(60);

/// Cache key: endpoint plus its parameters in canonical order, so two
/// structurally-equal requests always land on the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(endpoint: &str, params: &[(&str, &str)]) -> Self {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.sort();
        Self {
            endpoint: endpoint.to_string(),
            params,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

type Broadcast = watch::Receiver<Option<RequestResult<Value>>>;

enum EntryState {
    /// A request for this key is in flight; waiters clone the receiver.
    Pending(Broadcast),
    /// Last successful response. Errors are never stored here, so a later
    /// call always retries a failed key.
    Ready(Value),
}

struct CacheEntry {
    state: EntryState,
    last_access: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    subscribers: HashMap<CacheKey, usize>,
}

/// Keyed async-request cache and deduplicator.
///
/// Concurrent queries for one key share a single underlying request;
/// successful responses stay cached while subscribed, then for a bounded
/// idle window. Mutations hold the lock only between suspension points, so
/// the map is never locked across network I/O.
pub struct RequestCache {
    inner: Mutex<Inner>,
    retention: Duration,
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

enum Plan {
    Hit(Value),
    Wait(Broadcast),
    Fetch(watch::Sender<Option<RequestResult<Value>>>),
}

impl RequestCache {
    pub fn new(retention: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            retention,
        }
    }

    /// Resolves `key` to a response, deduplicating against any identical
    /// in-flight request. `skip_cache` bypasses the short-circuit on an
    /// already-completed entry; the fresh response still lands in the
    /// cache for subscribed readers.
    pub async fn query<F, Fut>(&self, key: CacheKey, skip_cache: bool, fetch: F) -> RequestResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RequestResult<Value>>,
    {
        let plan = {
            let mut inner = self.inner.lock().unwrap();
            match inner.entries.get_mut(&key) {
                Some(entry) => {
                    entry.last_access = Instant::now();
                    match &entry.state {
                        EntryState::Pending(rx) => Plan::Wait(rx.clone()),
                        EntryState::Ready(value) if !skip_cache => Plan::Hit(value.clone()),
                        EntryState::Ready(_) => {
                            let (tx, rx) = watch::channel(None);
                            entry.state = EntryState::Pending(rx);
                            Plan::Fetch(tx)
                        }
                    }
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    inner.entries.insert(
                        key.clone(),
                        CacheEntry {
                            state: EntryState::Pending(rx),
                            last_access: Instant::now(),
                        },
                    );
                    Plan::Fetch(tx)
                }
            }
        };

        match plan {
            Plan::Hit(value) => {
                debug!("cache hit for {}", key.endpoint);
                Ok(value)
            }
            Plan::Wait(mut rx) => {
                debug!("joining in-flight request for {}", key.endpoint);
                loop {
                    if let Some(result) = rx.borrow().clone() {
                        return result;
                    }
                    if rx.changed().await.is_err() {
                        return Err(RequestError::Aborted);
                    }
                }
            }
            Plan::Fetch(tx) => {
                // If this future is dropped mid-flight the guard clears the
                // pending entry so waiters are not stranded on a dead key.
                let mut guard = PendingGuard {
                    cache: self,
                    key: &key,
                    armed: true,
                };
                let result = fetch().await;
                {
                    let mut inner = self.inner.lock().unwrap();
                    match &result {
                        Ok(value) => {
                            if let Some(entry) = inner.entries.get_mut(&key) {
                                entry.state = EntryState::Ready(value.clone());
                                entry.last_access = Instant::now();
                            }
                        }
                        Err(_) => {
                            inner.entries.remove(&key);
                        }
                    }
                }
                guard.armed = false;
                let _ = tx.send(Some(result.clone()));
                result
            }
        }
    }

    /// Cached response for `key`, if a completed entry exists. Read path
    /// for views that render previously fetched pages.
    pub fn cached(&self, key: &CacheKey) -> Option<Value> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entries.get_mut(key)?;
        entry.last_access = Instant::now();
        match &entry.state {
            EntryState::Ready(value) => Some(value.clone()),
            EntryState::Pending(_) => None,
        }
    }

    /// Registers interest in `key`. While at least one subscription is
    /// alive the entry is never evicted; dropping the last one starts the
    /// idle retention clock.
    pub fn subscribe(self: &Arc<Self>, key: CacheKey) -> CacheSubscription {
        {
            let mut inner = self.inner.lock().unwrap();
            *inner.subscribers.entry(key.clone()).or_insert(0) += 1;
        }
        CacheSubscription {
            cache: Arc::clone(self),
            key,
        }
    }

    /// Drops completed entries that have sat unsubscribed past the
    /// retention window. In-flight entries are never touched.
    pub fn evict_idle(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        let Inner {
            entries,
            subscribers,
        } = &mut *inner;
        entries.retain(|key, entry| match &entry.state {
            EntryState::Pending(_) => true,
            EntryState::Ready(_) => {
                subscribers.get(key).copied().unwrap_or(0) > 0
                    || now.duration_since(entry.last_access) < self.retention
            }
        });
    }

    /// Periodic eviction driven by a background task. The task exits once
    /// the cache itself is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => cache.evict_idle(),
                    None => break,
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct PendingGuard<'a> {
    cache: &'a RequestCache,
    key: &'a CacheKey,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.cache.inner.lock().unwrap();
        if let Some(entry) = inner.entries.get(self.key) {
            if matches!(entry.state, EntryState::Pending(_)) {
                inner.entries.remove(self.key);
            }
        }
    }
}

/// RAII subscription handle; see [`RequestCache::subscribe`].
pub struct CacheSubscription {
    cache: Arc<RequestCache>,
    key: CacheKey,
}

impl Drop for CacheSubscription {
    fn drop(&mut self) {
        let mut inner = self.cache.inner.lock().unwrap();
        let mut emptied = false;
        if let Some(count) = inner.subscribers.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                inner.subscribers.remove(&self.key);
                emptied = true;
            }
        }
        if emptied {
            // Idle clock starts at unsubscribe, not at last fetch.
            if let Some(entry) = inner.entries.get_mut(&self.key) {
                entry.last_access = Instant::now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    fn key(endpoint: &str) -> CacheKey {
        CacheKey::new(endpoint, &[("topic", "testTopic"), ("page", "0")])
    }

    #[tokio::test]
    async fn concurrent_identical_queries_share_one_request() {
        let cache = Arc::new(RequestCache::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!({"ok": true}))
        };

        let (a, b) = tokio::join!(
            cache.query(key("get_article"), true, || fetch(calls.clone())),
            cache.query(key("get_article"), true, || fetch(calls.clone())),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn completed_entries_short_circuit_unless_skipped() {
        let cache = RequestCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .query(key("search_articles"), false, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!([1, 2]))
                })
                .await
                .unwrap();
            assert_eq!(value, json!([1, 2]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache
            .query(key("search_articles"), true, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!([3]))
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // The refreshed value replaced the cached one.
        assert_eq!(cache.cached(&key("search_articles")), Some(json!([3])));
    }

    #[tokio::test]
    async fn errors_are_broadcast_but_not_cached() {
        let cache = Arc::new(RequestCache::default());

        let (a, b) = tokio::join!(
            cache.query(key("get_article"), false, || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(RequestError::Http {
                    status: 500,
                    data: Value::Null,
                })
            }),
            cache.query(key("get_article"), false, || async {
                Ok(json!("never runs"))
            }),
        );
        assert_eq!(a.unwrap_err().status(), Some(500));
        assert_eq!(b.unwrap_err().status(), Some(500));

        // The failed key retries instead of replaying the error.
        let retried = cache
            .query(key("get_article"), false, || async { Ok(json!("fresh")) })
            .await
            .unwrap();
        assert_eq!(retried, json!("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_are_evicted_after_retention() {
        let cache = Arc::new(RequestCache::new(Duration::from_secs(60)));
        cache
            .query(key("search_articles"), false, || async { Ok(json!(1)) })
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        cache.evict_idle();
        assert_eq!(cache.len(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        cache.evict_idle();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribed_entries_survive_eviction() {
        let cache = Arc::new(RequestCache::new(Duration::from_secs(60)));
        cache
            .query(key("search_articles"), false, || async { Ok(json!(1)) })
            .await
            .unwrap();

        let subscription = cache.subscribe(key("search_articles"));
        tokio::time::advance(Duration::from_secs(3600)).await;
        cache.evict_idle();
        assert_eq!(cache.len(), 1, "subscribed entry must be retained");

        drop(subscription);
        cache.evict_idle();
        assert_eq!(cache.len(), 1, "idle clock restarts at unsubscribe");

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.evict_idle();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_never_drops_in_flight_entries() {
        let cache = Arc::new(RequestCache::new(Duration::from_millis(1)));
        let cache2 = Arc::clone(&cache);

        let pending = tokio::spawn(async move {
            cache2
                .query(key("get_article"), true, || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(json!("slow"))
                })
                .await
        });

        tokio::time::advance(Duration::from_secs(1)).await;
        cache.evict_idle();
        assert_eq!(cache.len(), 1, "pending entry survived the sweep");

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(pending.await.unwrap().unwrap(), json!("slow"));
    }

    #[test]
    fn keys_normalize_parameter_order() {
        let a = CacheKey::new("search_articles", &[("page", "0"), ("topic", "t")]);
        let b = CacheKey::new("search_articles", &[("topic", "t"), ("page", "0")]);
        assert_eq!(a, b);

        let c = CacheKey::new("search_articles", &[("topic", "t"), ("page", "1")]);
        assert_ne!(a, c);
    }
}
