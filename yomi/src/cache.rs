//! Refreshing cache: lazily built, periodically rebuilt snapshots per key
//!
//! Concurrency model:
//! - First access to a key runs its loader exactly once; concurrent first
//!   callers wait on the registry's creation lock and then see the entry
//! - Every registered key gets a background refresh task that sleeps for the
//!   entry's interval, reloads, and swaps the snapshot on success
//! - A failed refresh logs and keeps the previous snapshot
//! - Snapshots are `Arc<V>` in an `ArcSwap`, replaced whole; readers never
//!   see a value under construction and never take a lock on the snapshot
//! - Intervals below `MIN_REFRESH_INTERVAL` are raised to it
//!
//! `shutdown()` cancels every refresh task and waits for each to finish its
//! current cycle. Dropping the cache cancels the tasks without waiting.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Error a loader may fail with
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by one loader invocation
pub type LoadFuture<V> = BoxFuture<'static, Result<V, LoadError>>;

/// Produces a fresh value for a key. Called once at registration and again on
/// every refresh cycle.
pub type Loader<V> = Arc<dyn Fn() -> LoadFuture<V> + Send + Sync>;

/// Wrap an async closure as a `Loader`.
pub fn loader_fn<V, F, Fut>(f: F) -> Loader<V>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, LoadError>> + Send + 'static,
    V: 'static,
{
    Arc::new(move || f().boxed())
}

/// Error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("no cache entry registered for key {0}")]
    NotFound(String),
    #[error("initial load failed: {0}")]
    Load(String),
    #[error("cache is shut down")]
    Closed,
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Shortest refresh interval a cache entry will run with
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(10);

fn clamp_interval(interval: Duration) -> Duration {
    if interval < MIN_REFRESH_INTERVAL {
        warn!(
            requested_ms = interval.as_millis() as u64,
            min_ms = MIN_REFRESH_INTERVAL.as_millis() as u64,
            "refresh interval too short, using minimum"
        );
        return MIN_REFRESH_INTERVAL;
    }
    interval
}

struct CacheEntry<V> {
    snapshot: ArcSwap<V>,
    last_refreshed: RwLock<DateTime<Utc>>,
    interval: Duration,
}

impl<V> CacheEntry<V> {
    fn new(value: V, interval: Duration) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(value),
            last_refreshed: RwLock::new(Utc::now()),
            interval,
        }
    }

    fn current(&self) -> Arc<V> {
        self.snapshot.load_full()
    }

    fn publish(&self, value: V) {
        self.snapshot.store(Arc::new(value));
        *self.last_refreshed.write() = Utc::now();
    }
}

/// Registry of refreshing snapshots keyed by `K`
pub struct RefreshingCache<K, V> {
    entries: RwLock<HashMap<K, Arc<CacheEntry<V>>>>,
    /// Held across check-load-insert so a key is only ever loaded once
    create_lock: tokio::sync::Mutex<()>,
    default_interval: Duration,
    token: CancellationToken,
    tracker: TaskTracker,
    _cancel_on_drop: DropGuard,
}

impl<K, V> RefreshingCache<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(default_interval: Duration) -> Self {
        let token = CancellationToken::new();
        Self {
            entries: RwLock::new(HashMap::new()),
            create_lock: tokio::sync::Mutex::new(()),
            default_interval: clamp_interval(default_interval),
            _cancel_on_drop: token.clone().drop_guard(),
            token,
            tracker: TaskTracker::new(),
        }
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Return the snapshot for `key`, loading and registering it first if
    /// needed. A first-load failure is returned to the caller and leaves the
    /// key unregistered.
    pub async fn get_or_register(&self, key: K, loader: Loader<V>) -> CacheResult<Arc<V>> {
        self.get_or_register_with_interval(key, loader, self.default_interval)
            .await
    }

    pub async fn get_or_register_with_interval(
        &self,
        key: K,
        loader: Loader<V>,
        interval: Duration,
    ) -> CacheResult<Arc<V>> {
        if let Some(entry) = self.entry(&key) {
            return Ok(entry.current());
        }

        let _creating = self.create_lock.lock().await;
        if let Some(entry) = self.entry(&key) {
            return Ok(entry.current());
        }
        if self.token.is_cancelled() {
            return Err(CacheError::Closed);
        }

        debug!(key = %key, "loading cache entry");
        let value = loader().await.map_err(|e| CacheError::Load(e.to_string()))?;
        // shutdown() may have run while the first load was in flight
        if self.token.is_cancelled() {
            return Err(CacheError::Closed);
        }
        let interval = clamp_interval(interval);
        let entry = Arc::new(CacheEntry::new(value, interval));
        self.entries.write().insert(key.clone(), Arc::clone(&entry));
        info!(key = %key, interval_ms = interval.as_millis() as u64, "cache entry registered");

        let snapshot = entry.current();
        self.tracker.spawn(refresh_loop(
            key,
            entry,
            loader,
            self.token.child_token(),
        ));
        Ok(snapshot)
    }

    /// Current snapshot for a registered key
    pub fn get(&self, key: &K) -> CacheResult<Arc<V>> {
        self.entry(key)
            .map(|entry| entry.current())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    pub fn has(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// When the snapshot for `key` was last published
    pub fn last_refreshed(&self, key: &K) -> Option<DateTime<Utc>> {
        self.entry(key).map(|entry| *entry.last_refreshed.read())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stop every refresh loop and wait for in-flight reloads to finish.
    /// Registration fails with `CacheError::Closed` afterwards.
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!(entries = self.len(), "refreshing cache shut down");
    }

    fn entry(&self, key: &K) -> Option<Arc<CacheEntry<V>>> {
        self.entries.read().get(key).cloned()
    }
}

async fn refresh_loop<K, V>(
    key: K,
    entry: Arc<CacheEntry<V>>,
    loader: Loader<V>,
    token: CancellationToken,
) where
    K: Display,
{
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(entry.interval) => {}
        }

        match loader().await {
            Ok(value) => {
                entry.publish(value);
                debug!(key = %key, "cache entry refreshed");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache refresh failed, keeping previous snapshot");
            }
        }
    }
    debug!(key = %key, "refresh loop stopped");
}
