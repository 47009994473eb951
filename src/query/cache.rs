//! `QueryCache`: the process-wide cache object.
//!
//! Construct it once, pass it (or a clone) wherever series are read, and call
//! [`QueryCache::shutdown`] when tearing the application down. Clones share
//! the same entries.

use super::source::{FetchResult, SeriesSource};
use super::subscription::QuerySubscription;
use super::{QueryConfig, Snapshot};
use crate::domain::series::MarketSeriesResponse;
use crate::error::FetchError;
use crate::shared::{Fingerprint, SeriesRequest};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct CacheEntry {
    request: SeriesRequest,
    data: Option<Arc<MarketSeriesResponse>>,
    fetched_at: Option<Instant>,
    error: Option<FetchError>,
    in_flight: Option<SharedFetch>,
    /// Identifies this entry across a `shutdown()` that recreates the fingerprint.
    epoch: u64,
    /// Identifies the fetch currently allowed to complete this entry.
    generation: u64,
    subscribers: usize,
    refresher: Option<JoinHandle<()>>,
    tx: watch::Sender<Snapshot>,
}

impl CacheEntry {
    fn new(request: SeriesRequest, epoch: u64) -> Self {
        let (tx, _) = watch::channel(Snapshot {
            is_stale: true,
            ..Snapshot::default()
        });
        Self {
            request,
            data: None,
            fetched_at: None,
            error: None,
            in_flight: None,
            epoch,
            generation: 0,
            subscribers: 0,
            refresher: None,
            tx,
        }
    }

    fn is_fresh(&self, stale_time: Duration) -> bool {
        self.fetched_at
            .map(|t| t.elapsed() < stale_time)
            .unwrap_or(false)
    }

    fn snapshot(&self, stale_time: Duration) -> Snapshot {
        Snapshot {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.in_flight.is_some(),
            is_stale: !self.is_fresh(stale_time),
        }
    }

    fn publish(&self, stale_time: Duration) {
        self.tx.send_replace(self.snapshot(stale_time));
    }

    fn stop_refresher(&mut self) {
        if let Some(handle) = self.refresher.take() {
            handle.abort();
        }
    }
}

pub(crate) struct Inner {
    source: Arc<dyn SeriesSource>,
    config: QueryConfig,
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
    next_generation: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Spawn the fetch for `entry` and mark it in flight.
    ///
    /// The fetch runs on its own task so it settles even if every waiter
    /// drops its future.
    fn start_fetch(this: &Arc<Inner>, fingerprint: &Fingerprint, entry: &mut CacheEntry) -> SharedFetch {
        let generation = this.next_id();
        entry.generation = generation;

        let task_inner = this.clone();
        let request = entry.request;
        let fp = fingerprint.clone();
        let handle = tokio::spawn(async move {
            let result = task_inner.fetch_with_retry(&fp, request).await;
            task_inner.complete(&fp, generation, &result);
            result
        });

        let weak = Arc::downgrade(this);
        let fp = fingerprint.clone();
        let shared = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let result = Err(FetchError::transport(format!("fetch task failed: {}", e)));
                    if let Some(inner) = weak.upgrade() {
                        inner.complete(&fp, generation, &result);
                    }
                    result
                }
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(shared.clone());
        entry.publish(this.config.stale_time);
        shared
    }

    async fn fetch_with_retry(&self, fingerprint: &Fingerprint, request: SeriesRequest) -> FetchResult {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            tracing::debug!(fingerprint = %fingerprint, attempt = attempt + 1, "Fetching series");
            match self.source.fetch(request).await {
                Ok(data) => return Ok(data),
                Err(e) if attempt < retry.max_retries => {
                    let delay = retry.delay_for_attempt(attempt);
                    tracing::debug!(
                        fingerprint = %fingerprint,
                        attempt = attempt + 1,
                        max = retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying series fetch: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        fingerprint = %fingerprint,
                        attempts = attempt + 1,
                        "Series fetch failed: {}",
                        e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Store a finished fetch. Failures keep the previous data.
    fn complete(&self, fingerprint: &Fingerprint, generation: u64, result: &FetchResult) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(fingerprint) else {
            return;
        };
        if entry.generation != generation {
            return;
        }
        entry.in_flight = None;
        match result {
            Ok(data) => {
                entry.data = Some(data.clone());
                entry.error = None;
                entry.fetched_at = Some(Instant::now());
            }
            Err(e) => entry.error = Some(e.clone()),
        }
        entry.publish(self.config.stale_time);
    }

    /// Join the running fetch for `fingerprint`, or start one.
    fn refresh(this: &Arc<Inner>, fingerprint: &Fingerprint) -> Option<SharedFetch> {
        let mut entries = this.lock();
        let entry = entries.get_mut(fingerprint)?;
        Some(match entry.in_flight.clone() {
            Some(pending) => pending,
            None => Inner::start_fetch(this, fingerprint, entry),
        })
    }

    pub(crate) fn snapshot_of(&self, fingerprint: &Fingerprint) -> Option<Snapshot> {
        self.lock()
            .get(fingerprint)
            .map(|e| e.snapshot(self.config.stale_time))
    }

    /// Snapshot of the entry a subscription was issued for, if it still exists.
    pub(crate) fn snapshot_for(&self, fingerprint: &Fingerprint, epoch: u64) -> Option<Snapshot> {
        self.lock()
            .get(fingerprint)
            .filter(|e| e.epoch == epoch)
            .map(|e| e.snapshot(self.config.stale_time))
    }

    pub(crate) fn retain(&self, fingerprint: &Fingerprint, epoch: u64) {
        if let Some(entry) = self.lock().get_mut(fingerprint) {
            if entry.epoch == epoch {
                entry.subscribers += 1;
            }
        }
    }

    /// Drop one subscriber; the last one out stops the background refresh.
    /// Handles issued for an entry that has since been dropped are ignored.
    pub(crate) fn release(&self, fingerprint: &Fingerprint, epoch: u64) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(fingerprint).filter(|e| e.epoch == epoch) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.stop_refresher();
                tracing::debug!(fingerprint = %fingerprint, "Background refresh stopped");
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let entries = self
            .entries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for entry in entries.values_mut() {
            entry.stop_refresher();
        }
    }
}

fn spawn_refresher(inner: Weak<Inner>, fingerprint: Fingerprint, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(strong) = inner.upgrade() else {
                break;
            };
            tracing::debug!(fingerprint = %fingerprint, "Background refresh");
            if Inner::refresh(&strong, &fingerprint).is_none() {
                break;
            }
        }
    })
}

// ═════════════════════════════════════════════════════════════════════════════
// QueryCache
// ═════════════════════════════════════════════════════════════════════════════

/// Deduplicating, retrying, self-refreshing cache of series results.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(source: impl SeriesSource, config: QueryConfig) -> Self {
        Self::with_source(Arc::new(source), config)
    }

    pub fn with_source(source: Arc<dyn SeriesSource>, config: QueryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    /// Current snapshot for `request`, fetching first when nothing fresh is cached.
    ///
    /// Joins a fetch already in flight for the same fingerprint instead of
    /// starting another.
    pub async fn get(&self, request: SeriesRequest) -> Snapshot {
        self.load(request, false).await
    }

    /// Like [`get`](Self::get) but ignores freshness. Still joins an in-flight fetch.
    pub async fn refetch(&self, request: SeriesRequest) -> Snapshot {
        self.load(request, true).await
    }

    async fn load(&self, request: SeriesRequest, force: bool) -> Snapshot {
        let fingerprint = request.fingerprint();
        let stale_time = self.inner.config.stale_time;
        let pending = {
            let mut entries = self.inner.lock();
            let entry = entries
                .entry(fingerprint.clone())
                .or_insert_with(|| CacheEntry::new(request.normalized(), self.inner.next_id()));
            match entry.in_flight.clone() {
                Some(pending) => pending,
                None if !force && entry.is_fresh(stale_time) => {
                    return entry.snapshot(stale_time);
                }
                None => Inner::start_fetch(&self.inner, &fingerprint, entry),
            }
        };

        let result = pending.await;
        match self.inner.snapshot_of(&fingerprint) {
            Some(snapshot) => snapshot,
            // Entry was cleared while the fetch ran.
            None => {
                let mut snapshot = Snapshot {
                    is_stale: true,
                    ..Snapshot::default()
                };
                match result {
                    Ok(data) => snapshot.data = Some(data),
                    Err(e) => snapshot.error = Some(e),
                }
                snapshot
            }
        }
    }

    /// Non-blocking read of whatever is cached.
    pub fn peek(&self, request: SeriesRequest) -> Snapshot {
        self.inner
            .snapshot_of(&request.fingerprint())
            .unwrap_or(Snapshot {
                is_stale: true,
                ..Snapshot::default()
            })
    }

    /// Subscribe to a fingerprint.
    ///
    /// The first subscriber starts a background refresh every
    /// `refetch_interval`; an initial fetch is kicked off when nothing fresh is
    /// cached. Dropping the last [`QuerySubscription`] stops the refresh.
    /// Must be called from within a Tokio runtime.
    pub fn watch(&self, request: SeriesRequest) -> QuerySubscription {
        let fingerprint = request.fingerprint();
        let config = &self.inner.config;
        let mut entries = self.inner.lock();
        let entry = entries
            .entry(fingerprint.clone())
            .or_insert_with(|| CacheEntry::new(request.normalized(), self.inner.next_id()));

        entry.subscribers += 1;
        let rx = entry.tx.subscribe();

        if entry.refresher.is_none() {
            tracing::debug!(fingerprint = %fingerprint, "Background refresh started");
            entry.refresher = Some(spawn_refresher(
                Arc::downgrade(&self.inner),
                fingerprint.clone(),
                config.refetch_interval,
            ));
        }
        if entry.in_flight.is_none() && !entry.is_fresh(config.stale_time) {
            Inner::start_fetch(&self.inner, &fingerprint, entry);
        }

        let epoch = entry.epoch;
        QuerySubscription::new(Arc::downgrade(&self.inner), fingerprint, epoch, rx)
    }

    /// Number of live subscriptions for `request`.
    pub fn subscriber_count(&self, request: SeriesRequest) -> usize {
        self.inner
            .lock()
            .get(&request.fingerprint())
            .map(|e| e.subscribers)
            .unwrap_or(0)
    }

    /// Mark the cached result stale so the next `get` refetches.
    pub fn invalidate(&self, request: SeriesRequest) {
        let stale_time = self.inner.config.stale_time;
        if let Some(entry) = self.inner.lock().get_mut(&request.fingerprint()) {
            entry.fetched_at = None;
            entry.publish(stale_time);
        }
    }

    /// Forget every cached result. Subscribed fingerprints stay registered
    /// and refill on their next refresh.
    pub fn clear(&self) {
        let stale_time = self.inner.config.stale_time;
        let mut entries = self.inner.lock();
        entries.retain(|_, e| e.subscribers > 0 || e.in_flight.is_some());
        for entry in entries.values_mut() {
            entry.data = None;
            entry.error = None;
            entry.fetched_at = None;
            entry.publish(stale_time);
        }
    }

    /// Remove entries nobody subscribes to and nothing is fetching.
    pub fn evict_unreferenced(&self) -> usize {
        let mut entries = self.inner.lock();
        let before = entries.len();
        entries.retain(|_, e| e.subscribers > 0 || e.in_flight.is_some());
        before - entries.len()
    }

    /// Stop every background refresh and drop all entries.
    ///
    /// Fetches already running settle on their own tasks; their results are
    /// discarded. Outstanding subscriptions see their stream end.
    pub fn shutdown(&self) {
        let mut entries = self.inner.lock();
        for entry in entries.values_mut() {
            entry.stop_refresher();
        }
        entries.clear();
        tracing::debug!("Query cache shut down");
    }
}
