//! Temperature cache with per-city request coalescing.
//!
//! Entries live for a fixed TTL and are checked at read time. A miss for a
//! city starts at most one forecast fetch; concurrent callers for the same
//! city await that fetch instead of issuing their own. Failed fetches are
//! never stored, so the next request tries again. An optional fetch limit
//! bounds concurrent upstream calls; only the task running a fetch holds a
//! permit, callers joining it do not.

use chrono::{DateTime, TimeDelta, Utc};
use common::models::Coordinates;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::api_client::{FetchResult, ForecastClient};

/// Source of the current time for TTL checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    temperature: f64,
    fetched_at: DateTime<Utc>,
}

type InFlight = Shared<BoxFuture<'static, Option<f64>>>;

struct Inner {
    entries: RwLock<HashMap<i64, CacheEntry>>,
    in_flight: Mutex<HashMap<i64, InFlight>>,
    client: Arc<dyn ForecastClient>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    fetch_permits: Semaphore,
}

/// Shared handle to the process-wide temperature cache. Cloning is cheap.
#[derive(Clone)]
pub struct TemperatureCache {
    inner: Arc<Inner>,
}

impl TemperatureCache {
    pub fn new(client: Arc<dyn ForecastClient>, ttl: Duration) -> Self {
        Self::with_clock(client, ttl, Arc::new(SystemClock))
    }

    /// At most `max_fetches` upstream calls run at once across all cities.
    pub fn with_fetch_limit(
        client: Arc<dyn ForecastClient>,
        ttl: Duration,
        max_fetches: usize,
    ) -> Self {
        Self::build(client, ttl, Arc::new(SystemClock), max_fetches)
    }

    pub fn with_clock(client: Arc<dyn ForecastClient>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::build(client, ttl, clock, Semaphore::MAX_PERMITS)
    }

    fn build(
        client: Arc<dyn ForecastClient>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
        max_fetches: usize,
    ) -> Self {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let max_fetches = max_fetches.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                client,
                clock,
                ttl,
                fetch_permits: Semaphore::new(max_fetches),
            }),
        }
    }

    /// Cached temperature for the city if it is still fresh. Never fetches.
    pub fn peek(&self, city_id: i64) -> Option<f64> {
        self.inner.fresh(city_id)
    }

    /// Cached temperature if fresh, otherwise a fetch (shared with any
    /// fetch already running for the same city). `None` means no data:
    /// the city has no coordinates or the provider call failed.
    #[instrument(skip(self, coords))]
    pub async fn get_temperature(&self, city_id: i64, coords: Option<Coordinates>) -> Option<f64> {
        if let Some(temperature) = self.inner.fresh(city_id) {
            debug!(city_id, "Cache hit");
            return Some(temperature);
        }

        let Some(coords) = coords else {
            debug!(city_id, "No coordinates, skipping fetch");
            return None;
        };

        self.join_or_start(city_id, coords).await
    }

    fn join_or_start(&self, city_id: i64, coords: Coordinates) -> InFlight {
        let mut in_flight = lock(&self.inner.in_flight);

        if let Some(pending) = in_flight.get(&city_id) {
            debug!(city_id, "Joining in-flight fetch");
            return pending.clone();
        }

        // A fetch may have settled between the first read and taking the lock.
        if let Some(temperature) = self.inner.fresh(city_id) {
            return futures::future::ready(Some(temperature)).boxed().shared();
        }

        let inner = self.inner.clone();
        let handle = tokio::spawn(
            async move { inner.refresh(city_id, coords).await }.in_current_span(),
        );
        let pending = async move {
            handle.await.unwrap_or_else(|e| {
                error!(city_id, error = %e, "Forecast fetch task failed");
                None
            })
        }
        .boxed()
        .shared();

        in_flight.insert(city_id, pending.clone());
        pending
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let before = entries.len();
        entries.retain(|_, entry| self.inner.is_fresh(entry, now));
        before - entries.len()
    }

    /// Periodically purge expired entries until the token is cancelled.
    pub fn spawn_eviction(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Cache eviction stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            info!(removed, remaining = cache.len(), "Purged expired temperatures");
                        }
                    }
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        lock(&self.inner.in_flight).len()
    }
}

impl Inner {
    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.fetched_at) < self.ttl
    }

    fn fresh(&self, city_id: i64) -> Option<f64> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&city_id)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.temperature)
    }

    async fn refresh(self: Arc<Self>, city_id: i64, coords: Coordinates) -> Option<f64> {
        let _guard = InFlightGuard {
            inner: self.clone(),
            city_id,
        };

        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self.fetch_permits.acquire().await.ok();

        match self.client.fetch_current_temperature(coords).await {
            FetchResult::Ok(temperature) => {
                let entry = CacheEntry {
                    temperature,
                    fetched_at: self.clock.now(),
                };
                self.entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(city_id, entry);
                Some(temperature)
            }
            outcome => {
                warn!(city_id, ?outcome, "No temperature available, not caching");
                None
            }
        }
    }
}

/// Clears the in-flight slot once a fetch settles, after any cache write.
struct InFlightGuard {
    inner: Arc<Inner>,
    city_id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.inner.in_flight).remove(&self.city_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
