use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{CacheEntry, CacheStore};
use crate::errors::EngineError;

type FlightOutcome = Option<Result<Value, EngineError>>;
type InFlight = Arc<Mutex<HashMap<String, watch::Receiver<FlightOutcome>>>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub joined: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
}

/// TTL cache in front of a [`CacheStore`] with per-key single-flight.
///
/// The first caller to miss a key becomes the leader: it registers a watch
/// channel under the key and runs the computation on a detached task. Callers
/// that miss while the flight is open subscribe to that channel instead of
/// computing. Dropping any caller, the leader included, never cancels the
/// computation, and its result is still written to the store.
///
/// The registry mutex is only taken to insert, clone or remove a receiver and
/// is never held across an await, so unrelated keys never wait on each other.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    in_flight: InFlight,
    counters: Arc<Counters>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store, in_flight: Arc::default(), counters: Arc::default() }
    }

    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        now: DateTime<Utc>,
        compute: F,
    ) -> Result<T, EngineError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        if let Some(payload) = fresh_payload(self.store.as_ref(), key, now).await {
            match serde_json::from_value::<T>(payload) {
                Ok(value) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(event_name = "cache.hit", cache_key = key, "served cached response");
                    return Ok(value);
                }
                Err(error) => {
                    warn!(
                        event_name = "cache.decode_failed",
                        cache_key = key,
                        error = %error,
                        "cached payload did not decode, recomputing"
                    );
                }
            }
        }

        let mut receiver = self.join_or_lead(key, ttl, now, compute);
        let outcome = {
            let settled = receiver.wait_for(Option::is_some).await.map_err(|_| {
                EngineError::Cache(format!("computation for `{key}` ended without a result"))
            })?;
            settled.clone()
        };

        let payload = outcome.unwrap_or_else(|| {
            Err(EngineError::Cache(format!("computation for `{key}` produced no outcome")))
        })?;
        serde_json::from_value(payload).map_err(|error| EngineError::Cache(error.to_string()))
    }

    /// Drop the stored entry for `key`. A flight already running for the key
    /// still stores its result when it finishes.
    pub async fn invalidate(&self, key: &str) -> Result<(), EngineError> {
        self.store.remove(key).await.map_err(|error| EngineError::Cache(error.to_string()))?;
        info!(event_name = "cache.invalidated", cache_key = key, "cache entry invalidated");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            joined: self.counters.joined.load(Ordering::Relaxed),
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn join_or_lead<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        now: DateTime<Utc>,
        compute: F,
    ) -> watch::Receiver<FlightOutcome>
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        let (sender, receiver) = {
            let mut flights = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = flights.get(key) {
                self.counters.joined.fetch_add(1, Ordering::Relaxed);
                debug!(
                    event_name = "cache.flight.joined",
                    cache_key = key,
                    "awaiting in-flight computation"
                );
                return existing.clone();
            }

            let (sender, receiver) = watch::channel(None);
            flights.insert(key.to_string(), receiver.clone());
            (sender, receiver)
        };

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(event_name = "cache.miss", cache_key = key, "starting computation");

        let task = compute();
        let store = Arc::clone(&self.store);
        let guard = FlightGuard { key: key.to_string(), in_flight: Arc::clone(&self.in_flight) };
        tokio::spawn(async move {
            let outcome = run_flight(store.as_ref(), &guard.key, ttl, now, task).await;
            if let Err(error) = &outcome {
                warn!(
                    event_name = "cache.flight.failed",
                    cache_key = %guard.key,
                    error = %error,
                    "computation failed, nothing cached"
                );
            }
            // Receivers may all be gone already; the store write above is what matters.
            let _ = sender.send(Some(outcome));
            drop(guard);
        });

        receiver
    }
}

async fn run_flight<T, Fut>(
    store: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    now: DateTime<Utc>,
    task: Fut,
) -> Result<Value, EngineError>
where
    T: Serialize,
    Fut: Future<Output = Result<T, EngineError>>,
{
    // A flight that closed between our lookup and registration may have just stored it.
    if let Some(payload) = fresh_payload(store, key, now).await {
        return Ok(payload);
    }

    let value = task.await?;
    let payload =
        serde_json::to_value(&value).map_err(|error| EngineError::Cache(error.to_string()))?;

    let entry = CacheEntry::new(key, payload.clone(), now, ttl);
    match store.put(entry).await {
        Ok(()) => info!(
            event_name = "cache.stored",
            cache_key = key,
            ttl_secs = ttl.as_secs(),
            "computed response cached"
        ),
        Err(error) => warn!(
            event_name = "cache.store_failed",
            cache_key = key,
            error = %error,
            "computed response could not be cached"
        ),
    }

    Ok(payload)
}

/// Fresh payload for `key`, or `None` when absent, expired or unreadable.
async fn fresh_payload(store: &dyn CacheStore, key: &str, now: DateTime<Utc>) -> Option<Value> {
    match store.get(key).await {
        Ok(Some(entry)) if entry.is_fresh(now) => Some(entry.payload),
        Ok(Some(_)) => {
            debug!(event_name = "cache.expired", cache_key = key, "cached entry expired");
            None
        }
        Ok(None) => None,
        Err(error) => {
            warn!(
                event_name = "cache.lookup_failed",
                cache_key = key,
                error = %error,
                "cache store lookup failed, computing"
            );
            None
        }
    }
}

/// Removes the flight registration even if the computation panics.
struct FlightGuard {
    key: String,
    in_flight: InFlight,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.key);
    }
}
