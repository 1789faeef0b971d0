//! Single-flight computation coalescing
//!
//! Deduplicates concurrent requests for the same expensive computation: the
//! first caller for a key starts the work, every caller arriving before it
//! completes attaches to the same in-flight future, and all of them receive
//! the same result. Failures and unusable (empty) results degrade to the last
//! known good value for that key, or to a fixed default when there is none;
//! waiters never see a hard failure from this primitive.

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Outcome carried by the shared future; errors are stringified so the
/// future's output stays `Clone`.
type FlightOutcome<T> = Result<T, String>;

struct Flight<T: Clone> {
    id: u64,
    shared: Shared<BoxFuture<'static, FlightOutcome<T>>>,
}

impl<T: Clone> Clone for Flight<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: self.shared.clone(),
        }
    }
}

/// Per-key coalescer with last-known-good fallback
pub struct SingleFlight<T: Clone + Send + Sync + 'static> {
    in_flight: Mutex<HashMap<String, Flight<T>>>,
    last_good: Mutex<HashMap<String, T>>,
    /// Total invocations, for diagnostics and log ordering
    calls: AtomicU64,
    default: T,
    usable: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    /// Create a coalescer
    ///
    /// `default` is returned when a computation fails with no prior success;
    /// `usable` decides whether a successful result is worth caching (e.g.
    /// non-empty).
    pub fn new(default: T, usable: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            last_good: Mutex::new(HashMap::new()),
            calls: AtomicU64::new(0),
            default,
            usable: Box::new(usable),
        }
    }

    /// Run `compute` for `key`, or attach to the in-flight run for `key`
    ///
    /// If another computation for the same key is already running, `compute`
    /// is dropped unpolled and the caller receives that computation's result.
    pub async fn invoke<F>(&self, key: &str, compute: F) -> T
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let (flight, leader) = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(existing) = in_flight.get(key) {
                (existing.clone(), false)
            } else {
                let flight = Flight {
                    id: call,
                    shared: compute.map(|r| r.map_err(|e| e.to_string())).boxed().shared(),
                };
                in_flight.insert(key.to_string(), flight.clone());
                (flight, true)
            }
        };

        if !leader {
            tracing::debug!(call, key, "attaching to in-flight computation");
        }

        let outcome = flight.shared.clone().await;
        self.settle(key, flight.id, outcome)
    }

    /// Total number of `invoke` calls so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Last usable result cached for `key`
    pub fn last_good(&self, key: &str) -> Option<T> {
        self.last_good.lock().unwrap().get(key).cloned()
    }

    fn settle(&self, key: &str, flight_id: u64, outcome: FlightOutcome<T>) -> T {
        // Every waiter settles; only the entry for this flight is cleared.
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if in_flight.get(key).map(|f| f.id) == Some(flight_id) {
                in_flight.remove(key);
            }
        }

        match outcome {
            Ok(value) if (self.usable)(&value) => {
                self.last_good
                    .lock()
                    .unwrap()
                    .insert(key.to_string(), value.clone());
                value
            }
            Ok(_) => {
                tracing::debug!(key, "computation returned an unusable result, falling back");
                self.fallback_for(key)
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "computation failed, falling back");
                self.fallback_for(key)
            }
        }
    }

    fn fallback_for(&self, key: &str) -> T {
        self.last_good
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
