//! Single-flight LRU cache of entitlement sets.
//!
//! Keyed by [`Fingerprint`], so contracts with the same selection share one
//! entry. Concurrent misses on one key trigger exactly one computation: the
//! first caller spawns it, later callers subscribe to its result. The
//! computation runs on its own task, so a caller that gives up only drops
//! its subscription and the remaining waiters still get the result.
//!
//! Entries never go stale on their own (pricing versions are immutable);
//! they leave the cache through LRU pressure or an explicit eviction. Evicting
//! a key that is being computed is deferred: the waiters get their result,
//! but it is not stored.
//!
//! ```text
//!  get_or_compute(fp)
//!        |
//!   entries hit? --yes--> Arc<EntitlementSet>
//!        | no
//!   in flight? --yes--> subscribe --------------.
//!        | no                                    |
//!   register + spawn(timeout(compute)) --> broadcast result
//!                                        (stored unless evicted/failed)
//! ```

use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use lru::LruCache;
use serde::Serialize;
use tokio::sync::broadcast;

use super::{EntitlementSet, Fingerprint};
use crate::{
    catalog::PricingVersionRef,
    error::{EngineError, Result},
};

type Shared = Result<Arc<EntitlementSet>>;

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from a stored entry.
    pub hits: u64,
    /// Lookups that found no stored entry.
    pub misses: u64,
    /// Computations started.
    pub computations: u64,
    /// Entries removed by LRU pressure or explicit eviction.
    pub evictions: u64,
    /// Entries currently stored.
    pub entries: usize,
    /// Computations currently running.
    pub in_flight: usize,
}

/// Single-flight, bounded entitlement cache.
///
/// Cheap to clone; clones share state.
///
/// # Examples
///
/// ```
/// use std::{collections::BTreeMap, num::NonZeroUsize, time::Duration};
///
/// use contract_engine::{
///     catalog::{PricingVersion, PricingVersionRef},
///     entitlements::{EntitlementCache, Fingerprint, evaluate},
/// };
///
/// # async fn example(pricing: PricingVersion) -> contract_engine::Result<()> {
/// let cache = EntitlementCache::new(NonZeroUsize::new(128).unwrap(), Duration::from_secs(5));
/// let add_ons = BTreeMap::new();
/// let reference = pricing.reference();
/// let fingerprint = Fingerprint::compute(&reference, "basic", &add_ons);
///
/// let set = cache
///     .get_or_compute(&fingerprint, &reference, move || async move {
///         evaluate(&pricing, "basic", &add_ons)
///     })
///     .await?;
/// assert_eq!(set.plan, "basic");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EntitlementCache {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    state: Mutex<CacheState>,
    compute_timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Debug)]
struct CacheState {
    entries: LruCache<Fingerprint, Arc<EntitlementSet>>,
    in_flight: HashMap<Fingerprint, InFlight>,
}

#[derive(Debug)]
struct InFlight {
    sender: broadcast::Sender<Shared>,
    pricing: PricingVersionRef,
    evict_on_completion: bool,
}

enum Lookup {
    Hit(Arc<EntitlementSet>),
    Wait(broadcast::Receiver<Shared>),
    Lead(broadcast::Receiver<Shared>),
}

impl EntitlementCache {
    /// Creates a cache holding at most `capacity` sets.
    ///
    /// `compute_timeout` bounds both a computation and how long any caller
    /// waits for one.
    #[must_use]
    pub fn new(capacity: NonZeroUsize, compute_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState {
                    entries: LruCache::new(capacity),
                    in_flight: HashMap::new(),
                }),
                compute_timeout,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                computations: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the cached set for `fingerprint`, computing it at most once
    /// across concurrent callers.
    ///
    /// `compute` is only invoked by the caller that starts the computation;
    /// its future runs on a spawned task bounded by the compute timeout.
    /// Failed computations are delivered to every waiter and never stored.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ComputationTimeout`] if the result does not arrive in
    ///   time
    /// - [`EngineError::Internal`] if the computation panicked
    /// - any error returned by `compute`
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        pricing: &PricingVersionRef,
        compute: F,
    ) -> Result<Arc<EntitlementSet>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<EntitlementSet>> + Send + 'static,
    {
        let mut receiver = match self.lookup(fingerprint, pricing)? {
            Lookup::Hit(set) => return Ok(set),
            Lookup::Wait(receiver) => {
                tracing::debug!(fingerprint = fingerprint.short(), "Joining in-flight computation");
                receiver
            }
            Lookup::Lead(receiver) => {
                // Armed before `compute` runs so a panic there still clears the flight.
                let guard = self.flight_guard(fingerprint.clone());
                self.spawn_computation(guard, compute());
                receiver
            }
        };

        let timeout = self.inner.compute_timeout;
        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                Err(EngineError::Internal("entitlement computation ended without a result".into()))
            }
            Err(_) => {
                tracing::warn!(
                    fingerprint = fingerprint.short(),
                    timeout_ms = timeout.as_millis(),
                    "Timed out waiting for entitlement computation"
                );
                Err(EngineError::ComputationTimeout(timeout))
            }
        }
    }

    /// Returns the stored set without computing or touching recency.
    #[must_use]
    pub fn peek(&self, fingerprint: &Fingerprint) -> Option<Arc<EntitlementSet>> {
        self.inner.lock().entries.peek(fingerprint).cloned()
    }

    /// Removes one entry.
    ///
    /// If the key is being computed, the result is delivered but not stored.
    /// Returns `true` if an entry was removed or a computation was marked.
    pub fn evict(&self, fingerprint: &Fingerprint) -> bool {
        let mut state = self.inner.lock();
        let removed = state.entries.pop(fingerprint).is_some();
        if removed {
            self.inner.evictions.fetch_add(1, Ordering::Relaxed);
        }
        let deferred = state.in_flight.get_mut(fingerprint).is_some_and(|flight| {
            flight.evict_on_completion = true;
            true
        });
        drop(state);

        if removed || deferred {
            tracing::debug!(fingerprint = fingerprint.short(), deferred, "Evicted entitlement set");
        }
        removed || deferred
    }

    /// Removes every entry computed from `pricing`, deferring in-flight ones.
    ///
    /// Returns the number of entries removed plus computations marked.
    pub fn evict_pricing_version(&self, pricing: &PricingVersionRef) -> usize {
        let mut state = self.inner.lock();
        let stale: Vec<Fingerprint> = state
            .entries
            .iter()
            .filter(|(_, set)| set.pricing == *pricing)
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect();
        for fingerprint in &stale {
            state.entries.pop(fingerprint);
        }
        let mut deferred = 0;
        for flight in state.in_flight.values_mut().filter(|flight| flight.pricing == *pricing) {
            flight.evict_on_completion = true;
            deferred += 1;
        }
        drop(state);

        self.inner.evictions.fetch_add(stale.len() as u64, Ordering::Relaxed);
        tracing::info!(
            pricing = %pricing,
            removed = stale.len(),
            deferred,
            "Evicted entitlement sets for pricing version"
        );
        stale.len() + deferred
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (entries, in_flight) = {
            let state = self.inner.lock();
            (state.entries.len(), state.in_flight.len())
        };
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            computations: self.inner.computations.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            entries,
            in_flight,
        }
    }

    /// Configured compute timeout.
    #[must_use]
    pub fn compute_timeout(&self) -> Duration {
        self.inner.compute_timeout
    }

    fn lookup(&self, fingerprint: &Fingerprint, pricing: &PricingVersionRef) -> Result<Lookup> {
        let mut state = self
            .inner
            .state
            .lock()
            .map_err(|_| EngineError::Internal("entitlement cache lock poisoned".into()))?;

        if let Some(set) = state.entries.get(fingerprint) {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Lookup::Hit(Arc::clone(set)));
        }
        self.inner.misses.fetch_add(1, Ordering::Relaxed);

        if let Some(flight) = state.in_flight.get(fingerprint) {
            return Ok(Lookup::Wait(flight.sender.subscribe()));
        }

        let (sender, receiver) = broadcast::channel(1);
        state.in_flight.insert(
            fingerprint.clone(),
            InFlight { sender, pricing: pricing.clone(), evict_on_completion: false },
        );
        Ok(Lookup::Lead(receiver))
    }

    fn flight_guard(&self, fingerprint: Fingerprint) -> FlightGuard {
        FlightGuard { inner: Arc::clone(&self.inner), fingerprint, finished: false }
    }

    fn spawn_computation<Fut>(&self, guard: FlightGuard, computation: Fut)
    where
        Fut: Future<Output = Result<EntitlementSet>> + Send + 'static,
    {
        self.inner.computations.fetch_add(1, Ordering::Relaxed);
        let timeout = self.inner.compute_timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, computation).await {
                Ok(Ok(set)) => Ok(Arc::new(set)),
                Ok(Err(error)) => Err(error),
                Err(_) => Err(EngineError::ComputationTimeout(timeout)),
            };
            guard.finish(result);
        });
    }
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, fingerprint: &Fingerprint, result: Shared) {
        let mut state = self.lock();
        let Some(flight) = state.in_flight.remove(fingerprint) else {
            return;
        };

        match &result {
            Ok(set) if !flight.evict_on_completion => {
                if let Some((evicted, _)) = state.entries.push(fingerprint.clone(), Arc::clone(set))
                    && evicted != *fingerprint
                {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
            Ok(_) => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                tracing::warn!(fingerprint = fingerprint.short(), error = %error, "Entitlement computation failed");
            }
        }

        // No receivers left is fine: every caller gave up.
        let _ = flight.sender.send(result);
    }
}

/// Completes the in-flight entry even if the computation panics.
struct FlightGuard {
    inner: Arc<CacheInner>,
    fingerprint: Fingerprint,
    finished: bool,
}

impl FlightGuard {
    fn finish(mut self, result: Shared) {
        self.finished = true;
        self.inner.complete(&self.fingerprint, result);
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.complete(
                &self.fingerprint,
                Err(EngineError::Internal("entitlement computation panicked".into())),
            );
        }
    }
}
