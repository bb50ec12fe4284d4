//! Computed Cache
//!
//! A computed cache is a lazy, memoized derived value. Its getter runs
//! inside a tracking frame like an effect's callback, but a dependency
//! trigger never re-runs it: the cache is merely marked dirty, and the next
//! [`Computed::value`] read recomputes. Ten invalidations with no read in
//! between cost nothing.
//!
//! # Transitive invalidation
//!
//! Each cache owns a target identity of its own, and reads of `value()`
//! track `(cache id, Key::Value)` for the computation performing the read.
//! When the cache goes dirty it triggers that same channel (once per
//! dirtying), so invalidation flows through arbitrarily long chains of
//! caches and finally re-runs the effects at the edge, with nobody wired to
//! the original source by hand.
//!
//! # Failure
//!
//! A getter may fail. A failed recompute leaves the cache dirty and
//! propagates the error to the reader; the next read retries. A stale value
//! is never served after a failed recompute.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::context::TrackingContext;
use super::store::{Computation, ComputationHandle, DependencyStore, Key, SubscriberId, TargetId};
use crate::error::Error;

/// A lazily recomputed, memoized value.
///
/// Cloning shares the cache; dropping the last clone unregisters it.
pub struct Computed<T> {
    inner: Arc<ComputedInner<T>>,
    _registration: Arc<ComputationHandle>,
}

struct ComputedInner<T> {
    /// The cache's own identity: readers depend on `(target_id, Value)`.
    target_id: TargetId,
    /// The identity the getter's reads track under.
    subscriber_id: SubscriberId,
    compute: Box<dyn Fn() -> Result<T, Error> + Send + Sync>,
    value: RwLock<Option<T>>,
    dirty: AtomicBool,
    compute_count: AtomicUsize,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cache over an infallible getter.
    ///
    /// The getter does not run here; the first read forces it.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_new(move || Ok(getter()))
    }

    /// Create a cache over a fallible getter.
    pub fn try_new<F>(getter: F) -> Self
    where
        F: Fn() -> Result<T, Error> + Send + Sync + 'static,
    {
        let inner = Arc::new(ComputedInner {
            target_id: TargetId::new(),
            subscriber_id: SubscriberId::new(),
            compute: Box::new(getter),
            value: RwLock::new(None),
            dirty: AtomicBool::new(true),
            compute_count: AtomicUsize::new(0),
        });

        let registration = DependencyStore::register(inner.clone());

        Self {
            inner,
            _registration: Arc::new(registration),
        }
    }

    /// Read the cached value, recomputing first if a dependency changed
    /// since the last read.
    ///
    /// Inside an outer computation, the read itself registers a dependency
    /// on this cache.
    pub fn value(&self) -> Result<T, Error> {
        DependencyStore::track(self.inner.target_id, Key::Value);

        if !self.inner.dirty.load(Ordering::SeqCst) {
            if let Some(value) = self
                .inner
                .value
                .read()
                .expect("value lock poisoned")
                .clone()
            {
                return Ok(value);
            }
        }

        self.inner.recompute()
    }

    /// The identity readers of this cache depend on. Exposed so the
    /// directive layer can `trigger(id, Key::Value)` for synthetic
    /// invalidation.
    pub fn target_id(&self) -> TargetId {
        self.inner.target_id
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Number of completed getter runs.
    pub fn compute_count(&self) -> usize {
        self.inner.compute_count.load(Ordering::SeqCst)
    }
}

impl<T> ComputedInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn recompute(&self) -> Result<T, Error> {
        DependencyStore::clear_dependencies(self.subscriber_id);

        let _frame = TrackingContext::enter(self.subscriber_id);

        // On failure the dirty flag stays set: the next read retries.
        let new_value = (self.compute)()?;

        *self.value.write().expect("value lock poisoned") = Some(new_value.clone());
        self.dirty.store(false, Ordering::SeqCst);
        self.compute_count.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(target_id = ?self.target_id, "computed cache refreshed");

        Ok(new_value)
    }
}

impl<T> Computation for ComputedInner<T>
where
    T: Send + Sync + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_dirty(&self) {
        // Trigger our own channel only on the clean -> dirty edge; an
        // already-dirty cache has told its dependents once already.
        if !self.dirty.swap(true, Ordering::SeqCst) {
            DependencyStore::trigger(self.target_id, Key::Value);
        }
    }

    fn schedule(&self) {
        // Lazy by design: recomputation happens on the next read.
    }

    fn is_eager(&self) -> bool {
        false
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _registration: Arc::clone(&self._registration),
        }
    }
}

impl<T> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("target_id", &self.inner.target_id)
            .field("dirty", &self.inner.dirty.load(Ordering::SeqCst))
            .field(
                "compute_count",
                &self.inner.compute_count.load(Ordering::SeqCst),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use crate::value::Value;
    use serde_json::json;
    use std::sync::atomic::AtomicI32;

    fn object(raw: serde_json::Value) -> crate::reactive::ReactiveObject {
        match Value::from(raw) {
            Value::Object(object) => object,
            other => panic!("expected an object, got {other:?}"),
        }
    }

    #[test]
    fn first_read_forces_evaluation() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls2 = calls.clone();

        let cached = Computed::new(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cached.is_dirty());

        assert_eq!(cached.value().expect("getter is infallible"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cached.is_dirty());
    }

    #[test]
    fn clean_reads_hit_the_cache() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls2 = calls.clone();

        let cached = Computed::new(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            "hello".to_string()
        });

        for _ in 0..5 {
            assert_eq!(cached.value().expect("getter is infallible"), "hello");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidation_is_lazy() {
        let o = object(json!({"n": 1}));
        let calls = Arc::new(AtomicI32::new(0));

        let o2 = o.clone();
        let calls2 = calls.clone();
        let doubled = Computed::new(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            o2.get("n").to_number() * 2.0
        });

        assert_eq!(doubled.value().expect("getter is infallible"), 2.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Many invalidations, zero reads: the getter must not run.
        for i in 2..10 {
            o.set("n", i);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(doubled.is_dirty());

        // The next read recomputes exactly once.
        assert_eq!(doubled.value().expect("getter is infallible"), 18.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn chained_caches_invalidate_transitively() {
        let o = object(json!({"x": 2}));

        let o2 = o.clone();
        let a = Computed::new(move || o2.get("x").to_number() * 10.0);

        let a2 = a.clone();
        let b = Computed::new(move || a2.value().expect("inner cache is infallible") + 1.0);

        assert_eq!(b.value().expect("getter is infallible"), 21.0);

        o.set("x", 3);
        assert!(a.is_dirty());
        assert!(b.is_dirty());
        assert_eq!(b.value().expect("getter is infallible"), 31.0);
    }

    #[test]
    fn effects_rerun_when_a_cache_they_read_goes_dirty() {
        let o = object(json!({"n": 1}));

        let o2 = o.clone();
        let squared = Computed::new(move || {
            let n = o2.get("n").to_number();
            n * n
        });

        let seen = Arc::new(AtomicI32::new(0));
        let seen2 = seen.clone();
        let squared2 = squared.clone();
        let _fx = Effect::new(move || {
            let value = squared2.value().expect("getter is infallible");
            seen2.store(value as i32, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        o.set("n", 4);
        assert_eq!(seen.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn failed_recompute_stays_dirty_and_retries() {
        let o = object(json!({"fail": true}));
        let calls = Arc::new(AtomicI32::new(0));

        let o2 = o.clone();
        let calls2 = calls.clone();
        let cached = Computed::try_new(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            if o2.get("fail").is_truthy() {
                Err(Error::NotTrackable { kind: "number" })
            } else {
                Ok(7)
            }
        });

        assert!(cached.value().is_err());
        assert!(cached.is_dirty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        o.set("fail", false);
        assert_eq!(cached.value().expect("getter succeeds now"), 7);
        assert!(!cached.is_dirty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn repeated_invalidation_triggers_dependents_once_per_dirtying() {
        let o = object(json!({"n": 1}));

        let o2 = o.clone();
        let cached = Computed::new(move || o2.get("n").to_number());

        let runs = Arc::new(AtomicI32::new(0));
        let runs2 = runs.clone();
        let cached2 = cached.clone();
        let _fx = Effect::new(move || {
            let _ = cached2.value();
            runs2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // The effect re-reads (and cleans) the cache on each run, so each
        // write dirties a clean cache and re-runs the effect exactly once.
        o.set("n", 2);
        o.set("n", 3);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
