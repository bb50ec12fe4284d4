//! Dependency Store
//!
//! The store is the process-wide registry that connects tracked containers
//! to the computations reading them. It keeps two tables:
//!
//! 1. A registry of live computations, held weakly so a dropped effect or
//!    computed cache never outlives its owner.
//!
//! 2. A dependents table mapping `(target, key)` pairs to the subscribers
//!    whose most recent execution read that pair.
//!
//! Reads call [`DependencyStore::track`] (a no-op outside a tracking
//! context); writes call [`DependencyStore::trigger`], which walks a
//! snapshot of the dependents set, marks every subscriber dirty, and runs
//! the eager ones. Snapshotting matters: a running computation may re-track
//! itself mid-notification, and that re-entrant mutation must not invalidate
//! the iteration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock, Weak};

/// Identity of a tracked container (or of a computed cache's value channel).
///
/// This is the store's first-level key: two handles sharing a `TargetId`
/// are views of the same tracked data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

impl TargetId {
    /// Allocate a fresh target identity.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value, for diagnostics.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a computation (an effect or a computed cache's driver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate a fresh subscriber identity.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A property key within a tracked target.
///
/// `Structure` is the synthetic channel notified by any mutation that
/// changes a container's shape (added/removed keys, length changes);
/// length- and iteration-dependent computations subscribe to it. `Value` is
/// the synthetic channel a computed cache triggers when it goes dirty, which
/// is what makes invalidation propagate through chains of caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named member of an object.
    Prop(String),
    /// A position in a list.
    Index(usize),
    /// Shape of the container: length and iteration order.
    Structure,
    /// A computed cache's own output.
    Value,
}

/// A computation that can be notified when one of its dependencies changes.
pub trait Computation: Send + Sync {
    /// The subscriber identity this computation tracks under.
    fn subscriber_id(&self) -> SubscriberId;

    /// A dependency changed; the computation's current output is stale.
    fn mark_dirty(&self);

    /// Run the computation now (eager computations only).
    fn schedule(&self);

    /// Whether a trigger should run this computation synchronously
    /// (effects) or merely dirty it for a later read (computed caches).
    fn is_eager(&self) -> bool;
}

/// Handle to a registered computation.
///
/// Dropping the handle unregisters the computation from the store.
pub struct ComputationHandle {
    subscriber_id: SubscriberId,
}

impl Drop for ComputationHandle {
    fn drop(&mut self) {
        DependencyStore::unregister(self.subscriber_id);
    }
}

/// The global dependency store.
pub struct DependencyStore;

// Registry of live computations. Weak references keep the store from
// extending any computation's lifetime.
static REGISTRY: OnceLock<RwLock<HashMap<SubscriberId, Weak<dyn Computation>>>> = OnceLock::new();
// Dependents of every (target, key) pair, grouped by target so a dropped
// container can purge all of its entries at once.
static DEPENDENTS: OnceLock<RwLock<HashMap<TargetId, HashMap<Key, Vec<SubscriberId>>>>> =
    OnceLock::new();

fn registry() -> &'static RwLock<HashMap<SubscriberId, Weak<dyn Computation>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn dependents() -> &'static RwLock<HashMap<TargetId, HashMap<Key, Vec<SubscriberId>>>> {
    DEPENDENTS.get_or_init(|| RwLock::new(HashMap::new()))
}

// Re-entrant cascades (a computation whose run writes something another
// computation reads, and vice versa) are bounded instead of overflowing the
// stack. Past this depth the trigger is dropped and an error is logged.
const MAX_TRIGGER_DEPTH: usize = 256;

thread_local! {
    static TRIGGER_DEPTH: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

impl DependencyStore {
    /// Register a computation, making it reachable for notification.
    ///
    /// Returns a handle that unregisters the computation when dropped.
    pub fn register(computation: std::sync::Arc<dyn Computation>) -> ComputationHandle {
        let id = computation.subscriber_id();

        registry()
            .write()
            .expect("registry lock poisoned")
            .insert(id, std::sync::Arc::downgrade(&computation));

        ComputationHandle { subscriber_id: id }
    }

    /// Unregister a computation and drop every dependency entry naming it.
    fn unregister(id: SubscriberId) {
        registry()
            .write()
            .expect("registry lock poisoned")
            .remove(&id);

        Self::clear_dependencies(id);
    }

    /// Record that the currently-active computation read `(target, key)`.
    ///
    /// No-op outside a tracking context.
    pub fn track(target: TargetId, key: Key) {
        let Some(subscriber) = super::context::TrackingContext::current_subscriber() else {
            return;
        };

        tracing::trace!(target_id = ?target, ?key, ?subscriber, "track");
        super::context::TrackingContext::record_read(target, key.clone());

        let mut table = dependents().write().expect("dependents lock poisoned");
        let entry = table.entry(target).or_default().entry(key).or_default();
        if !entry.contains(&subscriber) {
            entry.push(subscriber);
        }
    }

    /// Remove every dependency entry naming `subscriber`.
    ///
    /// Called before a computation re-runs, so its dependency set reflects
    /// only the most recent execution.
    pub fn clear_dependencies(subscriber: SubscriberId) {
        let mut table = dependents().write().expect("dependents lock poisoned");
        for keys in table.values_mut() {
            for subs in keys.values_mut() {
                subs.retain(|s| *s != subscriber);
            }
        }
    }

    /// Notify every computation depending on `(target, key)`.
    ///
    /// All dependents are marked dirty first; eager ones then run to
    /// completion, one at a time, before this call returns.
    pub fn trigger(target: TargetId, key: Key) {
        let depth = TRIGGER_DEPTH.with(|d| d.get());
        if depth >= MAX_TRIGGER_DEPTH {
            tracing::error!(
                target_id = ?target,
                ?key,
                depth,
                "trigger cascade exceeded maximum depth; dropping notification"
            );
            return;
        }

        // Snapshot the dependents set; handlers may re-track mid-iteration.
        let subscriber_ids: Vec<SubscriberId> = {
            let table = dependents().read().expect("dependents lock poisoned");
            match table.get(&target).and_then(|keys| keys.get(&key)) {
                Some(subs) => subs.clone(),
                None => return,
            }
        };

        if subscriber_ids.is_empty() {
            return;
        }

        tracing::trace!(target_id = ?target, ?key, count = subscriber_ids.len(), "trigger");

        // Upgrade outside of any notification work, then release the lock
        // before marking/running anything: handlers re-enter the store.
        let computations: Vec<std::sync::Arc<dyn Computation>> = {
            let registry = registry().read().expect("registry lock poisoned");
            subscriber_ids
                .iter()
                .filter_map(|id| registry.get(id).and_then(Weak::upgrade))
                .collect()
        };

        TRIGGER_DEPTH.with(|d| d.set(depth + 1));
        for computation in &computations {
            computation.mark_dirty();
        }
        for computation in &computations {
            if computation.is_eager() {
                computation.schedule();
            }
        }
        TRIGGER_DEPTH.with(|d| d.set(depth));
    }

    /// Drop every entry for `target`. Called when the last handle to a
    /// tracked container goes away, so the table cannot grow unboundedly.
    pub fn purge_target(target: TargetId) {
        dependents()
            .write()
            .expect("dependents lock poisoned")
            .remove(&target);
    }

    /// Number of subscribers currently recorded for `(target, key)`.
    /// Intended for tests and diagnostics.
    pub fn dependent_count(target: TargetId, key: &Key) -> usize {
        dependents()
            .read()
            .expect("dependents lock poisoned")
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map(Vec::len)
            .unwrap_or(0)
    }
}
