//! Reactive Primitives
//!
//! This module implements the dependency-tracking runtime: tracked
//! containers, effects, computed caches, and the store that connects them.
//!
//! # Concepts
//!
//! ## Tracked containers
//!
//! [`reactive`] wraps plain JSON data in [`ReactiveObject`] /
//! [`ReactiveList`] handles. Reading through a handle inside a running
//! computation records a dependency; writing through a handle notifies the
//! computations whose last run read that member. Nested containers wrap
//! lazily, on first read.
//!
//! ## Effects
//!
//! [`effect`] registers an eager computation: it runs immediately and
//! re-runs, synchronously, whenever a dependency from its most recent run
//! is written. Effects are how the binding layer pushes data into the
//! rendered output.
//!
//! ## Computed caches
//!
//! [`computed`] builds a lazy memoized value on the same tracking
//! machinery. Invalidation only marks the cache dirty; the getter re-runs
//! on the next read. Dirtiness propagates transitively through chains of
//! caches.
//!
//! # Implementation Notes
//!
//! Dependency discovery is automatic: a thread-local
//! [`TrackingContext`] stack records which computation is running, and
//! every tracked read attributes itself to the top of that stack. The same
//! approach drives SolidJS, Vue 3 and Leptos.

mod computed;
mod context;
mod effect;
mod list;
mod object;
mod store;

pub use computed::Computed;
pub use context::TrackingContext;
pub use effect::Effect;
pub use list::ReactiveList;
pub use object::ReactiveObject;
pub use store::{Computation, ComputationHandle, DependencyStore, Key, SubscriberId, TargetId};

use crate::error::Error;
use crate::value::Value;

/// Wrap a value for dependency tracking.
///
/// JSON objects and arrays (or anything else convertible to a container
/// [`Value`]) come back as tracked containers. Passing an already-tracked
/// value is idempotent: the same handle comes back, never a second wrapper
/// over the same data. Primitives are a contract violation.
///
/// # Errors
///
/// [`Error::NotTrackable`] when the value is not an object or a list.
pub fn reactive(value: impl Into<Value>) -> Result<Value, Error> {
    match value.into() {
        value @ (Value::Object(_) | Value::List(_)) => Ok(value),
        other => Err(Error::NotTrackable {
            kind: other.type_name(),
        }),
    }
}

/// Register an effect that runs now and re-runs when its dependencies
/// change. The returned handle owns the effect; see [`Effect`].
pub fn effect<F>(run: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(run)
}

/// Create a lazily recomputed, memoized value; see [`Computed`].
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Computed::new(getter)
}

/// Record that the running computation depends on `(target, key)`.
///
/// Containers call this internally; it is exposed so the directive layer
/// can participate in tracking for state it manages outside any container
/// (synthetic iteration state, for instance).
pub fn track(target: TargetId, key: Key) {
    DependencyStore::track(target, key);
}

/// Notify the computations depending on `(target, key)`.
///
/// The write-side counterpart of [`track`].
pub fn trigger(target: TargetId, key: Key) {
    DependencyStore::trigger(target, key);
}
