//! Effect
//!
//! An effect is an eager computation: it runs once at registration to
//! discover its dependency set, then re-runs synchronously whenever any
//! tracked value it read during its most recent run is written.
//!
//! # Execution protocol
//!
//! 1. Prune every dependency entry left over from the previous run;
//!    without this, dependency sets grow without bound and a branch the
//!    effect no longer takes keeps triggering it.
//! 2. Enter a tracking frame, run the callback, and record the reads the
//!    frame observed.
//! 3. Exit the frame (drop guard, so the frame pops even on panic).
//!
//! # Re-entrancy
//!
//! An effect that writes a value it also reads would otherwise re-enter
//! itself forever. The policy here: while an effect is running, triggers
//! aimed at it are skipped. The write still lands and still notifies other
//! computations; only the self-notification is dropped. Mutual cycles
//! between distinct effects are bounded by the store's trigger-depth guard.
//!
//! There is no teardown hook beyond [`Effect::dispose`]; callbacks must be
//! safe to re-run indefinitely.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::context::TrackingContext;
use super::store::{Computation, ComputationHandle, DependencyStore, Key, SubscriberId, TargetId};

/// An eager computation that re-runs when its dependencies change.
///
/// The handle owns the computation: cloning shares it, dropping the last
/// clone unregisters it and stops further re-runs.
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
    _registration: Arc<ComputationHandle>,
}

struct EffectInner {
    subscriber_id: SubscriberId,
    run: Box<dyn Fn() + Send + Sync>,
    /// Dependencies observed by the most recent run.
    dependencies: RwLock<HashSet<(TargetId, Key)>>,
    disposed: AtomicBool,
    running: AtomicBool,
    run_count: AtomicUsize,
}

/// Clears the running flag even if the callback panics.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Effect {
    /// Register an effect and run it immediately.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            subscriber_id: SubscriberId::new(),
            run: Box::new(run),
            dependencies: RwLock::new(HashSet::new()),
            disposed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let registration = DependencyStore::register(inner.clone());

        // First run discovers the initial dependency set.
        inner.execute();

        Self {
            inner,
            _registration: Arc::new(registration),
        }
    }

    /// The subscriber identity this effect tracks under.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Number of dependencies observed by the most recent run.
    pub fn dependency_count(&self) -> usize {
        self.inner
            .dependencies
            .read()
            .expect("dependencies lock poisoned")
            .len()
    }

    /// Whether the most recent run read `(target, key)`.
    pub fn depends_on(&self, target: TargetId, key: &Key) -> bool {
        self.inner
            .dependencies
            .read()
            .expect("dependencies lock poisoned")
            .contains(&(target, key.clone()))
    }

    /// Permanently stop the effect. Subsequent triggers are ignored.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    /// Whether the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        DependencyStore::clear_dependencies(self.subscriber_id);

        self.running.store(true, Ordering::SeqCst);
        let _running = RunningGuard(&self.running);

        let reads = {
            let _frame = TrackingContext::enter(self.subscriber_id);
            (self.run)();
            TrackingContext::current_reads()
        };

        *self
            .dependencies
            .write()
            .expect("dependencies lock poisoned") = reads.into_iter().collect();
        self.run_count.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            subscriber = ?self.subscriber_id,
            dependencies = self.dependency_count_inner(),
            "effect ran"
        );
    }

    fn dependency_count_inner(&self) -> usize {
        self.dependencies
            .read()
            .expect("dependencies lock poisoned")
            .len()
    }
}

impl Computation for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_dirty(&self) {
        // Effects hold no cached output; re-running is the whole story.
    }

    fn schedule(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if self.running.load(Ordering::SeqCst) {
            tracing::trace!(
                subscriber = ?self.subscriber_id,
                "skipping re-entrant trigger of a running effect"
            );
            return;
        }
        self.execute();
    }

    fn is_eager(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
