//! Reactive List
//!
//! The sequence half of the proxy factory. Indexed reads track per-position
//! keys; structural mutation (push/pop/insert/remove, or a write past the
//! end) additionally notifies the synthetic `Structure` key that length-
//! and iteration-dependent computations subscribe to. Indexed writes and
//! iteration need those separate channels: a loop body re-renders when the
//! list grows, not when some unrelated position it never read changes.
//!
//! Writes past the end extend the list, filling the gap with `Undefined`,
//! so assignment through a resolved binding path can grow a sequence.

use std::fmt;
use std::sync::{Arc, RwLock};

use super::store::{DependencyStore, Key, TargetId};
use crate::value::{Slot, Value};

/// A tracked ordered sequence.
#[derive(Clone)]
pub struct ReactiveList {
    state: Arc<ListState>,
}

struct ListState {
    id: TargetId,
    items: RwLock<Vec<Slot>>,
}

impl Drop for ListState {
    fn drop(&mut self) {
        DependencyStore::purge_target(self.id);
    }
}

impl ReactiveList {
    /// Create an empty tracked list.
    pub fn new() -> Self {
        Self::from_slots(Vec::new())
    }

    /// Wrap a raw JSON array. Items stay raw until first read.
    pub(crate) fn from_raw(items: Vec<serde_json::Value>) -> Self {
        Self::from_slots(items.into_iter().map(Slot::Raw).collect())
    }

    /// Build a tracked list from already-live values.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::from_slots(values.into_iter().map(Slot::Live).collect())
    }

    fn from_slots(items: Vec<Slot>) -> Self {
        Self {
            state: Arc::new(ListState {
                id: TargetId::new(),
                items: RwLock::new(items),
            }),
        }
    }

    /// This list's identity in the dependency store.
    pub fn id(&self) -> TargetId {
        self.state.id
    }

    /// Read a position, recording a dependency for the running computation.
    ///
    /// Out-of-range reads return `Undefined` (and still track, so the
    /// reader re-runs if the list later grows into that position).
    pub fn get(&self, index: usize) -> Value {
        DependencyStore::track(self.state.id, Key::Index(index));
        let mut items = self.state.items.write().expect("items lock poisoned");
        match items.get_mut(index) {
            Some(slot) => slot.live().clone(),
            None => Value::Undefined,
        }
    }

    /// Read a position without registering a dependency.
    pub fn get_untracked(&self, index: usize) -> Value {
        let mut items = self.state.items.write().expect("items lock poisoned");
        match items.get_mut(index) {
            Some(slot) => slot.live().clone(),
            None => Value::Undefined,
        }
    }

    /// Write a position and notify its dependents.
    ///
    /// Unchanged in-range writes notify nobody. Writes past the end extend
    /// the list (holes fill with `Undefined`) and notify `Structure`.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();

        enum Outcome {
            Unchanged,
            InPlace,
            Extended,
        }

        let outcome = {
            let mut items = self.state.items.write().expect("items lock poisoned");
            if index < items.len() {
                if items[index].live().value_eq(&value) {
                    Outcome::Unchanged
                } else {
                    items[index] = Slot::Live(value);
                    Outcome::InPlace
                }
            } else {
                items.resize_with(index, || Slot::Live(Value::Undefined));
                items.push(Slot::Live(value));
                Outcome::Extended
            }
        };

        match outcome {
            Outcome::Unchanged => {}
            Outcome::InPlace => {
                DependencyStore::trigger(self.state.id, Key::Index(index));
            }
            Outcome::Extended => {
                DependencyStore::trigger(self.state.id, Key::Index(index));
                DependencyStore::trigger(self.state.id, Key::Structure);
            }
        }
    }

    /// Append a value. Notifies the new position and `Structure`.
    pub fn push(&self, value: impl Into<Value>) {
        let index = {
            let mut items = self.state.items.write().expect("items lock poisoned");
            items.push(Slot::Live(value.into()));
            items.len() - 1
        };
        DependencyStore::trigger(self.state.id, Key::Index(index));
        DependencyStore::trigger(self.state.id, Key::Structure);
    }

    /// Remove and return the last value (`Undefined` if empty). Notifies
    /// the vacated position and `Structure`.
    pub fn pop(&self) -> Value {
        let popped = {
            let mut items = self.state.items.write().expect("items lock poisoned");
            items.pop().map(|slot| (items.len(), slot))
        };

        match popped {
            Some((index, mut slot)) => {
                let value = slot.live().clone();
                DependencyStore::trigger(self.state.id, Key::Index(index));
                DependencyStore::trigger(self.state.id, Key::Structure);
                value
            }
            None => Value::Undefined,
        }
    }

    /// Insert a value at `index`, shifting later items. Every shifted
    /// position is notified, then `Structure`. Inserting past the end
    /// behaves like [`set`](Self::set).
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();

        let new_len = {
            let mut items = self.state.items.write().expect("items lock poisoned");
            if index >= items.len() {
                drop(items);
                self.set(index, value);
                return;
            }
            items.insert(index, Slot::Live(value));
            items.len()
        };

        for shifted in index..new_len {
            DependencyStore::trigger(self.state.id, Key::Index(shifted));
        }
        DependencyStore::trigger(self.state.id, Key::Structure);
    }

    /// Remove and return the value at `index` (`Undefined` when out of
    /// range). Every shifted position, the vacated tail position, and
    /// `Structure` are notified.
    pub fn remove(&self, index: usize) -> Value {
        let removed = {
            let mut items = self.state.items.write().expect("items lock poisoned");
            if index >= items.len() {
                None
            } else {
                Some((items.remove(index), items.len() + 1))
            }
        };

        match removed {
            Some((mut slot, old_len)) => {
                let value = slot.live().clone();
                for shifted in index..old_len {
                    DependencyStore::trigger(self.state.id, Key::Index(shifted));
                }
                DependencyStore::trigger(self.state.id, Key::Structure);
                value
            }
            None => Value::Undefined,
        }
    }

    /// Number of items. Structure-tracked.
    pub fn len(&self) -> usize {
        DependencyStore::track(self.state.id, Key::Structure);
        self.state.items.read().expect("items lock poisoned").len()
    }

    /// Whether the list is empty. Structure-tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all items. Structure-tracked; the iteration surface used
    /// for rendering loops.
    pub fn to_vec(&self) -> Vec<Value> {
        DependencyStore::track(self.state.id, Key::Structure);
        self.snapshot()
    }

    /// Snapshot without registering dependencies.
    pub fn to_vec_untracked(&self) -> Vec<Value> {
        self.snapshot()
    }

    fn snapshot(&self) -> Vec<Value> {
        let mut items = self.state.items.write().expect("items lock poisoned");
        items.iter_mut().map(|slot| slot.live().clone()).collect()
    }

    /// Snapshot as plain JSON, without registering dependencies.
    pub fn to_json(&self) -> serde_json::Value {
        let items = self.state.items.read().expect("items lock poisoned");
        serde_json::Value::Array(items.iter().map(Slot::to_json).collect())
    }
}

impl Default for ReactiveList {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ReactiveList {
    fn eq(&self, other: &Self) -> bool {
        self.state.id == other.state.id
    }
}

impl Eq for ReactiveList {}

impl fmt::Debug for ReactiveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveList")
            .field("id", &self.state.id)
            .field("len", &self.state.items.read().expect("items lock poisoned").len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn list(raw: serde_json::Value) -> ReactiveList {
        match Value::from(raw) {
            Value::List(list) => list,
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn indexed_reads_and_out_of_range() {
        let l = list(json!([1, 2]));
        assert_eq!(l.get(0), Value::Number(1.0));
        assert_eq!(l.get(5), Value::Undefined);
    }

    #[test]
    fn writes_past_the_end_extend_with_holes() {
        let l = list(json!(["a"]));
        l.set(3, "d");
        assert_eq!(l.len(), 4);
        assert_eq!(l.get(1), Value::Undefined);
        assert_eq!(l.get(3), Value::Str("d".into()));
    }

    #[test]
    fn push_and_pop_notify_length_watchers() {
        let l = list(json!([]));
        let lengths = Arc::new(AtomicUsize::new(usize::MAX));

        let l2 = l.clone();
        let lengths2 = lengths.clone();
        let _fx = Effect::new(move || {
            lengths2.store(l2.len(), Ordering::SeqCst);
        });
        assert_eq!(lengths.load(Ordering::SeqCst), 0);

        l.push(1);
        assert_eq!(lengths.load(Ordering::SeqCst), 1);

        assert_eq!(l.pop(), Value::Number(1.0));
        assert_eq!(lengths.load(Ordering::SeqCst), 0);
        assert_eq!(l.pop(), Value::Undefined);
    }

    #[test]
    fn indexed_writes_do_not_disturb_other_positions() {
        let l = list(json!([10, 20]));
        let runs = Arc::new(AtomicUsize::new(0));

        let l2 = l.clone();
        let runs2 = runs.clone();
        let _fx = Effect::new(move || {
            l2.get(0);
            runs2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        l.set(1, 99);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        l.set(0, 11);
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // No-op write.
        l.set(0, 11);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn insert_and_remove_notify_shifted_positions() {
        let l = list(json!(["a", "b", "c"]));
        let observed = Arc::new(AtomicUsize::new(0));

        let l2 = l.clone();
        let observed2 = observed.clone();
        let _fx = Effect::new(move || {
            l2.get(2);
            observed2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(observed.load(Ordering::SeqCst), 1);

        // "c" shifts from 2 to 3; position 2 now holds "x".
        l.insert(2, "x");
        assert_eq!(observed.load(Ordering::SeqCst), 2);

        assert_eq!(l.remove(0), Value::Str("a".into()));
        assert_eq!(l.get_untracked(1), Value::Str("c".into()));
    }

    #[test]
    fn nested_items_wrap_lazily_with_stable_identity() {
        let l = list(json!([{"done": false}]));
        let first = l.get(0);
        let second = l.get(0);
        match (&first, &second) {
            (Value::Object(a), Value::Object(b)) => assert_eq!(a.id(), b.id()),
            other => panic!("expected nested objects, got {other:?}"),
        }
    }
}
