//! Reactive Object
//!
//! A keyed container whose reads and writes are intercepted for dependency
//! tracking. This is the object half of the proxy factory: JSON objects
//! wrap into `ReactiveObject`, arrays into
//! [`ReactiveList`](super::ReactiveList).
//!
//! # Interception
//!
//! - `get` records a dependency on `(id, Prop(key))` for the running
//!   computation, if any, then returns the member. A raw nested container is
//!   wrapped on first read and cached in place, so deep reactivity is
//!   demand-driven and repeated reads return the same wrapper identity.
//!
//! - `set` compares against the current member first; a write that does not
//!   change the value notifies nobody. A changed write triggers the member's
//!   key, and additionally the synthetic `Structure` key when it introduces
//!   a new member (iteration and length depend on that channel, not on any
//!   one member).
//!
//! Handles are shared-state clones: cloning a `ReactiveObject` clones a
//! reference, not the data, so every clone sees every write. Entry ordering
//! follows insertion order, matching how the data arrived in JSON.
//!
//! Locks are never held across a trigger: notification runs arbitrary
//! computations, which are free to read and write this same object.

use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use super::store::{DependencyStore, Key, TargetId};
use crate::value::{Slot, Value};

/// A tracked keyed container.
#[derive(Clone)]
pub struct ReactiveObject {
    state: Arc<ObjectState>,
}

struct ObjectState {
    id: TargetId,
    slots: RwLock<IndexMap<String, Slot>>,
}

impl Drop for ObjectState {
    fn drop(&mut self) {
        // Last handle is gone; nothing can read or write this target again.
        DependencyStore::purge_target(self.id);
    }
}

impl ReactiveObject {
    /// Create an empty tracked object.
    pub fn new() -> Self {
        Self::from_slots(IndexMap::new())
    }

    /// Wrap a raw JSON object. Children stay raw until first read.
    pub(crate) fn from_raw(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::from_slots(map.into_iter().map(|(k, raw)| (k, Slot::Raw(raw))).collect())
    }

    /// Build a tracked object from already-live entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self::from_slots(
            entries
                .into_iter()
                .map(|(k, value)| (k, Slot::Live(value)))
                .collect(),
        )
    }

    fn from_slots(slots: IndexMap<String, Slot>) -> Self {
        Self {
            state: Arc::new(ObjectState {
                id: TargetId::new(),
                slots: RwLock::new(slots),
            }),
        }
    }

    /// This object's identity in the dependency store.
    pub fn id(&self) -> TargetId {
        self.state.id
    }

    /// Read a member, recording a dependency for the running computation.
    ///
    /// A missing member reads as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        DependencyStore::track(self.state.id, Key::Prop(key.to_string()));
        self.read_slot(key)
    }

    /// Read a member without registering a dependency.
    pub fn get_untracked(&self, key: &str) -> Value {
        self.read_slot(key)
    }

    fn read_slot(&self, key: &str) -> Value {
        let mut slots = self.state.slots.write().expect("slots lock poisoned");
        match slots.get_mut(key) {
            Some(slot) => slot.live().clone(),
            None => Value::Undefined,
        }
    }

    /// Write a member and notify its dependents.
    ///
    /// A write that leaves the member unchanged notifies nobody. Writing a
    /// member that did not exist also notifies `Structure`.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();

        let (changed, is_new) = {
            let mut slots = self.state.slots.write().expect("slots lock poisoned");
            match slots.get_mut(key) {
                Some(slot) => {
                    if slot.live().value_eq(&value) {
                        (false, false)
                    } else {
                        *slot = Slot::Live(value);
                        (true, false)
                    }
                }
                None => {
                    slots.insert(key.to_string(), Slot::Live(value));
                    (true, true)
                }
            }
        };

        if changed {
            DependencyStore::trigger(self.state.id, Key::Prop(key.to_string()));
            if is_new {
                DependencyStore::trigger(self.state.id, Key::Structure);
            }
        }
    }

    /// Remove a member, returning its value (`Undefined` if absent).
    pub fn remove(&self, key: &str) -> Value {
        let removed = {
            let mut slots = self.state.slots.write().expect("slots lock poisoned");
            slots.shift_remove(key)
        };

        match removed {
            Some(mut slot) => {
                let value = slot.live().clone();
                DependencyStore::trigger(self.state.id, Key::Prop(key.to_string()));
                DependencyStore::trigger(self.state.id, Key::Structure);
                value
            }
            None => Value::Undefined,
        }
    }

    /// Remove every member, notifying each removed key and `Structure`.
    pub fn clear(&self) {
        let keys: Vec<String> = {
            let mut slots = self.state.slots.write().expect("slots lock poisoned");
            let keys = slots.keys().cloned().collect();
            slots.clear();
            keys
        };

        if keys.is_empty() {
            return;
        }
        for key in keys {
            DependencyStore::trigger(self.state.id, Key::Prop(key));
        }
        DependencyStore::trigger(self.state.id, Key::Structure);
    }

    /// Whether `key` is present. Tracks the member's key, so a computation
    /// branching on presence re-runs when the member appears or disappears.
    pub fn contains_key(&self, key: &str) -> bool {
        DependencyStore::track(self.state.id, Key::Prop(key.to_string()));
        self.state
            .slots
            .read()
            .expect("slots lock poisoned")
            .contains_key(key)
    }

    /// Number of members. Structure-tracked.
    pub fn len(&self) -> usize {
        DependencyStore::track(self.state.id, Key::Structure);
        self.state.slots.read().expect("slots lock poisoned").len()
    }

    /// Whether the object has no members. Structure-tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the member names, in insertion order. Structure-tracked.
    pub fn keys(&self) -> Vec<String> {
        DependencyStore::track(self.state.id, Key::Structure);
        self.state
            .slots
            .read()
            .expect("slots lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Snapshot of the entries, in insertion order. Structure-tracked; the
    /// iteration surface used for rendering keyed loops.
    pub fn entries(&self) -> Vec<(String, Value)> {
        DependencyStore::track(self.state.id, Key::Structure);
        let mut slots = self.state.slots.write().expect("slots lock poisoned");
        slots
            .iter_mut()
            .map(|(k, slot)| (k.clone(), slot.live().clone()))
            .collect()
    }

    /// Snapshot as plain JSON, without registering dependencies.
    pub fn to_json(&self) -> serde_json::Value {
        let slots = self.state.slots.read().expect("slots lock poisoned");
        let map: serde_json::Map<String, serde_json::Value> = slots
            .iter()
            .map(|(k, slot)| (k.clone(), slot.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Default for ReactiveObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ReactiveObject {
    fn eq(&self, other: &Self) -> bool {
        self.state.id == other.state.id
    }
}

impl Eq for ReactiveObject {}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveObject")
            .field("id", &self.state.id)
            .field("len", &self.state.slots.read().expect("slots lock poisoned").len())
            .finish()
    }
}
