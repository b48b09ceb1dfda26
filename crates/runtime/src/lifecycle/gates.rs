//! Per-key async gates.
//!
//! A gate is a mutex that exists only while someone holds or waits on it.
//! Callers for the same key queue behind each other; different keys never
//! contend. Used to make loads single-flight per island and to serialize
//! creation per owner.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedGates<K: Eq + Hash> {
    gates: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedGates<K> {
    pub fn new() -> Self {
        Self {
            gates: DashMap::new(),
        }
    }

    /// Waits until no one else holds the gate for `key`.
    pub async fn acquire(&self, key: K) -> GateGuard<'_, K> {
        let gate = Arc::clone(self.gates.entry(key.clone()).or_default().value());
        let guard = gate.lock_owned().await;
        GateGuard {
            gates: self,
            key,
            guard: Some(guard),
        }
    }

    /// Gates currently held or awaited.
    pub fn active(&self) -> usize {
        self.gates.len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedGates<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GateGuard<'a, K: Eq + Hash> {
    gates: &'a KeyedGates<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for GateGuard<'_, K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map itself still references an uncontended gate.
        self.gates
            .gates
            .remove_if(&self.key, |_, gate| Arc::strong_count(gate) == 1);
    }
}
