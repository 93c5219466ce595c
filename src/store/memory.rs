//! In-memory store backend
//!
//! Default backend for tests and ephemeral sessions. Nothing survives the
//! process; change notifications still fire so observer behavior matches
//! the durable backend.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{ChangeListener, ChangeSignal, StoreAdapter, StoreError, WatchId};

/// HashMap-backed store with change notification
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    signal: ChangeSignal,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            signal: ChangeSignal::new(),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreAdapter for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        self.signal.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            self.signal.notify(key);
        }
        Ok(())
    }

    fn observe(&self, listener: ChangeListener) -> WatchId {
        self.signal.observe(listener)
    }

    fn unobserve(&self, id: WatchId) {
        self.signal.unobserve(id)
    }
}
