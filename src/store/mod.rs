//! Key-value persistence for Shopdesk state
//!
//! Provides a unified interface over string key-value backends:
//! - In-memory: default for tests and ephemeral sessions
//! - JSON file: durable single-document store in the user config directory
//!
//! Every backend broadcasts a change notification (the changed key) to
//! registered watchers, which is what keeps independently-mounted
//! consumers in sync without polling.

pub mod codec;
pub mod file;
pub mod memory;

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Persisted key names.
///
/// The resolver is the only writer of `DEMO_START_DATE` and `DEMO_EXPIRED`;
/// all other keys are owned by their feature flows and only read here.
pub mod keys {
    /// Business profile and subscription fields, one JSON record.
    pub const BUSINESS_SETUP: &str = "businessSetup";
    /// Demo-mode flag, `"true"`/`"false"`. Absent means enabled.
    pub const DEMO_MODE: &str = "demoMode";
    /// Trial start, RFC 3339. Written once by the resolver.
    pub const DEMO_START_DATE: &str = "demoStartDate";
    /// Denormalized expiry mirror, `"true"`/`"false"`. Resolver-owned.
    pub const DEMO_EXPIRED: &str = "demoExpired";
}

/// Handle returned by [`StoreAdapter::observe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// Callback invoked with the changed key after a write or removal.
pub type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

type SharedChangeListener = std::sync::Arc<dyn Fn(&str) + Send + Sync>;

/// Unified trait for key-value store backends
///
/// Values are opaque strings; typed access lives in [`codec`]. Writes are
/// last-write-wins with no transactions, so every caller must tolerate
/// concurrent overwrites.
pub trait StoreAdapter: Send + Sync {
    /// Read the raw value for a key, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one, and notify watchers.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key and notify watchers if it was present.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Register a change watcher. The listener receives the changed key.
    fn observe(&self, listener: ChangeListener) -> WatchId;

    /// Deregister a watcher. Unknown ids are ignored.
    fn unobserve(&self, id: WatchId);
}

/// Store operation errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Change-notification fan-out shared by the backends.
///
/// Listener panics are isolated so one misbehaving watcher cannot stop
/// delivery to the rest.
pub(crate) struct ChangeSignal {
    listeners: RwLock<Vec<(WatchId, SharedChangeListener)>>,
    next_id: AtomicU64,
}

impl ChangeSignal {
    pub(crate) fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn observe(&self, listener: ChangeListener) -> WatchId {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener.into()));
        id
    }

    pub(crate) fn unobserve(&self, id: WatchId) {
        self.listeners.write().retain(|(other, _)| *other != id);
    }

    pub(crate) fn notify(&self, key: &str) {
        // Snapshot so a watcher may write back to the store (nested notify)
        // or adjust registrations without re-entering the lock.
        let snapshot: Vec<(WatchId, SharedChangeListener)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, std::sync::Arc::clone(listener)))
            .collect();
        for (id, listener) in snapshot {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(key);
            }));
            if outcome.is_err() {
                tracing::error!("Store watcher {:?} panicked on key {}", id, key);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_change_signal_delivers_key() {
        let signal = ChangeSignal::new();
        let seen = Arc::new(RwLock::new(Vec::new()));

        let seen_clone = seen.clone();
        signal.observe(Box::new(move |key| {
            seen_clone.write().push(key.to_string());
        }));

        signal.notify(keys::DEMO_MODE);
        signal.notify(keys::BUSINESS_SETUP);

        assert_eq!(
            *seen.read(),
            vec![keys::DEMO_MODE.to_string(), keys::BUSINESS_SETUP.to_string()]
        );
    }

    #[test]
    fn test_change_signal_unobserve() {
        let signal = ChangeSignal::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = count.clone();
        let id = signal.observe(Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        signal.notify("a");
        signal.unobserve(id);
        signal.notify("b");

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_change_signal_isolates_panicking_listener() {
        let signal = ChangeSignal::new();
        let count = Arc::new(AtomicUsize::new(0));

        signal.observe(Box::new(|_| {
            panic!("listener failure");
        }));
        let count_clone = count.clone();
        signal.observe(Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        signal.notify("a");

        // The second listener still ran.
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
