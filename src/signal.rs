//! Typed in-process broadcast channels
//!
//! One channel per concern, so entitlement traffic no longer piggybacks on
//! the language-change signal. Delivery is synchronous and in publish
//! order; a panicking listener is isolated and logged so the rest of the
//! fan-out still runs.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Handle for one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;
type SharedListener<T> = std::sync::Arc<dyn Fn(&T) + Send + Sync>;

/// In-process fan-out for one payload type
pub struct Broadcast<T> {
    listeners: RwLock<Vec<(ListenerId, SharedListener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Broadcast<T> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener, returning its handle.
    pub fn subscribe(&self, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener.into()));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(other, _)| *other != id);
        listeners.len() != before
    }

    /// Deliver a payload to every listener, in subscription order.
    ///
    /// Runs on a snapshot of the registry, so a listener may subscribe or
    /// unsubscribe mid-delivery.
    pub fn publish(&self, payload: &T) {
        let snapshot: Vec<(ListenerId, SharedListener<T>)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, std::sync::Arc::clone(listener)))
            .collect();
        for (id, listener) in snapshot {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(payload);
            }));
            if outcome.is_err() {
                tracing::error!("Broadcast listener {:?} panicked", id);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Poke telling entitlement consumers to re-resolve.
///
/// Carries no data: the store is the source of truth, the signal only says
/// it changed out from under you.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntitlementChanged;

/// Language switch payload for the settings flow. Kept on its own channel,
/// deliberately separate from entitlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChanged {
    pub language: String,
}
