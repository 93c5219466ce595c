//! Entitlement observer
//!
//! Keeps every mounted consumer (navigation bar, side panel, home screen)
//! on the same entitlement decision instead of each re-deriving it. The
//! observer re-runs the resolver when the store changes or the dedicated
//! entitlement broadcast fires, and delivers the new decision to its
//! listeners only when it actually differs from the last one.
//!
//! A coarse periodic re-check (hourly by default) catches day-boundary
//! crossings in tabs that stay open with no other triggering event.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Condvar, Mutex};

use crate::resolver::{EntitlementDecision, EntitlementResolver};
use crate::signal::{Broadcast, EntitlementChanged, ListenerId};
use crate::store::{keys, StoreAdapter, WatchId};

/// Default interval for the day-boundary re-check.
pub const DEFAULT_RECHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Observer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    /// Not watching anything; listeners receive nothing.
    Idle,
    /// Mounted: watching the store, the broadcast, and the clock.
    Subscribed,
}

/// Handle for one registered decision listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Listeners are registered as boxed closures and held behind `Arc` so
/// delivery can run on a snapshot, outside the registry lock. A listener
/// that adds or removes listeners mid-delivery must not deadlock.
pub type DecisionListener = Box<dyn Fn(&EntitlementDecision) + Send + Sync>;

type SharedListener = Arc<dyn Fn(&EntitlementDecision) + Send + Sync>;

/// Store keys whose changes require a re-resolution.
///
/// The resolver-owned keys are deliberately excluded: the resolver writes
/// them during every resolution, and reacting to our own writes would
/// re-enter the refresh cycle.
fn is_trigger_key(key: &str) -> bool {
    matches!(key, keys::BUSINESS_SETUP | keys::DEMO_MODE)
}

struct ObserverCore {
    resolver: EntitlementResolver,
    store: Arc<dyn StoreAdapter>,
    listeners: Mutex<Vec<(ListenerHandle, SharedListener)>>,
    next_handle: AtomicU64,
    last: Mutex<Option<EntitlementDecision>>,
    state: Mutex<ObserverState>,
    /// One refresh cycle at a time; concurrent triggers coalesce.
    busy: AtomicBool,
    pending: AtomicBool,
    /// Re-check thread parking. `true` asks the thread to exit.
    stop: Mutex<bool>,
    wake: Condvar,
}

impl ObserverCore {
    /// Recompute and deliver, coalescing triggers that arrive mid-cycle.
    fn refresh(&self, force: bool) {
        if self.busy.swap(true, Ordering::AcqRel) {
            self.pending.store(true, Ordering::Release);
            return;
        }
        let mut force = force;
        loop {
            self.run_cycle(force);
            force = false;
            if !self.pending.swap(false, Ordering::AcqRel) {
                break;
            }
        }
        self.busy.store(false, Ordering::Release);
    }

    fn run_cycle(&self, force: bool) {
        if *self.state.lock() != ObserverState::Subscribed {
            return;
        }
        let decision = self.resolver.resolve(self.store.as_ref(), Utc::now());

        let changed = {
            let mut last = self.last.lock();
            let changed = last.as_ref() != Some(&decision);
            if changed {
                *last = Some(decision.clone());
            }
            changed
        };

        if changed || force {
            self.deliver(&decision);
        }
    }

    fn deliver(&self, decision: &EntitlementDecision) {
        // Snapshot the registry so listeners may (un)subscribe mid-delivery.
        let snapshot: Vec<(ListenerHandle, SharedListener)> = self
            .listeners
            .lock()
            .iter()
            .map(|(handle, listener)| (*handle, Arc::clone(listener)))
            .collect();
        for (handle, listener) in snapshot {
            Self::invoke(handle, &listener, decision);
        }
    }

    /// Listener panics are isolated so one consumer cannot starve the rest.
    fn invoke(handle: ListenerHandle, listener: &SharedListener, decision: &EntitlementDecision) {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            listener(decision);
        }));
        if outcome.is_err() {
            tracing::error!("Entitlement listener {:?} panicked", handle);
        }
    }
}

/// Shared subscription that fans entitlement decisions out to consumers
pub struct EntitlementObserver {
    core: Arc<ObserverCore>,
    recheck_interval: Duration,
    store_watch: Mutex<Option<WatchId>>,
    signal_watch: Mutex<Option<ListenerId>>,
    recheck: Mutex<Option<JoinHandle<()>>>,
}

impl EntitlementObserver {
    pub fn new(store: Arc<dyn StoreAdapter>, resolver: EntitlementResolver) -> Self {
        Self::with_recheck_interval(store, resolver, DEFAULT_RECHECK_INTERVAL)
    }

    pub fn with_recheck_interval(
        store: Arc<dyn StoreAdapter>,
        resolver: EntitlementResolver,
        recheck_interval: Duration,
    ) -> Self {
        Self {
            core: Arc::new(ObserverCore {
                resolver,
                store,
                listeners: Mutex::new(Vec::new()),
                next_handle: AtomicU64::new(1),
                last: Mutex::new(None),
                state: Mutex::new(ObserverState::Idle),
                busy: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                stop: Mutex::new(false),
                wake: Condvar::new(),
            }),
            recheck_interval,
            store_watch: Mutex::new(None),
            signal_watch: Mutex::new(None),
            recheck: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ObserverState {
        *self.core.state.lock()
    }

    /// Last decision computed while mounted, if any.
    pub fn last_decision(&self) -> Option<EntitlementDecision> {
        self.core.last.lock().clone()
    }

    /// Register a decision listener. A listener added after mount receives
    /// the current decision immediately.
    pub fn on_decision(&self, listener: DecisionListener) -> ListenerHandle {
        let handle = ListenerHandle(self.core.next_handle.fetch_add(1, Ordering::Relaxed));
        let listener: SharedListener = Arc::from(listener);

        if let Some(current) = self.last_decision() {
            ObserverCore::invoke(handle, &listener, &current);
        }
        self.core.listeners.lock().push((handle, listener));
        handle
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.core.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(other, _)| *other != handle);
        listeners.len() != before
    }

    /// Mount: compute once, deliver to all registered listeners, then keep
    /// watching the store, the entitlement broadcast, and the clock.
    /// Mounting twice is a no-op.
    pub fn mount(&self, signal: &Broadcast<EntitlementChanged>) {
        {
            let mut state = self.core.state.lock();
            if *state == ObserverState::Subscribed {
                return;
            }
            *state = ObserverState::Subscribed;
        }
        *self.core.stop.lock() = false;

        // Initial decision goes out even if a previous mount saw the same one.
        self.core.refresh(true);

        let store_core = Arc::clone(&self.core);
        let watch = self.core.store.observe(Box::new(move |key| {
            if is_trigger_key(key) {
                store_core.refresh(false);
            }
        }));
        *self.store_watch.lock() = Some(watch);

        let signal_core = Arc::clone(&self.core);
        let listener = signal.subscribe(Box::new(move |_| {
            signal_core.refresh(false);
        }));
        *self.signal_watch.lock() = Some(listener);

        let thread_core = Arc::clone(&self.core);
        let interval = self.recheck_interval;
        let handle = std::thread::spawn(move || loop {
            {
                let mut stopped = thread_core.stop.lock();
                if !*stopped {
                    thread_core.wake.wait_for(&mut stopped, interval);
                }
                if *stopped {
                    break;
                }
            }
            thread_core.refresh(false);
        });
        *self.recheck.lock() = Some(handle);

        tracing::debug!("Entitlement observer mounted");
    }

    /// Unmount: stop the re-check thread and detach from both signals.
    /// Must be called with the same broadcast the observer was mounted on.
    pub fn unmount(&self, signal: &Broadcast<EntitlementChanged>) {
        {
            let mut state = self.core.state.lock();
            if *state == ObserverState::Idle {
                return;
            }
            *state = ObserverState::Idle;
        }

        if let Some(watch) = self.store_watch.lock().take() {
            self.core.store.unobserve(watch);
        }
        if let Some(listener) = self.signal_watch.lock().take() {
            signal.unsubscribe(listener);
        }

        *self.core.stop.lock() = true;
        self.core.wake.notify_all();
        if let Some(handle) = self.recheck.lock().take() {
            let _ = handle.join();
        }

        tracing::debug!("Entitlement observer unmounted");
    }

    /// Force a re-resolution outside any trigger, e.g. after a purchase
    /// completed in this process.
    pub fn refresh(&self) {
        self.core.refresh(false);
    }
}

impl Drop for EntitlementObserver {
    fn drop(&mut self) {
        // The broadcast listener cannot be detached here (no channel
        // reference), but the re-check thread must not outlive us.
        *self.core.stop.lock() = true;
        self.core.wake.notify_all();
        if let Some(handle) = self.recheck.lock().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::BusinessSetup;
    use crate::store::memory::MemoryStore;
    use crate::store::{codec, ChangeListener, StoreError};
    use crate::resolver::DecisionReason;
    use parking_lot::RwLock;

    fn mounted_observer() -> (
        Arc<MemoryStore>,
        EntitlementObserver,
        Arc<Broadcast<EntitlementChanged>>,
    ) {
        let store = Arc::new(MemoryStore::new());
        BusinessSetup::new("Acme Tailors", "retail", "+15550100")
            .save(store.as_ref())
            .unwrap();
        let observer = EntitlementObserver::new(
            store.clone() as Arc<dyn StoreAdapter>,
            EntitlementResolver::new(),
        );
        let signal = Arc::new(Broadcast::new());
        (store, observer, signal)
    }

    fn record_decisions(observer: &EntitlementObserver) -> Arc<RwLock<Vec<DecisionReason>>> {
        let seen = Arc::new(RwLock::new(Vec::new()));
        let seen_clone = seen.clone();
        observer.on_decision(Box::new(move |decision| {
            seen_clone.write().push(decision.reason);
        }));
        seen
    }

    #[test]
    fn test_mount_delivers_initial_decision() {
        let (_store, observer, signal) = mounted_observer();
        let seen = record_decisions(&observer);

        assert_eq!(observer.state(), ObserverState::Idle);
        observer.mount(&signal);

        assert_eq!(observer.state(), ObserverState::Subscribed);
        assert_eq!(*seen.read(), vec![DecisionReason::TrialActive]);
        observer.unmount(&signal);
    }

    #[test]
    fn test_store_change_triggers_redelivery() {
        let (store, observer, signal) = mounted_observer();
        let seen = record_decisions(&observer);
        observer.mount(&signal);

        // Demo mode off flips the reason.
        codec::write_bool(store.as_ref(), crate::store::keys::DEMO_MODE, false).unwrap();

        assert_eq!(
            *seen.read(),
            vec![DecisionReason::TrialActive, DecisionReason::DemoModeOff]
        );
        observer.unmount(&signal);
    }

    #[test]
    fn test_unchanged_decision_is_not_redelivered() {
        let (store, observer, signal) = mounted_observer();
        let seen = record_decisions(&observer);
        observer.mount(&signal);

        // Rewriting the same record resolves to an equal decision.
        BusinessSetup::load(store.as_ref())
            .unwrap()
            .save(store.as_ref())
            .unwrap();

        assert_eq!(seen.read().len(), 1);
        observer.unmount(&signal);
    }

    #[test]
    fn test_broadcast_poke_triggers_recompute() {
        let (store, observer, signal) = mounted_observer();
        let seen = record_decisions(&observer);
        observer.mount(&signal);

        // A poke with nothing changed recomputes but does not redeliver.
        signal.publish(&EntitlementChanged);
        assert_eq!(seen.read().len(), 1);

        codec::write_bool(store.as_ref(), crate::store::keys::DEMO_MODE, false).unwrap();
        signal.publish(&EntitlementChanged);
        // One redelivery for the change, none for the redundant poke.
        assert_eq!(
            *seen.read(),
            vec![DecisionReason::TrialActive, DecisionReason::DemoModeOff]
        );
        observer.unmount(&signal);
    }

    #[test]
    fn test_unmount_detaches_everything() {
        let (store, observer, signal) = mounted_observer();
        let seen = record_decisions(&observer);
        observer.mount(&signal);
        observer.unmount(&signal);

        assert_eq!(observer.state(), ObserverState::Idle);
        assert_eq!(signal.listener_count(), 0);

        codec::write_bool(store.as_ref(), crate::store::keys::DEMO_MODE, false).unwrap();
        signal.publish(&EntitlementChanged);
        assert_eq!(seen.read().len(), 1);
    }

    #[test]
    fn test_mount_twice_is_a_noop() {
        let (_store, observer, signal) = mounted_observer();
        let seen = record_decisions(&observer);

        observer.mount(&signal);
        observer.mount(&signal);

        assert_eq!(seen.read().len(), 1);
        assert_eq!(signal.listener_count(), 1);
        observer.unmount(&signal);
    }

    #[test]
    fn test_listener_added_after_mount_gets_current_decision() {
        let (_store, observer, signal) = mounted_observer();
        observer.mount(&signal);

        let seen = record_decisions(&observer);
        assert_eq!(*seen.read(), vec![DecisionReason::TrialActive]);
        observer.unmount(&signal);
    }

    #[test]
    fn test_listener_panic_is_isolated() {
        let (store, observer, signal) = mounted_observer();
        observer.on_decision(Box::new(|_| {
            panic!("listener failure");
        }));
        let seen = record_decisions(&observer);
        observer.mount(&signal);

        codec::write_bool(store.as_ref(), crate::store::keys::DEMO_MODE, false).unwrap();
        assert_eq!(seen.read().len(), 2);
        observer.unmount(&signal);
    }

    #[test]
    fn test_remove_listener_stops_delivery() {
        let (store, observer, signal) = mounted_observer();
        let seen = Arc::new(RwLock::new(Vec::new()));
        let seen_clone = seen.clone();
        let handle = observer.on_decision(Box::new(move |decision| {
            seen_clone.write().push(decision.reason);
        }));
        observer.mount(&signal);

        assert!(observer.remove_listener(handle));
        assert!(!observer.remove_listener(handle));

        codec::write_bool(store.as_ref(), crate::store::keys::DEMO_MODE, false).unwrap();
        assert_eq!(seen.read().len(), 1);
        observer.unmount(&signal);
    }

    /// Store wrapper whose watchers never fire, so only the periodic
    /// re-check can observe writes.
    struct SilentStore {
        inner: Arc<MemoryStore>,
        sink: crate::store::ChangeSignal,
    }

    impl StoreAdapter for SilentStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
        fn observe(&self, listener: ChangeListener) -> WatchId {
            // Registered but never notified.
            self.sink.observe(listener)
        }
        fn unobserve(&self, id: WatchId) {
            self.sink.unobserve(id)
        }
    }

    #[test]
    fn test_manual_refresh_recomputes() {
        let inner = Arc::new(MemoryStore::new());
        BusinessSetup::new("Acme Tailors", "retail", "+15550100")
            .save(inner.as_ref())
            .unwrap();

        let store: Arc<dyn StoreAdapter> = Arc::new(SilentStore {
            inner: inner.clone(),
            sink: crate::store::ChangeSignal::new(),
        });
        let observer = EntitlementObserver::new(store, EntitlementResolver::new());
        let seen = record_decisions(&observer);
        let signal = Broadcast::new();
        observer.mount(&signal);

        codec::write_bool(inner.as_ref(), crate::store::keys::DEMO_MODE, false).unwrap();
        // Nothing fired for that write; an explicit refresh picks it up.
        observer.refresh();

        assert_eq!(
            *seen.read(),
            vec![DecisionReason::TrialActive, DecisionReason::DemoModeOff]
        );
        observer.unmount(&signal);
    }

    #[test]
    fn test_periodic_recheck_catches_silent_changes() {
        let inner = Arc::new(MemoryStore::new());
        BusinessSetup::new("Acme Tailors", "retail", "+15550100")
            .save(inner.as_ref())
            .unwrap();

        let store: Arc<dyn StoreAdapter> = Arc::new(SilentStore {
            inner: inner.clone(),
            sink: crate::store::ChangeSignal::new(),
        });
        let observer = EntitlementObserver::with_recheck_interval(
            store,
            EntitlementResolver::new(),
            Duration::from_millis(25),
        );
        let seen = record_decisions(&observer);
        let signal = Broadcast::new();
        observer.mount(&signal);

        codec::write_bool(inner.as_ref(), crate::store::keys::DEMO_MODE, false).unwrap();

        // No notification fired; only the re-check thread can see this.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while seen.read().len() < 2 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(
            *seen.read(),
            vec![DecisionReason::TrialActive, DecisionReason::DemoModeOff]
        );
        observer.unmount(&signal);
    }
}
