//! Shopdesk - local-first CRM desk for small businesses
//!
//! This library is the entitlement core behind the Shopdesk dashboard:
//! trial and subscription gating computed from a local key-value store,
//! with one shared decision fanned out to every mounted consumer.
//!
//! ## Features
//!
//! - **Single decision source**: one resolver instead of per-screen trial math
//! - **Self-healing state**: the trial start stamps itself on first observation
//! - **Fail-open reads**: corrupt local data never locks a user out
//! - **Observer fan-out**: store changes, broadcast pokes, and a coarse
//!   periodic re-check keep every consumer on the same verdict
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use shopdesk::{guard, EntitlementResolver, MemoryStore, Route};
//!
//! let store = Arc::new(MemoryStore::new());
//! let resolver = EntitlementResolver::new();
//!
//! let decision = resolver.resolve(store.as_ref(), Utc::now());
//! let route = guard::guard(Route::Orders, &decision);
//! assert_eq!(route, Route::Orders);
//! ```

pub mod cli;
pub mod guard;
pub mod observer;
pub mod resolver;
pub mod setup;
pub mod signal;
pub mod store;
pub mod subscription;
pub mod trial;

// Re-exports for convenience
pub use guard::Route;
pub use observer::{EntitlementObserver, ListenerHandle, ObserverState};
pub use resolver::{
    BadgeSeverity, DecisionReason, EntitlementDecision, EntitlementResolver, TrialBadge,
};
pub use setup::BusinessSetup;
pub use signal::{Broadcast, EntitlementChanged, LanguageChanged, ListenerId};
pub use store::file::FileStore;
pub use store::memory::MemoryStore;
pub use store::{StoreAdapter, StoreError, WatchId};
pub use subscription::{BillingCycle, Plan, SubscriptionStatus};
pub use trial::{compute_trial, TrialState, DEFAULT_TRIAL_LENGTH_DAYS};
