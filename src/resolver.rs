//! Entitlement resolution
//!
//! Collapses trial clock output, the demo-mode flag, and the subscription
//! fields into one decision every consumer shares. This replaces the old
//! pattern of each screen re-deriving trial math from raw storage keys.
//!
//! Writer discipline: this module is the only writer of `demoStartDate`
//! (once, self-healing) and `demoExpired` (mirror on every full
//! resolution). Nothing else may touch those keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::setup::BusinessSetup;
use crate::store::{codec, keys, StoreAdapter};
use crate::subscription;
use crate::trial::{self, TrialState, DEFAULT_TRIAL_LENGTH_DAYS};

/// Why access was granted or denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    /// No business profile yet; the setup screen must stay reachable.
    NoSetup,
    /// Inside the trial window.
    TrialActive,
    /// Trial used up, demo mode enforced, no valid subscription.
    TrialExpiredBlocked,
    /// A paid plan with active status supersedes the trial.
    Subscribed,
    /// Demo mode off disables trial enforcement entirely.
    DemoModeOff,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::NoSetup => "no-setup",
            DecisionReason::TrialActive => "trial-active",
            DecisionReason::TrialExpiredBlocked => "trial-expired-blocked",
            DecisionReason::Subscribed => "subscribed",
            DecisionReason::DemoModeOff => "demo-mode-off",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity hint for the trial badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeSeverity {
    Info,
    Warning,
    Critical,
}

/// Presentation hint for trial-days-remaining UI. Pass-through, not logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBadge {
    pub text: String,
    pub severity: BadgeSeverity,
}

impl TrialBadge {
    fn for_trial(state: &TrialState) -> Self {
        if state.expired {
            return Self {
                text: "Trial expired".to_string(),
                severity: BadgeSeverity::Critical,
            };
        }
        let severity = if state.remaining_days <= 3 {
            BadgeSeverity::Warning
        } else {
            BadgeSeverity::Info
        };
        let text = if state.remaining_days == 1 {
            "1 trial day left".to_string()
        } else {
            format!("{} trial days left", state.remaining_days)
        };
        Self { text, severity }
    }
}

/// The single verdict every consumer renders from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    /// Present whenever a trial state was computed (any full resolution).
    pub trial: Option<TrialState>,
    /// Present while the trial gate is what grants or denies access.
    pub badge: Option<TrialBadge>,
}

impl EntitlementDecision {
    fn granted(reason: DecisionReason, trial: Option<TrialState>, badge: Option<TrialBadge>) -> Self {
        Self {
            allowed: true,
            reason,
            trial,
            badge,
        }
    }
}

/// Computes entitlement decisions from persisted state
#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    trial_length_days: i64,
}

impl EntitlementResolver {
    pub fn new() -> Self {
        Self::with_trial_length(DEFAULT_TRIAL_LENGTH_DAYS)
    }

    pub fn with_trial_length(trial_length_days: i64) -> Self {
        Self { trial_length_days }
    }

    pub fn trial_length_days(&self) -> i64 {
        self.trial_length_days
    }

    /// Resolve the current decision.
    ///
    /// Side effects: initializes `demoStartDate` on first observation and
    /// refreshes the `demoExpired` mirror. Both writes are best-effort;
    /// a failing store degrades to in-memory values and the decision is
    /// still produced (access is never blocked by a write failure).
    pub fn resolve(&self, store: &dyn StoreAdapter, now: DateTime<Utc>) -> EntitlementDecision {
        // Setup screen carve-out: without a profile nothing is gated.
        let Some(setup) = BusinessSetup::load(store) else {
            tracing::debug!("No business setup recorded, granting no-setup access");
            return EntitlementDecision::granted(DecisionReason::NoSetup, None, None);
        };

        let trial_state = self.load_or_start_trial(store, now);
        let demo_mode = codec::read_bool(store, keys::DEMO_MODE).unwrap_or(true);
        let has_subscription = subscription::has_valid_subscription(&setup);

        let decision = self.decide(demo_mode, trial_state, has_subscription);

        // Denormalized mirror for cheap external reads.
        if let Err(e) = codec::write_bool(store, keys::DEMO_EXPIRED, trial_state.expired) {
            tracing::warn!("Failed to mirror trial expiry: {}", e);
        }

        tracing::debug!(
            allowed = decision.allowed,
            reason = %decision.reason,
            elapsed_days = trial_state.elapsed_days,
            "Resolved entitlement"
        );
        decision
    }

    /// Read the trial start, stamping `now` if it was never recorded.
    ///
    /// First caller wins; two racing processes write near-identical values,
    /// which is within tolerance for a multi-day window.
    fn load_or_start_trial(&self, store: &dyn StoreAdapter, now: DateTime<Utc>) -> TrialState {
        let started_at = codec::read_timestamp(store, keys::DEMO_START_DATE);
        if started_at.is_none() {
            tracing::debug!("Starting trial window at {}", now.to_rfc3339());
            if let Err(e) = codec::write_timestamp(store, keys::DEMO_START_DATE, now) {
                tracing::warn!("Failed to persist trial start: {}", e);
            }
        }
        trial::compute_trial(started_at, now, self.trial_length_days)
    }

    fn decide(
        &self,
        demo_mode: bool,
        trial_state: TrialState,
        has_subscription: bool,
    ) -> EntitlementDecision {
        if !demo_mode {
            return EntitlementDecision::granted(
                DecisionReason::DemoModeOff,
                Some(trial_state),
                None,
            );
        }
        if !trial_state.expired {
            return EntitlementDecision::granted(
                DecisionReason::TrialActive,
                Some(trial_state),
                Some(TrialBadge::for_trial(&trial_state)),
            );
        }
        if has_subscription {
            return EntitlementDecision::granted(
                DecisionReason::Subscribed,
                Some(trial_state),
                None,
            );
        }
        EntitlementDecision {
            allowed: false,
            reason: DecisionReason::TrialExpiredBlocked,
            trial: Some(trial_state),
            badge: Some(TrialBadge::for_trial(&trial_state)),
        }
    }
}

impl Default for EntitlementResolver {
    fn default() -> Self {
        Self::new()
    }
}
