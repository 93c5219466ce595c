//! Subscription plans, billing cycles, and activation
//!
//! A subscription lives inside the business setup record as a group of
//! `subscription*` fields. Activation stamps the end date once, at
//! purchase time; the entitlement resolver deliberately never re-checks it
//! (an activated subscription stays valid until the record is overwritten
//! or cleared).

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::setup::BusinessSetup;

/// Subscription plan identifier
///
/// The known tiers are a closed set, but unknown ids coming from newer
/// builds are preserved rather than rejected. Only `none` is excluded from
/// entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Plan {
    #[default]
    None,
    Starter,
    Business,
    Premium,
    /// Plan id this build does not know. Treated as a paid plan.
    Other(String),
}

impl Plan {
    pub fn as_str(&self) -> &str {
        match self {
            Plan::None => "none",
            Plan::Starter => "starter",
            Plan::Business => "business",
            Plan::Premium => "premium",
            Plan::Other(id) => id,
        }
    }

    /// Whether this plan counts toward entitlement.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::None)
    }
}

impl From<String> for Plan {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "none" => Plan::None,
            "starter" => Plan::Starter,
            "business" => Plan::Business,
            "premium" => Plan::Premium,
            _ => Plan::Other(value.trim().to_string()),
        }
    }
}

impl From<Plan> for String {
    fn from(plan: Plan) -> Self {
        plan.as_str().to_string()
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscription status
///
/// Only `active` counts toward entitlement. Unknown status strings decode
/// to `inactive`, which the decision table already treats as "no valid
/// subscription".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Active,
    #[default]
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "active" => SubscriptionStatus::Active,
            _ => SubscriptionStatus::Inactive,
        }
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Billing cycle for a purchased plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Biannual,
}

impl BillingCycle {
    /// Length of the cycle in calendar months.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::Biannual => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::Biannual => "biannual",
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the setup record carries a subscription that counts toward
/// entitlement: status active and a paid plan.
pub fn has_valid_subscription(setup: &BusinessSetup) -> bool {
    setup.subscription_status == SubscriptionStatus::Active && setup.subscription_plan.is_paid()
}

/// Whether the stamped end date has passed. Informational only: the
/// resolver never consults this, UI copy may.
pub fn is_lapsed(setup: &BusinessSetup, now: DateTime<Utc>) -> Option<bool> {
    setup.subscription_end_date.map(|ends_at| now >= ends_at)
}

/// Record a purchase: overwrite the subscription fields and stamp the end
/// date as `now + cycle`.
pub fn activate(setup: &mut BusinessSetup, plan: Plan, cycle: BillingCycle, now: DateTime<Utc>) {
    let ends_at = now
        .checked_add_months(Months::new(cycle.months()))
        .unwrap_or(now);

    setup.subscription_plan = plan;
    setup.subscription_status = SubscriptionStatus::Active;
    setup.subscription_duration = Some(cycle);
    setup.subscription_start_date = Some(now);
    setup.subscription_end_date = Some(ends_at);
}

/// Clear the subscription fields back to the unsubscribed state.
pub fn cancel(setup: &mut BusinessSetup) {
    setup.subscription_plan = Plan::None;
    setup.subscription_status = SubscriptionStatus::Inactive;
    setup.subscription_duration = None;
    setup.subscription_start_date = None;
    setup.subscription_end_date = None;
}
