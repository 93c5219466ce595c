//! Business setup record
//!
//! The profile a user fills in on first run, persisted as one JSON record
//! under the `businessSetup` key. The subscription fields live inside it
//! and are written by the purchase flow only; the entitlement resolver
//! reads this record but never writes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{codec, keys, StoreAdapter, StoreError};
use crate::subscription::{BillingCycle, Plan, SubscriptionStatus};

/// Persisted business profile with embedded subscription fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSetup {
    pub business_name: String,
    pub business_type: String,
    pub whatsapp_number: String,

    #[serde(default)]
    pub subscription_plan: Plan,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub subscription_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subscription_duration: Option<BillingCycle>,
    #[serde(default)]
    pub subscription_end_date: Option<DateTime<Utc>>,
}

impl BusinessSetup {
    /// Create a fresh profile with no subscription.
    pub fn new(business_name: &str, business_type: &str, whatsapp_number: &str) -> Self {
        Self {
            business_name: business_name.to_string(),
            business_type: business_type.to_string(),
            whatsapp_number: whatsapp_number.to_string(),
            subscription_plan: Plan::None,
            subscription_status: SubscriptionStatus::Inactive,
            subscription_start_date: None,
            subscription_duration: None,
            subscription_end_date: None,
        }
    }

    /// Load the record from the store. Absent or malformed means `None`.
    pub fn load(store: &dyn StoreAdapter) -> Option<Self> {
        codec::read_record(store, keys::BUSINESS_SETUP)
    }

    /// Persist the record, replacing any previous one.
    pub fn save(&self, store: &dyn StoreAdapter) -> Result<(), StoreError> {
        codec::write_record(store, keys::BUSINESS_SETUP, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::subscription;
    use chrono::TimeZone;

    #[test]
    fn test_save_load_roundtrip() {
        let store = MemoryStore::new();
        let setup = BusinessSetup::new("Acme Tailors", "retail", "+15550100");
        setup.save(&store).unwrap();

        let loaded = BusinessSetup::load(&store).unwrap();
        assert_eq!(loaded, setup);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let store = MemoryStore::new();
        let mut setup = BusinessSetup::new("Acme Tailors", "retail", "+15550100");
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        subscription::activate(&mut setup, Plan::Business, BillingCycle::Monthly, now);
        setup.save(&store).unwrap();

        let raw = store.get(keys::BUSINESS_SETUP).unwrap();
        assert!(raw.contains("\"businessName\""));
        assert!(raw.contains("\"whatsappNumber\""));
        assert!(raw.contains("\"subscriptionPlan\":\"business\""));
        assert!(raw.contains("\"subscriptionStatus\":\"active\""));
        assert!(raw.contains("\"subscriptionEndDate\""));
    }

    #[test]
    fn test_minimal_record_parses_with_defaults() {
        let store = MemoryStore::new();
        store
            .set(
                keys::BUSINESS_SETUP,
                r#"{"businessName":"Acme","businessType":"retail","whatsappNumber":"+1"}"#,
            )
            .unwrap();

        let loaded = BusinessSetup::load(&store).unwrap();
        assert_eq!(loaded.subscription_plan, Plan::None);
        assert_eq!(loaded.subscription_status, SubscriptionStatus::Inactive);
        assert!(loaded.subscription_end_date.is_none());
    }

    #[test]
    fn test_malformed_record_loads_as_none() {
        let store = MemoryStore::new();
        store.set(keys::BUSINESS_SETUP, "{nope").unwrap();
        assert!(BusinessSetup::load(&store).is_none());
    }
}
