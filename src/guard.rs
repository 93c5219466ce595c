//! Route access guard
//!
//! Decides, per navigation target, whether to render it or redirect to the
//! subscription-required screen. A fixed exempt set keeps the setup and
//! purchase surfaces reachable so a blocked user can always buy a plan,
//! and keeps the landing screen itself out of the redirect loop.

use serde::{Deserialize, Serialize};

use crate::resolver::EntitlementDecision;

/// Navigation targets known to the dashboard router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Customer list, the home screen.
    Home,
    Orders,
    Messages,
    WhatsappConnect,
    Settings,
    /// Settings opened on the subscription tab.
    SettingsSubscription,
    /// Landing screen shown when the trial gate denies access.
    SubscriptionRequired,
    Setup,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::Orders => "orders",
            Route::Messages => "messages",
            Route::WhatsappConnect => "whatsapp-connect",
            Route::Settings => "settings",
            Route::SettingsSubscription => "settings-subscription",
            Route::SubscriptionRequired => "subscription-required",
            Route::Setup => "setup",
        }
    }

    /// Parse a route id. Tolerates case and separator variations.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' ' | '/'))
            .collect();
        match normalized.as_str() {
            "home" | "customers" => Some(Route::Home),
            "orders" => Some(Route::Orders),
            "messages" => Some(Route::Messages),
            "whatsappconnect" => Some(Route::WhatsappConnect),
            "settings" => Some(Route::Settings),
            "settingssubscription" => Some(Route::SettingsSubscription),
            "subscriptionrequired" => Some(Route::SubscriptionRequired),
            "setup" => Some(Route::Setup),
            _ => None,
        }
    }

    /// Routes reachable regardless of the entitlement decision.
    pub fn is_exempt(&self) -> bool {
        matches!(
            self,
            Route::Setup
                | Route::Settings
                | Route::SettingsSubscription
                | Route::SubscriptionRequired
        )
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Return the route to actually render: the target itself when it is
/// exempt or access is granted, otherwise the subscription-required
/// landing screen. Idempotent by construction since the landing screen is
/// itself exempt.
pub fn guard(target: Route, decision: &EntitlementDecision) -> Route {
    if target.is_exempt() || decision.allowed {
        target
    } else {
        tracing::debug!("Redirecting {} ({})", target, decision.reason);
        Route::SubscriptionRequired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DecisionReason;

    const ALL_ROUTES: [Route; 8] = [
        Route::Home,
        Route::Orders,
        Route::Messages,
        Route::WhatsappConnect,
        Route::Settings,
        Route::SettingsSubscription,
        Route::SubscriptionRequired,
        Route::Setup,
    ];

    fn allowed() -> EntitlementDecision {
        EntitlementDecision {
            allowed: true,
            reason: DecisionReason::TrialActive,
            trial: None,
            badge: None,
        }
    }

    fn blocked() -> EntitlementDecision {
        EntitlementDecision {
            allowed: false,
            reason: DecisionReason::TrialExpiredBlocked,
            trial: None,
            badge: None,
        }
    }

    #[test]
    fn test_allowed_renders_target() {
        for route in ALL_ROUTES {
            assert_eq!(guard(route, &allowed()), route);
        }
    }

    #[test]
    fn test_blocked_redirects_non_exempt_routes() {
        for route in [Route::Home, Route::Orders, Route::Messages, Route::WhatsappConnect] {
            assert_eq!(guard(route, &blocked()), Route::SubscriptionRequired);
        }
    }

    #[test]
    fn test_exempt_routes_always_reachable() {
        for route in ALL_ROUTES.into_iter().filter(Route::is_exempt) {
            assert_eq!(guard(route, &blocked()), route);
        }
    }

    #[test]
    fn test_guard_is_idempotent() {
        for route in ALL_ROUTES {
            for decision in [allowed(), blocked()] {
                let once = guard(route, &decision);
                assert_eq!(guard(once, &decision), once);
            }
        }
    }

    #[test]
    fn test_setup_exempt_without_profile() {
        let decision = EntitlementDecision {
            allowed: true,
            reason: DecisionReason::NoSetup,
            trial: None,
            badge: None,
        };
        assert_eq!(guard(Route::Setup, &decision), Route::Setup);
    }

    #[test]
    fn test_route_id_roundtrip() {
        for route in ALL_ROUTES {
            assert_eq!(Route::parse(route.as_str()), Some(route));
        }
    }

    #[test]
    fn test_route_parse_normalization() {
        assert_eq!(Route::parse("WhatsApp-Connect"), Some(Route::WhatsappConnect));
        assert_eq!(Route::parse("settings/subscription"), Some(Route::SettingsSubscription));
        assert_eq!(Route::parse("customers"), Some(Route::Home));
        assert_eq!(Route::parse("dashboard"), None);
    }

    #[test]
    fn test_route_serde_is_kebab_case() {
        let json = serde_json::to_string(&Route::SubscriptionRequired).unwrap();
        assert_eq!(json, "\"subscription-required\"");
        let parsed: Route = serde_json::from_str("\"whatsapp-connect\"").unwrap();
        assert_eq!(parsed, Route::WhatsappConnect);
    }
}
