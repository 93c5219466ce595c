//! Output formatters for the Shopdesk CLI
//!
//! Two formats:
//!
//! - **Human**: readable output for terminal use
//! - **JSON**: structured output for scripting and jq

use crate::resolver::{BadgeSeverity, EntitlementDecision};
use crate::setup::BusinessSetup;
use crate::subscription;

/// Available output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

impl OutputFormat {
    /// Resolve from a config string, defaulting to human.
    pub fn from_config(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Human,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render an entitlement decision in the requested format.
pub fn render_decision(decision: &EntitlementDecision, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(decision).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Human => {
            let mut out = String::new();
            out.push_str(if decision.allowed {
                "Access: granted"
            } else {
                "Access: blocked"
            });
            out.push_str(&format!(" ({})\n", decision.reason));

            if let Some(trial) = &decision.trial {
                out.push_str(&format!(
                    "Trial:  day {} of {}, {} remaining\n",
                    trial.elapsed_days,
                    trial.elapsed_days + trial.remaining_days,
                    trial.remaining_days
                ));
            }
            if let Some(badge) = &decision.badge {
                let marker = match badge.severity {
                    BadgeSeverity::Info => "·",
                    BadgeSeverity::Warning => "!",
                    BadgeSeverity::Critical => "!!",
                };
                out.push_str(&format!("Badge:  {} {}\n", marker, badge.text));
            }
            out
        }
    }
}

/// Render the business profile in the requested format.
pub fn render_setup(
    setup: &BusinessSetup,
    now: chrono::DateTime<chrono::Utc>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(setup).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Human => {
            let mut out = String::new();
            out.push_str(&format!("Business: {}\n", setup.business_name));
            out.push_str(&format!("Type:     {}\n", setup.business_type));
            out.push_str(&format!("WhatsApp: {}\n", setup.whatsapp_number));
            out.push_str(&format!(
                "Plan:     {} ({})",
                setup.subscription_plan,
                setup.subscription_status.as_str()
            ));
            if let Some(ends_at) = setup.subscription_end_date {
                out.push_str(&format!(", ends {}", ends_at.format("%Y-%m-%d")));
                if subscription::is_lapsed(setup, now) == Some(true) {
                    out.push_str(" (lapsed)");
                }
            }
            out.push('\n');
            out
        }
    }
}
