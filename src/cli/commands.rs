//! CLI command definitions for Shopdesk
//!
//! Defines all CLI commands and arguments using clap derive macros.
//!
//! ## Commands
//!
//! - `status` - Show the current entitlement decision
//! - `setup` - Create or show the business profile
//! - `plan` - Manage the subscription plan
//! - `demo` - Toggle demo mode enforcement
//! - `watch` - Stream entitlement decision changes
//! - `config` - Show or modify configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::subscription::{BillingCycle, Plan};

/// Shopdesk - local-first CRM desk for small businesses
#[derive(Parser, Debug)]
#[command(name = "shopdesk")]
#[command(about = "Local-first CRM desk for small businesses", long_about = None)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the state document (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format selector (CLI compatible)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliOutputFormat {
    /// Readable output for terminal use
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Billing cycle selector (CLI compatible)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliBillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Biannual,
}

impl From<CliBillingCycle> for BillingCycle {
    fn from(cycle: CliBillingCycle) -> Self {
        match cycle {
            CliBillingCycle::Monthly => BillingCycle::Monthly,
            CliBillingCycle::Quarterly => BillingCycle::Quarterly,
            CliBillingCycle::Biannual => BillingCycle::Biannual,
        }
    }
}

/// Plan selector (CLI compatible)
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliPlan {
    Starter,
    Business,
    Premium,
}

impl From<CliPlan> for Plan {
    fn from(plan: CliPlan) -> Self {
        match plan {
            CliPlan::Starter => Plan::Starter,
            CliPlan::Business => Plan::Business,
            CliPlan::Premium => Plan::Premium,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the current entitlement decision
    Status {
        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<CliOutputFormat>,

        /// Output as JSON (shorthand for --format json)
        #[arg(long)]
        json: bool,
    },

    /// Create or show the business profile
    Setup {
        /// Business name
        #[arg(long)]
        name: Option<String>,

        /// Business type (retail, services, ...)
        #[arg(long)]
        business_type: Option<String>,

        /// WhatsApp number in international format
        #[arg(long)]
        whatsapp: Option<String>,

        /// Show the stored profile instead of writing one
        #[arg(long)]
        show: bool,
    },

    /// Manage the subscription plan
    Plan {
        #[command(subcommand)]
        action: PlanCommands,
    },

    /// Toggle demo mode enforcement
    Demo {
        /// New demo mode state
        #[arg(id = "demo_state", value_enum)]
        state: DemoToggle,
    },

    /// Stream entitlement decision changes to stdout
    Watch {
        /// Re-check interval in seconds (overrides config)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show or modify configuration
    Config {
        /// List all configuration values
        #[arg(short, long)]
        list: bool,

        /// Get a configuration value (e.g. trial.length_days)
        #[arg(short, long)]
        get: Option<String>,

        /// Set a configuration value (KEY=VALUE)
        #[arg(short, long)]
        set: Option<String>,
    },
}

/// Plan subcommands
#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Activate a plan, stamping the end date from today
    Activate {
        /// Plan tier
        #[arg(value_enum)]
        plan: CliPlan,

        /// Billing cycle
        #[arg(long, value_enum, default_value = "monthly")]
        cycle: CliBillingCycle,
    },

    /// Show the stored subscription fields
    Show,

    /// Clear the subscription back to the unsubscribed state
    Cancel,
}

/// Demo mode toggle values
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DemoToggle {
    On,
    Off,
}

impl DemoToggle {
    pub fn as_bool(&self) -> bool {
        matches!(self, DemoToggle::On)
    }
}
