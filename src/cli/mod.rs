//! CLI module for Shopdesk
//!
//! Provides the command-line interface with:
//!
//! - Entitlement status inspection (human or JSON output)
//! - Business profile and subscription management
//! - Decision streaming via the entitlement observer
//! - Configuration file support
//!
//! ## Usage
//!
//! ```bash
//! # Show the current entitlement decision
//! shopdesk status
//!
//! # JSON output for scripting
//! shopdesk status --json | jq '.reason'
//!
//! # First-run profile
//! shopdesk setup --name "Acme Tailors" --business-type retail --whatsapp +15550100
//!
//! # Purchase flow
//! shopdesk plan activate business --cycle quarterly
//!
//! # Configuration management
//! shopdesk config --list
//! shopdesk config --set trial.length_days=14
//! ```
//!
//! ## Module Structure
//!
//! - `commands`: CLI command definitions using clap
//! - `output`: Output formatters for different formats
//! - `config`: Configuration file handling

pub mod commands;
pub mod config;
pub mod output;

// Re-exports for convenience
pub use commands::{
    Cli, CliBillingCycle, CliOutputFormat, CliPlan, Commands, DemoToggle, PlanCommands,
};
pub use config::{ConfigError, OutputConfig, ShopdeskConfig, TrialConfig};
pub use output::{render_decision, render_setup, OutputFormat};
