//! Shopdesk CLI - local-first CRM desk for small businesses
//!
//! A command-line interface for the entitlement engine with:
//! - Entitlement status inspection (human, JSON)
//! - Business profile and subscription management
//! - Decision streaming via the entitlement observer
//! - Configuration file support

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopdesk::cli::{
    render_decision, render_setup, Cli, CliOutputFormat, Commands, OutputFormat, PlanCommands,
    ShopdeskConfig,
};
use shopdesk::observer::EntitlementObserver;
use shopdesk::resolver::EntitlementResolver;
use shopdesk::signal::{Broadcast, EntitlementChanged};
use shopdesk::store::{codec, keys, StoreAdapter};
use shopdesk::subscription;
use shopdesk::{BusinessSetup, FileStore};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    // Default to quiet (error-only) unless --verbose is specified
    let filter = if cli.verbose { "debug" } else { "error" };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => ShopdeskConfig::load_from(path.clone()),
        None => ShopdeskConfig::load(),
    };

    let store: Arc<dyn StoreAdapter> = Arc::new(match &cli.state {
        Some(path) => FileStore::open(path.clone()),
        None => FileStore::open_default(),
    });
    let resolver = EntitlementResolver::with_trial_length(config.trial.length_days);

    // Dispatch to command handlers
    match cli.command {
        Commands::Status { format, json } => {
            let format = pick_format(format, json, &config);
            handle_status(store.as_ref(), &resolver, format)?;
        }

        Commands::Setup {
            name,
            business_type,
            whatsapp,
            show,
        } => {
            handle_setup(store.as_ref(), &config, name, business_type, whatsapp, show)?;
        }

        Commands::Plan { action } => {
            handle_plan(store.as_ref(), &config, action)?;
        }

        Commands::Demo { state } => {
            codec::write_bool(store.as_ref(), keys::DEMO_MODE, state.as_bool())?;
            println!(
                "Demo mode {}",
                if state.as_bool() { "on" } else { "off" }
            );
        }

        Commands::Watch {
            interval_secs,
            json,
        } => {
            let interval = interval_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(config.trial.recheck_minutes * 60));
            handle_watch(store, resolver, interval, json);
        }

        Commands::Config { list, get, set } => {
            handle_config(&cli.config, config, list, get, set)?;
        }
    }

    Ok(())
}

fn pick_format(
    format: Option<CliOutputFormat>,
    json: bool,
    config: &ShopdeskConfig,
) -> OutputFormat {
    if json {
        return OutputFormat::Json;
    }
    match format {
        Some(CliOutputFormat::Json) => OutputFormat::Json,
        Some(CliOutputFormat::Human) => OutputFormat::Human,
        None => OutputFormat::from_config(&config.output.default_format),
    }
}

fn handle_status(
    store: &dyn StoreAdapter,
    resolver: &EntitlementResolver,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let decision = resolver.resolve(store, Utc::now());
    print!("{}", render_decision(&decision, format));
    Ok(())
}

fn handle_setup(
    store: &dyn StoreAdapter,
    config: &ShopdeskConfig,
    name: Option<String>,
    business_type: Option<String>,
    whatsapp: Option<String>,
    show: bool,
) -> anyhow::Result<()> {
    if show {
        match BusinessSetup::load(store) {
            Some(setup) => {
                let format = OutputFormat::from_config(&config.output.default_format);
                print!("{}", render_setup(&setup, Utc::now(), format));
            }
            None => println!("No business profile recorded. Run `shopdesk setup --name ...`"),
        }
        return Ok(());
    }

    let (Some(name), Some(business_type), Some(whatsapp)) = (name, business_type, whatsapp) else {
        anyhow::bail!("setup requires --name, --business-type, and --whatsapp (or --show)");
    };

    if BusinessSetup::load(store).is_some() {
        anyhow::bail!("a business profile already exists; use `shopdesk setup --show`");
    }

    let setup = BusinessSetup::new(&name, &business_type, &whatsapp);
    setup.save(store)?;
    println!("Business profile saved for {}", setup.business_name);
    Ok(())
}

fn handle_plan(
    store: &dyn StoreAdapter,
    config: &ShopdeskConfig,
    action: PlanCommands,
) -> anyhow::Result<()> {
    let Some(mut setup) = BusinessSetup::load(store) else {
        anyhow::bail!("no business profile; run `shopdesk setup` first");
    };

    match action {
        PlanCommands::Activate { plan, cycle } => {
            let plan = plan.into();
            let cycle = cycle.into();
            subscription::activate(&mut setup, plan, cycle, Utc::now());
            setup.save(store)?;
            println!(
                "Activated {} ({}), ends {}",
                setup.subscription_plan,
                cycle,
                setup
                    .subscription_end_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            );
        }
        PlanCommands::Show => {
            let format = OutputFormat::from_config(&config.output.default_format);
            print!("{}", render_setup(&setup, Utc::now(), format));
        }
        PlanCommands::Cancel => {
            subscription::cancel(&mut setup);
            setup.save(store)?;
            println!("Subscription cleared");
        }
    }
    Ok(())
}

fn handle_watch(
    store: Arc<dyn StoreAdapter>,
    resolver: EntitlementResolver,
    interval: Duration,
    json: bool,
) {
    let observer = EntitlementObserver::with_recheck_interval(store, resolver, interval);
    let signal: Broadcast<EntitlementChanged> = Broadcast::new();

    observer.on_decision(Box::new(move |decision| {
        let line = if json {
            serde_json::to_string(decision).unwrap_or_else(|_| "{}".to_string())
        } else {
            format!(
                "{} {} ({})",
                Utc::now().to_rfc3339(),
                if decision.allowed { "granted" } else { "blocked" },
                decision.reason
            )
        };
        println!("{}", line);
    }));

    observer.mount(&signal);
    tracing::debug!("Watching entitlement decisions every {:?}", interval);

    // Runs until the process is killed; the observer threads keep it alive.
    loop {
        std::thread::park();
    }
}

fn handle_config(
    config_path: &Option<std::path::PathBuf>,
    mut config: ShopdeskConfig,
    list: bool,
    get: Option<String>,
    set: Option<String>,
) -> anyhow::Result<()> {
    if list {
        for (key, value) in config.list() {
            println!("{} = {}", key, value);
        }
        return Ok(());
    }

    if let Some(key) = get {
        match config.get(&key) {
            Some(value) => println!("{}", value),
            None => anyhow::bail!("unknown configuration key: {}", key),
        }
        return Ok(());
    }

    if let Some(pair) = set {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("expected KEY=VALUE, got '{}'", pair);
        };
        config.set(key.trim(), value.trim())?;
        match config_path {
            Some(path) => config.save_to(path.clone())?,
            None => config.save()?,
        }
        println!("{} = {}", key.trim(), value.trim());
        return Ok(());
    }

    anyhow::bail!("nothing to do: pass --list, --get, or --set")
}
