//! refresh-switch - refresh rate and underscan switcher for GNOME
//!
//! Entry point for the command-line tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refresh_switch::config::Config;
use refresh_switch::model::{marked_caption, PresentationModel};
use refresh_switch::mutter::MutterDisplayConfig;
use refresh_switch::switcher::{spawn_watcher, Reconciliation, RefreshSwitcher};

/// Command-line arguments for refresh-switch
#[derive(Parser, Debug)]
#[command(name = "refresh-switch")]
#[command(version, about = "Switch monitor refresh rate and underscan on GNOME", long_about = None)]
pub struct Args {
    /// Configuration file path (default: $XDG_CONFIG_HOME/refresh-switch/config.toml)
    #[arg(short, long, env = "REFRESH_SWITCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "compact", global = true)]
    pub log_format: String,

    /// Write logs to file (in addition to stderr)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print models as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Keep changes across sessions (ApplyMonitorsConfig method 2)
    #[arg(long, global = true)]
    pub persistent: bool,

    /// Also show monitors with a single mode
    #[arg(long, global = true)]
    pub all: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the refresh-rate choices of every monitor
    List,

    /// Switch a monitor to a refresh rate, e.g. `set HDMI-1 50`
    Set {
        /// Connector, e.g. HDMI-1
        connector: String,

        /// Rate label as shown by `list` (`60`, `59.9`, `60Hz`)
        #[arg(required_unless_present = "mode_id")]
        rate: Option<String>,

        /// Select by Mutter mode id instead of label
        #[arg(long, conflicts_with = "rate")]
        mode_id: Option<String>,

        /// Pick the interlaced variant
        #[arg(long)]
        interlaced: bool,

        /// Enable underscanning
        #[arg(long)]
        underscan: bool,

        /// Only ask Mutter whether the change would be accepted
        #[arg(long)]
        verify: bool,
    },

    /// Apply the entry at a group/entry position as numbered by `list`
    Select {
        /// Connector, e.g. HDMI-1
        connector: String,
        /// Group index
        group: usize,
        /// Entry index within the group
        entry: usize,
    },

    /// Follow monitor changes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration before logging so its level applies
    let config_path = args.config.clone().or_else(Config::default_path);
    let (config, load_error) = match &config_path {
        Some(path) => match Config::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default_config()?, Some(e)),
        },
        None => (Config::default_config()?, None),
    };

    init_logging(&args, &config)?;

    debug!("refresh-switch v{}", env!("CARGO_PKG_VERSION"));

    if let Some(e) = load_error {
        warn!("Failed to load config: {:#}, using defaults", e);
    }

    if args.verbose > 0 {
        refresh_switch::utils::log_startup_diagnostics();
    }

    let config = config.with_overrides(args.persistent, args.all);
    debug!("Config: {:?}", config);

    if let Err(e) = run(&args, &config).await {
        eprintln!("{}", refresh_switch::utils::format_user_error(&e));
        return Err(e);
    }

    Ok(())
}

async fn run(args: &Args, config: &Config) -> Result<()> {
    let connection = zbus::Connection::session()
        .await
        .context("Failed to connect to the D-Bus session bus")?;
    let display_config =
        MutterDisplayConfig::with_names(&connection, &config.dbus.destination, &config.dbus.path)
            .await
            .context("Failed to create DisplayConfig proxy")?;

    let mut switcher = RefreshSwitcher::new(
        display_config.clone(),
        config.model_options(),
        config.apply.method,
    )
    .await
    .context("Failed to read the current monitor configuration")?;

    match &args.command {
        Command::List => print_model(switcher.model(), args.json)?,

        Command::Set {
            connector,
            rate,
            mode_id,
            interlaced,
            underscan,
            verify,
        } => {
            let (mode_id, underscan) = match (mode_id, rate) {
                (Some(mode_id), _) => (mode_id.clone(), *underscan),
                (None, Some(rate)) => {
                    switcher.resolve_label(connector, rate, *interlaced, *underscan)?
                }
                (None, None) => anyhow::bail!("Either a rate or --mode-id is required"),
            };

            if *verify {
                let checked = switcher.verify_mode(connector, &mode_id, underscan).await?;
                if checked {
                    println!("{}: {} would be accepted", connector, mode_id);
                } else {
                    println!("{}: {} is already active", connector, mode_id);
                }
            } else {
                let changed = switcher
                    .change_mode(connector, &mode_id, underscan)
                    .await
                    .context("Failed to switch refresh rate")?;
                report_change(connector, &mode_id, changed);
            }
        }

        Command::Select {
            connector,
            group,
            entry,
        } => {
            let changed = switcher
                .select(connector, *group, *entry)
                .await
                .context("Failed to switch refresh rate")?;
            report_change(connector, &format!("{}/{}", group, entry), changed);
        }

        Command::Watch => {
            let notifications = display_config.receive_monitors_changed().await?;
            print_model(switcher.model(), args.json)?;

            let switcher = Arc::new(Mutex::new(switcher));
            let (events_tx, mut events) = mpsc::channel(16);
            let _watcher = spawn_watcher(switcher, notifications, events_tx);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted, stopping");
                        break;
                    }
                    event = events.recv() => match event {
                        Some(Ok(Reconciliation::EchoSuppressed)) => {
                            debug!("Suppressed stale MonitorsChanged");
                        }
                        Some(Ok(reconciliation)) => {
                            if let Some(model) = reconciliation.model() {
                                print_model(model, args.json)?;
                            }
                        }
                        Some(Err(e)) => warn!("Failed to refresh monitor state: {}", e),
                        None => break,
                    },
                }
            }
        }
    }

    Ok(())
}

fn report_change(connector: &str, target: &str, changed: bool) {
    if changed {
        println!("{}: switched to {}", connector, target);
    } else {
        println!("{}: {} is already active", connector, target);
    }
}

fn print_model(model: &PresentationModel, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(model).context("Failed to serialize model")?
        );
        return Ok(());
    }

    if model.monitors.is_empty() {
        println!("No monitor with more than one refresh rate");
        return Ok(());
    }

    for monitor in &model.monitors {
        match &monitor.display_name {
            Some(name) => println!("{} ({})", monitor.connector, name),
            None => println!("{}", monitor.connector),
        }
        for (idx, group) in monitor.mode_groups.iter().enumerate() {
            let captions: Vec<String> = (0..group.entries.len())
                .map(|entry| marked_caption(group, entry))
                .collect();
            println!("  {:>2}: {}", idx, captions.join("  "));
        }
    }

    Ok(())
}

fn init_logging(args: &Args, config: &Config) -> Result<()> {
    use std::fs::File;

    let log_level = match args.verbose {
        0 => config.logging.level.to_lowercase(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // zbus at debug logs every message on the bus
        tracing_subscriber::EnvFilter::new(format!(
            "refresh_switch={level},zbus=warn,warn",
            level = log_level
        ))
    });

    let log_file_path = args.log_file.clone().or_else(|| {
        config
            .logging
            .log_dir
            .as_ref()
            .map(|dir| dir.join("refresh-switch.log"))
    });

    // If log file is specified, write to both stderr and file
    if let Some(log_file_path) = &log_file_path {
        let file = File::create(log_file_path)
            .context(format!("Failed to create log file: {}", log_file_path.display()))?;

        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            "pretty" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path.display());
    } else {
        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            "pretty" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                    .init();
            }
        }
    }

    Ok(())
}
