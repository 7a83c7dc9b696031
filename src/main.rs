//! dagd-bridge - Main Entry Point
//!
//! Runs the MQTT bridge on its own: tracks epoch, hold and shutdown
//! announcements, logs every notification, and keeps a retained status line
//! fresh: refreshed at most once a second, and sent at once when the epoch
//! changes. Exits on a shutdown announcement or a signal.

use clap::{Parser, Subcommand};
use dagd_bridge::observability::init_default_logging;
use dagd_bridge::{Bridge, BridgeConfig, ConfigError, ConnectionState, MqttClient, NotifyKind};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// MQTT event bridge for the DAG generation daemon
#[derive(Parser)]
#[command(name = "dagd-bridge")]
#[command(about = "MQTT event bridge for the DAG generation daemon")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Broker address, overriding the configuration file
    #[arg(short, long, env = "DAGD_BROKER", value_name = "HOST[:PORT]")]
    broker: Option<String>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the broker and run the bridge (default)
    Run,
    /// Validate configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    info!("Starting dagd-bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_deref(), cli.broker.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bridge(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }

    info!("dagd-bridge stopped");
}

fn load_configuration(
    config_path: Option<&Path>,
    broker: Option<&str>,
) -> Result<BridgeConfig, ConfigError> {
    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            BridgeConfig::load_from_file(path)?
        }
        None => {
            let found = ["dagd-bridge.toml", "config/dagd-bridge.toml"]
                .into_iter()
                .map(Path::new)
                .find(|path| path.exists());

            match found {
                Some(path) => {
                    info!("Loading configuration from: {}", path.display());
                    BridgeConfig::load_from_file(path)?
                }
                None => BridgeConfig::default(),
            }
        }
    };

    let config = config.with_broker_override(broker)?;
    config.validate()?;
    Ok(config)
}

/// Log every notification and flag epoch changes for the status line
fn register_listeners(bridge: &mut Bridge<MqttClient>, epoch_changed: Arc<AtomicBool>) {
    bridge.register(NotifyKind::Epoch, move |state| {
        epoch_changed.store(true, Ordering::Relaxed);
        if let Some(algorithm) = state.algorithm() {
            info!(epoch = state.epoch(), %algorithm, "new work epoch");
        }
    });

    bridge.register(NotifyKind::MinedState, |state| {
        info!(hold = state.is_holding(), "mined state report");
    });

    bridge.register(NotifyKind::Shutdown, |state| {
        if state.shutdown_pending() {
            warn!("shutdown requested over MQTT");
        } else {
            info!("shutdown request cleared");
        }
    });

    bridge.register(NotifyKind::LinkStatus, |notice| match notice.link_state() {
        Some(ConnectionState::Connected) => info!("broker link up"),
        other => warn!(state = ?other, "broker link down"),
    });
}

async fn run_bridge(config: BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let link = MqttClient::new(&config)?;
    info!(broker = link.broker(), "connecting");

    let mut bridge = Bridge::new(link);
    let epoch_changed = Arc::new(AtomicBool::new(false));
    register_listeners(&mut bridge, epoch_changed.clone());

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let wait = config.poll_wait();

    loop {
        tokio::select! {
            polled = bridge.poll(wait) => polled?,
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }

        // A new epoch goes out at once; otherwise the throttle keeps the
        // refresh to one publish per second
        let flush = epoch_changed.swap(false, Ordering::Relaxed);
        if let Some(status) = bridge.state().status_line() {
            bridge.publish_status(&status, flush);
        }

        if bridge.state().shutdown_pending() {
            info!("Shutdown pending, leaving poll loop");
            break;
        }
    }

    info!(
        status_publishes = bridge.status().published_count(),
        "bridge loop finished"
    );
    Ok(())
}

fn handle_config_command(
    config: &BridgeConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
