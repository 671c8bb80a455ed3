//! Stratos relayer daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!              ┌──────────────────────────── relayd ─────────────────────────────┐
//!              │                                                                  │
//!  storage     │  ┌────────────────┐   queue   ┌─────────────┐                    │
//!  network ────┼─▶│ sds_connection │──────────▶│ broadcaster │── sign ──▶ gRPC ───┼──▶ chain
//!  websocket   │  └────────────────┘           └─────────────┘                    │
//!              │                                                                  │
//!  chain       │  ┌──────────────────┐   ┌──────────┐   ┌─────────────┐           │
//!  websocket ──┼─▶│ chain_connection │──▶│ dispatch │──▶│ storage_node│── POST ───┼──▶ storage
//!              │  └──────────────────┘   │ + dedup  │   └─────────────┘           │    node API
//!              │                         └──────────┘                             │
//!              │  ┌────────────────────────────────────────────────────────────┐  │
//!              │  │ config (hot reload) · lifecycle · observability · retries  │  │
//!              │  └────────────────────────────────────────────────────────────┘  │
//!              └──────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use stratos_relayer::client::MultiClient;
use stratos_relayer::config::loader::write_default_config;
use stratos_relayer::config::watcher::apply_updates;
use stratos_relayer::config::{load_config, shared, ConfigWatcher};
use stratos_relayer::lifecycle::signals::wait_for_signal;
use stratos_relayer::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "relayd")]
#[command(about = "Relay between the Stratos storage network and stratos-chain", long_about = None)]
struct Cli {
    /// Relayer home directory.
    #[arg(short = 'r', long = "home", default_value = "./")]
    home: PathBuf,

    /// Configuration file, relative to the home directory.
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay
    Start {
        /// Storage node home directory, where the wallet lives.
        #[arg(short, long = "sp-home", default_value = "./")]
        sp_home: PathBuf,
    },
    /// Write a default configuration file
    Config,
    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.home.join(&cli.config);

    match cli.command {
        Commands::Version => {
            println!("relayd {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::Config => match write_default_config(&config_path) {
            Ok(()) => {
                println!("Default configuration written to {}", config_path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to write configuration: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Start { sp_home } => run(&config_path, &sp_home).await,
    }
}

async fn run(config_path: &Path, sp_home: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            eprintln!("Run `relayd config` to create a default configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.observability.log_level) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relayd starting");
    tracing::info!(
        chain_id = %config.blockchain_info.chain_id,
        network_address = %config.sds.network_address,
        websocket_server = %config.stratos_chain.websocket_server,
        grpc_server = %config.stratos_chain.grpc.server,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shared_config = shared(config);

    let (watcher, updates) = ConfigWatcher::new(config_path);
    let _watcher = match watcher.run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, live reload disabled");
            None
        }
    };
    tokio::spawn(apply_updates(shared_config.clone(), updates));

    let client = match MultiClient::new(sp_home, shared_config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, sp_home = %sp_home.display(), "Failed to create relay client");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = client.start() {
        tracing::error!(error = %e, "Failed to start relay client");
        return ExitCode::FAILURE;
    }

    let root = client.shutdown();
    let exit = tokio::select! {
        signal = wait_for_signal() => {
            match signal {
                Ok(name) => tracing::info!(signal = name, "Shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "Failed to listen for signals, shutting down"),
            }
            ExitCode::SUCCESS
        }
        _ = root.cancelled() => {
            tracing::error!("Relay stopped after an unrecoverable connection failure");
            ExitCode::FAILURE
        }
    };

    client.stop().await;
    tracing::info!("Shutdown complete");
    exit
}
