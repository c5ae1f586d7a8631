//! fedroute daemon binary
//!
//! Loads configuration, starts the node, and runs until interrupted.

use clap::Parser;
use fedroute::node::EXIT_FAILURE;
use fedroute::{Config, Node};
use std::path::PathBuf;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Federated address-routing daemon
#[derive(Parser, Debug)]
#[command(name = "fedroute", version, about)]
struct Args {
    /// Path to configuration file (overrides default search paths)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    info!("fedroute starting");

    let (config, loaded_paths) = if let Some(config_path) = &args.config {
        match Config::load_file(config_path) {
            Ok(config) => (config, vec![config_path.clone()]),
            Err(e) => {
                error!("Failed to load configuration from {}: {}", config_path.display(), e);
                std::process::exit(EXIT_FAILURE);
            }
        }
    } else {
        match Config::load() {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                std::process::exit(EXIT_FAILURE);
            }
        }
    };

    if loaded_paths.is_empty() {
        info!("No config files found, using defaults");
    } else {
        for path in &loaded_paths {
            info!(path = %path.display(), "Loaded config file");
        }
    }

    let mut node = Node::new(config);
    info!(
        gateway = %node.config().node.gateway_addr(),
        peer = %node.config().node.peer_addr(),
        credentials = %node.config().seeds.credentials().display(),
        peers = %node.config().seeds.peers().display(),
        "Starting node"
    );

    if let Err(e) = node.start().await {
        error!("Failed to start node: {}", e);
        std::process::exit(e.exit_code());
    }

    info!("fedroute running, press Ctrl+C to exit");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    if let Err(e) = node.stop().await {
        warn!("Error during shutdown: {}", e);
    }

    info!("fedroute shutdown complete");
}
