use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};
use network_rust::mqtt::MqttConnector;
use network_rust::rpc::RpcConnector;
use shared_resources::config::Config;
use shared_resources::shutdown;
use tracing_subscriber::EnvFilter;

use bridge::BridgeSettings;

/// Mirrors the elevator controller onto the message bus
#[derive(Parser, Debug)]
#[command(name = "bridge")]
#[command(about = "Mirrors the elevator controller onto the message bus", long_about = None)]
struct Args {
    /// Configuration file, defaults to ../config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Redraw a table of the mirrored state after every poll
    #[arg(long)]
    status: bool,
}

fn main() {
    let args = Args::parse();

    // INITIALIZE LOGGING
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // READ CONFIGURATION
    let config = match Config::get(args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    // INITIALIZE SHUTDOWN
    let (trigger, shutdown) = shutdown::channel();
    if let Err(e) = ctrlc::set_handler(move || trigger.trigger()) {
        error!("Could not install Ctrl-C handler: {}", e);
        process::exit(1);
    }

    let controller = RpcConnector::new(&config.controller.address, config.controller_timeout());
    let broker = MqttConnector::new(&config.broker.host, config.broker.port, "bridge");
    info!(
        "Bridging controller {} to broker {}:{}",
        config.controller.address, config.broker.host, config.broker.port
    );

    if let Err(e) = bridge::run(controller, broker, BridgeSettings::from(&config), shutdown, args.status) {
        error!("{}", e);
        process::exit(1);
    }
}
