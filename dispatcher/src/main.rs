use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};
use network_rust::mqtt::MqttConnector;
use shared_resources::config::Config;
use shared_resources::shutdown;
use tracing_subscriber::EnvFilter;

use dispatcher::DispatcherSettings;

#[derive(Parser, Debug)]
#[command(name = "dispatcher")]
#[command(about = "Assigns elevators to calls from the mirrored building state", long_about = None)]
struct Args {
    /// Configuration file, defaults to ../config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Redraw a table of the mirrored state after every tick
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

    let broker = MqttConnector::new(&config.broker.host, config.broker.port, "dispatcher");
    info!("Dispatching through broker {}:{}", config.broker.host, config.broker.port);

    if let Err(e) = dispatcher::run(broker, DispatcherSettings::from(&config), shutdown, args.status) {
        error!("{}", e);
        process::exit(1);
    }
}
