use clap::Parser;
use http_contact_sensor::SensorState;
use http_contact_sensor::accessory::SensorAccessory;
use http_contact_sensor::config::{self, Config};
use http_contact_sensor::http::ReqwestClient;
use http_contact_sensor::input::mqtt::NotificationListener;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(version, about = "Expose an HTTP contact sensor to a home-automation bridge")]
struct Args {
    /// Path to the accessory configuration (JSON)
    #[arg(short, long, env = "CONTACT_SENSOR_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose state logging
    #[arg(short, long)]
    debug: bool,
}

fn init_logger(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn load_config(args: &Args) -> http_contact_sensor::Result<Config> {
    let mut config = Config::load_or_env(args.config.as_deref())?;
    config.accessory.debug |= args.debug;
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();

    let args = Args::parse();
    init_logger(args.debug);
    info!("Starting HTTP contact sensor");

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let accessory = match SensorAccessory::new(&config.accessory, Arc::new(ReqwestClient::new())) {
        Ok(accessory) => accessory,
        Err(e) => {
            error!("{}", e);
            error!("Aborting...");
            std::process::exit(1);
        }
    };
    info!("Accessory '{}' ready", accessory.name());

    // Log every change of the exposed state, whichever path wrote it
    let mut changes = accessory.service().state().subscribe();
    let name = accessory.name().to_string();
    let change_logger = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let value = changes.borrow_and_update().clone();
            match SensorState::from_value(&value) {
                Some(state) => info!("[{}] Contact is {}", name, state),
                None => info!("[{}] Contact state set to {}", name, value),
            }
        }
    });

    if let Err(e) = accessory.get_state().await {
        warn!("Initial state query failed: {}", e);
    }

    let notifications = NotificationListener::from_config(&config, accessory.clone())
        .map(NotificationListener::start);
    if notifications.is_none() {
        info!("No notificationID configured, push notifications disabled");
    }

    info!("HTTP contact sensor is running");
    info!("  - Press Ctrl+C to exit");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    if let Some(handle) = notifications {
        handle.abort();
    }
    change_logger.abort();
    if let Some(timer) = accessory.pull_timer() {
        timer.stop();
    }

    info!("HTTP contact sensor stopped");
}
