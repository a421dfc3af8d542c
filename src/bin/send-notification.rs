//! Publish a single push notification.
//!
//! Usage:
//!   cargo run --bin send-notification -- --id front-door --value true
//!
//! Sends `{characteristic, value, password?}` to the accessory's
//! notification topic on the configured MQTT broker.

use clap::Parser;
use http_contact_sensor::accessory::NotificationUpdate;
use http_contact_sensor::config::{self, Config};
use http_contact_sensor::input::mqtt::{
    MqttClient, NotificationMessage, notification_topic, publisher_options,
};
use http_contact_sensor::sensors::CONTACT_SENSOR_STATE;
use log::{error, info, warn};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Parser, Debug)]
#[command(about = "Publish a push notification for an HTTP contact sensor")]
struct Args {
    /// Accessory configuration to read broker settings from (JSON)
    #[arg(short, long, env = "CONTACT_SENSOR_CONFIG")]
    config: Option<PathBuf>,

    /// notificationID of the target accessory
    #[arg(long, env = "CONTACT_SENSOR_NOTIFICATION_ID")]
    id: String,

    /// Value to push (parsed as JSON, falls back to a plain string)
    #[arg(long)]
    value: String,

    /// Characteristic to update
    #[arg(long, default_value = CONTACT_SENSOR_STATE)]
    characteristic: String,

    /// notificationPassword of the target accessory
    #[arg(long, env = "CONTACT_SENSOR_NOTIFICATION_PASSWORD")]
    password: Option<String>,
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match Config::load_or_env(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let value = serde_json::from_str::<Value>(&args.value).unwrap_or(Value::String(args.value));
    let message = NotificationMessage {
        update: NotificationUpdate {
            characteristic: args.characteristic,
            value,
        },
        password: args.password,
    };
    let payload = match serde_json::to_string(&message) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to encode notification: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Connecting to MQTT broker at {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    let mqtt_client = MqttClient::new(publisher_options(&config.mqtt));

    // Queued until the connection is up
    let topic = notification_topic(&args.id);
    if let Err(e) = mqtt_client.publish(&topic, &payload) {
        error!("Failed to publish to {}: {}", topic, e);
        std::process::exit(1);
    }

    let (msg_tx, _msg_rx) = mpsc::channel(1);
    let (connected_tx, connected_rx) = oneshot::channel();
    let mqtt_handle = tokio::spawn(async move {
        mqtt_client.run(msg_tx, Some(connected_tx)).await;
    });

    if tokio::time::timeout(Duration::from_secs(10), connected_rx)
        .await
        .is_err()
    {
        warn!("Connection timeout after 10 seconds, notification not sent");
        mqtt_handle.abort();
        std::process::exit(1);
    }
    info!("Published to {}: {}", topic, payload);

    // Give the event loop time to flush the publish
    tokio::time::sleep(Duration::from_millis(500)).await;
    mqtt_handle.abort();
}
