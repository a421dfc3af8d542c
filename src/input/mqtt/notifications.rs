//! Push notification delivery over MQTT.
//!
//! Each accessory with a `notificationID` listens on
//! `http-contact-sensor/notifications/<notificationID>` and forwards every
//! valid payload to [`SensorAccessory::handle_notification`].

use super::client::{MqttClient, MqttMessage, listener_options};
use crate::accessory::{NotificationUpdate, SensorAccessory};
use crate::config::{Config, MqttConfig};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub const TOPIC_PREFIX: &str = "http-contact-sensor/notifications";

pub fn notification_topic(notification_id: &str) -> String {
    format!("{}/{}", TOPIC_PREFIX, notification_id)
}

/// Wire format of a notification: the update plus an optional password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(flatten)]
    pub update: NotificationUpdate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Routes MQTT notifications to one accessory.
pub struct NotificationListener {
    config: MqttConfig,
    topic: String,
    password: Option<String>,
    accessory: Arc<SensorAccessory>,
}

impl NotificationListener {
    pub fn new(
        config: MqttConfig,
        notification_id: &str,
        password: Option<String>,
        accessory: Arc<SensorAccessory>,
    ) -> Self {
        Self {
            config,
            topic: notification_topic(notification_id),
            password,
            accessory,
        }
    }

    /// Listener for the configured `notificationID`, if any.
    pub fn from_config(config: &Config, accessory: Arc<SensorAccessory>) -> Option<Self> {
        let notification_id = config.accessory.notification_id.as_deref()?;
        Some(Self::new(
            config.mqtt.clone(),
            notification_id,
            config.accessory.notification_password.clone(),
            accessory,
        ))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Spawn the listener task.
    ///
    /// Returns a JoinHandle that can be used to abort the task on shutdown.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        info!(
            "[MQTT] Connecting to {}:{}",
            self.config.broker_host, self.config.broker_port
        );

        let mqtt_client = MqttClient::new(listener_options(&self.config));

        // Queued until the connection is up
        if let Err(e) = mqtt_client.subscribe(&self.topic) {
            warn!("[MQTT] Failed to subscribe to {}: {:?}", self.topic, e);
            return;
        }

        let (msg_tx, mut msg_rx) = mpsc::channel::<MqttMessage>(64);
        let (connected_tx, connected_rx) = oneshot::channel();

        let mqtt_loop = tokio::spawn(async move {
            mqtt_client.run(msg_tx, Some(connected_tx)).await;
        });

        match tokio::time::timeout(Duration::from_secs(10), connected_rx).await {
            Ok(Ok(())) => {
                info!("[MQTT] Listening for notifications on {}", self.topic);
            }
            Ok(Err(_)) => {
                warn!("[MQTT] Connection signal channel dropped");
                return;
            }
            Err(_) => {
                // The event loop keeps retrying in the background
                warn!("[MQTT] No connection after 10 seconds, still retrying");
            }
        }

        while let Some(msg) = msg_rx.recv().await {
            self.process_message(&msg.topic, &msg.payload);
        }

        mqtt_loop.abort();
    }

    /// Apply a message if it targets this listener and is authorised.
    /// Returns true if it was forwarded to the accessory.
    pub fn process_message(&self, topic: &str, payload: &str) -> bool {
        if topic != self.topic {
            return false;
        }

        let message = match serde_json::from_str::<NotificationMessage>(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("[MQTT] Failed to parse notification on {}: {}", topic, e);
                return false;
            }
        };

        if let Some(expected) = &self.password
            && message.password.as_deref() != Some(expected.as_str())
        {
            warn!("[MQTT] Rejected notification on {}: wrong password", topic);
            return false;
        }

        self.accessory.handle_notification(message.update);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessoryConfig;
    use crate::http::ReqwestClient;
    use serde_json::json;

    fn accessory() -> Arc<SensorAccessory> {
        let config: AccessoryConfig =
            serde_json::from_value(json!({"getUrl": "http://sensor.local/door"})).unwrap();
        SensorAccessory::new(&config, Arc::new(ReqwestClient::new())).unwrap()
    }

    fn listener(password: Option<&str>) -> NotificationListener {
        NotificationListener::new(
            MqttConfig::default(),
            "front-door",
            password.map(str::to_string),
            accessory(),
        )
    }

    fn exposed(listener: &NotificationListener) -> serde_json::Value {
        listener.accessory.service().state().value()
    }

    #[test]
    fn test_topic() {
        assert_eq!(
            notification_topic("front-door"),
            "http-contact-sensor/notifications/front-door"
        );
    }

    #[test]
    fn test_applies_notification() {
        let listener = listener(None);
        let applied = listener.process_message(
            listener.topic(),
            r#"{"characteristic": "ContactSensorState", "value": 1}"#,
        );
        assert!(applied);
        assert_eq!(exposed(&listener), json!(1));
    }

    #[test]
    fn test_ignores_other_topics() {
        let listener = listener(None);
        let applied = listener.process_message(
            "http-contact-sensor/notifications/back-door",
            r#"{"characteristic": "ContactSensorState", "value": true}"#,
        );
        assert!(!applied);
        assert_eq!(exposed(&listener), json!(false));
    }

    #[test]
    fn test_rejects_invalid_payload() {
        let listener = listener(None);
        assert!(!listener.process_message(listener.topic(), "opened"));
        assert!(!listener.process_message(listener.topic(), r#"{"value": true}"#));
    }

    #[test]
    fn test_password_is_checked() {
        let listener = listener(Some("secret"));

        let without = r#"{"characteristic": "ContactSensorState", "value": true}"#;
        assert!(!listener.process_message(listener.topic(), without));

        let wrong =
            r#"{"characteristic": "ContactSensorState", "value": true, "password": "guess"}"#;
        assert!(!listener.process_message(listener.topic(), wrong));
        assert_eq!(exposed(&listener), json!(false));

        let right =
            r#"{"characteristic": "ContactSensorState", "value": true, "password": "secret"}"#;
        assert!(listener.process_message(listener.topic(), right));
        assert_eq!(exposed(&listener), json!(true));
    }

    #[test]
    fn test_from_config_requires_notification_id() {
        let config = Config::default();
        assert!(NotificationListener::from_config(&config, accessory()).is_none());

        let mut config = Config::default();
        config.accessory.notification_id = Some("garage".to_string());
        let listener = NotificationListener::from_config(&config, accessory()).unwrap();
        assert_eq!(listener.topic(), "http-contact-sensor/notifications/garage");
    }

    #[tokio::test]
    async fn test_start_keeps_retrying_unreachable_broker() {
        let config = MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1,
            ..MqttConfig::default()
        };
        let listener = NotificationListener::new(config, "front-door", None, accessory());

        let handle = listener.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_message_omits_missing_password() {
        let message = NotificationMessage {
            update: NotificationUpdate {
                characteristic: "ContactSensorState".to_string(),
                value: json!(0),
            },
            password: None,
        };
        let encoded = serde_json::to_value(&message).unwrap();
        assert_eq!(
            encoded,
            json!({"characteristic": "ContactSensorState", "value": 0})
        );
    }
}
