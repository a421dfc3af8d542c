//! `rumqttc` connection used by the notification listener and the
//! `send-notification` tool.
//!
//! Requests (subscribe, publish) are queued on the client before the event
//! loop is spawned and go out once the broker answers the CONNECT. Both use
//! QoS 1 so a notification survives a reconnect of the listener.

use crate::config::MqttConfig;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, ClientError, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Pause between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Publish received on a subscribed topic.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

/// Listener session: the configured client id with a persistent session, so
/// the broker holds the notification subscription (and queued QoS 1
/// messages) across reconnects.
pub fn listener_options(config: &MqttConfig) -> MqttOptions {
    options(config, config.client_id.clone(), false)
}

/// One-shot publisher session. Uses its own client id and a clean session so
/// it never takes over the listener's session on the broker.
pub fn publisher_options(config: &MqttConfig) -> MqttOptions {
    let client_id = format!("{}-send-{}", config.client_id, std::process::id());
    options(config, client_id, true)
}

fn options(config: &MqttConfig, client_id: String, clean_session: bool) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, &config.broker_host, config.broker_port);
    options.set_keep_alive(Duration::from_secs(30));
    options.set_clean_session(clean_session);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }
    options
}

pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
}

impl MqttClient {
    pub fn new(options: MqttOptions) -> Self {
        let (client, event_loop) = AsyncClient::new(options, 100);
        Self { client, event_loop }
    }

    /// Queue a QoS 1 subscription. Does not wait for the SUBACK.
    pub fn subscribe(&self, topic: &str) -> Result<(), ClientError> {
        info!("[MQTT] Subscribing to {}", topic);
        self.client.try_subscribe(topic, QoS::AtLeastOnce)
    }

    /// Queue a QoS 1, non-retained publish.
    pub fn publish(&self, topic: &str, payload: &str) -> Result<(), ClientError> {
        debug!("[MQTT] Publishing to {}: {}", topic, payload);
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload.as_bytes().to_vec())
    }

    /// Drive the connection, forwarding incoming publishes to `tx`.
    ///
    /// `connected` fires on the first CONNACK. Connection errors are logged
    /// and retried after [`RECONNECT_DELAY`]. Returns once `tx` is closed.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<MqttMessage>,
        mut connected: Option<oneshot::Sender<()>>,
    ) {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("[MQTT] Connected to broker");
                    if let Some(signal) = connected.take() {
                        let _ = signal.send(());
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Ok(payload) = String::from_utf8(publish.payload.to_vec()) else {
                        warn!("[MQTT] Dropping non UTF-8 payload on {}", publish.topic);
                        continue;
                    };

                    let msg = MqttMessage {
                        topic: publish.topic,
                        payload,
                    };
                    if tx.send(msg).await.is_err() {
                        debug!("[MQTT] Receiver gone, stopping event loop");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("[MQTT] Connection error: {:?}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_keeps_session() {
        let config = MqttConfig::default();
        let options = listener_options(&config);
        assert_eq!(options.client_id(), "http-contact-sensor");
        assert!(!options.clean_session());
    }

    #[test]
    fn test_publisher_uses_own_clean_session() {
        let config = MqttConfig::default();
        let options = publisher_options(&config);
        assert_ne!(options.client_id(), listener_options(&config).client_id());
        assert!(options.client_id().starts_with("http-contact-sensor-send-"));
        assert!(options.clean_session());
    }

    #[tokio::test]
    async fn test_requests_queue_before_connect() {
        let client = MqttClient::new(publisher_options(&MqttConfig::default()));
        assert!(client.subscribe("http-contact-sensor/notifications/a").is_ok());
        assert!(client.publish("http-contact-sensor/notifications/a", "{}").is_ok());
    }
}
