//! MQTT input source for push notifications.
//!
//! This module provides the MQTT client and the listener that turns
//! notification messages into characteristic updates.

mod client;
mod notifications;

pub use client::{MqttClient, MqttMessage, listener_options, publisher_options};
pub use notifications::{NotificationListener, NotificationMessage, TOPIC_PREFIX, notification_topic};
