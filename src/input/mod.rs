//! Input sources for the accessory.
//!
//! Current input sources:
//! - `mqtt`: push notifications delivered over MQTT

pub mod mqtt;
