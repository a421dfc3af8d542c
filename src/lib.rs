//! HTTP contact sensor library.
//!
//! Exposes an open/closed contact sensor to a home-automation bridge. The
//! state is polled from an HTTP endpoint (with caching and an optional pull
//! timer) and can additionally be pushed through a notification channel.

pub mod accessory;
pub mod config;
pub mod error;
pub mod http;
pub mod input;
pub mod sensors;
pub mod state;

pub use accessory::{NotificationUpdate, SensorAccessory};
pub use error::{Result, SensorError};
pub use state::{Reading, SensorState};
