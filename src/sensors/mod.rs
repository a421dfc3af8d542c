//! Host-facing object model.
//!
//! The accessory exposes one [`ContactSensorService`] whose
//! `ContactSensorState` [`Characteristic`] is updated from the pull and push
//! paths and read by the host bridge.

pub mod contact_sensor;
pub mod helpers;
pub mod information;

pub use contact_sensor::{CONTACT_SENSOR_STATE, ContactSensorService};
pub use helpers::characteristic::Characteristic;
pub use information::{ACCESSORY_INFO, AccessoryInformation};
