//! Contact sensor service.
//!
//! Exposes a single `ContactSensorState` characteristic (open = `true`).

use super::helpers::characteristic::Characteristic;
use serde_json::Value;

/// Name of the exposed characteristic, as used by push notifications.
pub const CONTACT_SENSOR_STATE: &str = "ContactSensorState";

/// Contact sensor (door/window open/close).
pub struct ContactSensorService {
    name: String,
    state: Characteristic,
}

impl ContactSensorService {
    /// Create the service. The state starts out closed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Characteristic::new(CONTACT_SENSOR_STATE, Value::Bool(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &Characteristic {
        &self.state
    }

    /// Look up a characteristic of this service by name.
    pub fn characteristic(&self, name: &str) -> Option<&Characteristic> {
        (name == self.state.name()).then_some(&self.state)
    }
}
