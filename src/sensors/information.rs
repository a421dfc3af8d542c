//! Accessory information reported to the host.

/// Static details shown by the host for this accessory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub serial_number: &'static str,
    pub firmware_revision: &'static str,
}

pub const ACCESSORY_INFO: AccessoryInformation = AccessoryInformation {
    manufacturer: "http-contact-sensor",
    model: "HTTP Contact Sensor",
    serial_number: "CS01",
    firmware_revision: env!("CARGO_PKG_VERSION"),
};
