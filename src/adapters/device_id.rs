//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable, human-readable device name in the form
//! `envnode-xxyyzz` (last 3 bytes of the 6-byte MAC in lowercase hex):
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - Used as the BLE advertising local name unless the configuration
//!   overrides it

use crate::config::SystemConfig;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Advertised device name.
pub type DeviceName = heapless::String<24>;

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the default advertising name from the last 3 MAC bytes.
/// Format: `envnode-xxyyzz` (lowercase, 15 chars).
pub fn default_name(mac: &MacAddress) -> DeviceName {
    let mut name = DeviceName::new();
    use core::fmt::Write;
    let _ = write!(name, "envnode-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}

/// The name to advertise: the configured override, or the MAC-derived
/// default when the configuration leaves it empty.
pub fn advertising_name(config: &SystemConfig, mac: &MacAddress) -> DeviceName {
    if config.device_name.is_empty() {
        default_name(mac)
    } else {
        config.device_name.clone()
    }
}
