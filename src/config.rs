//! System configuration parameters
//!
//! All tunable parameters for the EnvNode peripheral. The device runs from
//! defaults on every boot — configuration is not persisted across resets.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Identity ---
    /// Advertised device name. Empty = derive from the factory MAC
    /// (`envnode-xxyyzz`).
    pub device_name: heapless::String<24>,

    // --- Advertising ---
    /// Advertising interval (milliseconds)
    pub adv_interval_ms: u32,

    // --- Sampling ---
    /// Sensor sampling / publish interval (milliseconds)
    pub sample_interval_ms: u32,
    /// Number of sampling cycles discarded while the sensor settles
    /// after power-up
    pub sensor_settle_cycles: u8,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Identity
            device_name: heapless::String::new(),

            // Advertising
            adv_interval_ms: 250,

            // Sampling — DHT22 supports at most one read every 2 s per the
            // datasheet, but tolerates 1 Hz polling in practice.
            sample_interval_ms: 1000,
            sensor_settle_cycles: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.adv_interval_ms > 0);
        assert!(c.sample_interval_ms > 0);
        assert!(c.device_name.is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.adv_interval_ms, c2.adv_interval_ms);
        assert_eq!(c.sample_interval_ms, c2.sample_interval_ms);
        assert_eq!(c.sensor_settle_cycles, c2.sensor_settle_cycles);
    }

    #[test]
    fn advertising_faster_than_sampling() {
        let c = SystemConfig::default();
        assert!(
            c.adv_interval_ms < c.sample_interval_ms,
            "a scanner should see several advertisements per published sample"
        );
    }
}
