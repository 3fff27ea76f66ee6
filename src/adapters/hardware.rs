//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the DHT sensor and relay bank, exposing them through [`SensorPort`]
//! and [`ActuatorPort`]. This is the only module in the system that touches
//! actual hardware. On non-espidf targets, the underlying drivers use
//! cfg-gated simulation stubs.

use crate::app::ports::{ActuatorPort, Measurement, SensorPort};
use crate::drivers::relay::RelayBank;
use crate::drivers::status_led::HeartbeatLed;
use crate::error::SensorError;
use crate::gatt::RelayMask;
use crate::sensors::dht::DhtSensor;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    dht: DhtSensor,
    relays: RelayBank,
    led: HeartbeatLed,
}

impl HardwareAdapter {
    pub fn new(dht: DhtSensor, relays: RelayBank, led: HeartbeatLed) -> Self {
        Self { dht, relays, led }
    }

    /// Toggle the heartbeat LED — called once per sampling cycle.
    pub fn toggle_heartbeat(&mut self) {
        self.led.toggle();
    }

    /// Release every output (relays and LED).
    pub fn all_off(&mut self) {
        self.relays.all_off();
        self.led.off();
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn measure(&mut self) -> Result<Measurement, SensorError> {
        self.dht.measure()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn apply(&mut self, mask: RelayMask) {
        self.relays.apply(mask);
    }

    fn mask(&self) -> RelayMask {
        self.relays.mask()
    }
}
