//! Port traits — the hexagonal boundary between the protocol core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GattPeripheral / SamplingLoop (domain)
//! ```
//!
//! Driven adapters (sensor, relays, radio stack, event sinks) implement
//! these traits. The core consumes them via generics at call sites, so it
//! never touches hardware directly.

use crate::error::SensorError;
use crate::gatt::{ConnectionId, Handle, RelayMask};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One environmental sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Ambient temperature in °C.
    pub temperature_c: f32,
    /// Relative humidity in %.
    pub humidity_pct: f32,
}

/// Read-side port: the sampling loop calls this to obtain a sample.
///
/// `measure` may block for the sensor's protocol duration (a few
/// milliseconds for a DHT-class part) but runs outside the radio event
/// handling path. Transient failures are expected and typed.
pub trait SensorPort {
    fn measure(&mut self) -> Result<Measurement, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the GATT core calls this to drive the relay outputs.
///
/// The physical pins are exclusively owned by the write-command path —
/// no other component mutates them.
pub trait ActuatorPort {
    /// Drive both relay channels from a validated command mask.
    fn apply(&mut self, mask: RelayMask);

    /// The mask currently applied to the outputs.
    fn mask(&self) -> RelayMask;
}

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain → BLE stack)
// ───────────────────────────────────────────────────────────────

/// Outbound operations on the platform radio stack.
///
/// Inbound traffic (connect, disconnect, writes, indicate acks) arrives
/// through the event queue in [`crate::events`], not through this trait.
/// Indicate is deliberately absent: the characteristics declare the
/// capability for protocol compatibility, but the core only ever notifies.
pub trait RadioPort {
    /// (Re-)start advertising at the given interval.
    fn advertise(&mut self, interval_ms: u32);

    /// Mirror a characteristic value into the stack's attribute table so a
    /// central's plain read returns it.
    fn set_value(&mut self, handle: Handle, value: &[u8]);

    /// Send an unacknowledged notification to one peer.
    fn notify(&mut self, conn: ConnectionId, handle: Handle, value: &[u8]);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, a future
/// telemetry characteristic, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
