//! GPIO pin assignments for the EnvNode sensor board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// DHT22 (AM2302) temperature/humidity sensor
// ---------------------------------------------------------------------------

/// Single-wire data line. Open-drain with external 10 kΩ pull-up; the driver
/// switches direction between the host start pulse and the sensor response.
pub const DHT_DATA_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Relay outputs (SRD-05VDC opto-isolated modules, active HIGH)
// ---------------------------------------------------------------------------

/// Relay channel 1 — bit 0 of the actuator command mask.
pub const RELAY1_GPIO: i32 = 26;
/// Relay channel 2 — bit 1 of the actuator command mask.
pub const RELAY2_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Heartbeat LED
// ---------------------------------------------------------------------------

/// On-board LED, toggled once per sampling cycle.
pub const HEARTBEAT_LED_GPIO: i32 = 2;
