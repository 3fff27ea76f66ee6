//! Periodic sampling driver.
//!
//! Pulls one sample from the [`SensorPort`] per timer tick and pushes it
//! into [`GattPeripheral::publish`]. A failed read skips the cycle entirely
//! — no characteristic update, no notification, no stale-but-relabelled
//! value — and the loop continues; the next tick is the retry.
//!
//! ```text
//! ┌──────────────┐   measure()    ┌──────────────┐   publish()
//! │ sample timer │ ─────────────▶ │ SamplingLoop │ ─────────────▶ GattPeripheral
//! └──────────────┘                └──────────────┘
//! ```

use log::{error, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, RadioPort, SensorPort};
use crate::gatt::store::centi_scale;
use crate::gatt::GattPeripheral;

/// Drives periodic sensor acquisition and publication. Pacing comes from
/// the sample timer; this type only owns the per-cycle logic and counters.
pub struct SamplingLoop {
    ticks: u64,
    consecutive_failures: u32,
}

impl SamplingLoop {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            consecutive_failures: 0,
        }
    }

    /// Run one sampling cycle: acquire → publish, or skip on sensor failure.
    pub fn tick(
        &mut self,
        sensor: &mut impl SensorPort,
        peripheral: &mut GattPeripheral,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) {
        self.ticks += 1;

        let sample = match sensor.measure() {
            Ok(sample) => sample,
            Err(e) => {
                self.consecutive_failures += 1;
                warn!(
                    "sampling: sensor read failed ({e}), skipping cycle ({} consecutive)",
                    self.consecutive_failures
                );
                sink.emit(&AppEvent::SampleSkipped {
                    error: e,
                    consecutive: self.consecutive_failures,
                });
                return;
            }
        };
        self.consecutive_failures = 0;

        match peripheral.publish(sample.temperature_c, sample.humidity_pct, radio) {
            Ok(()) => sink.emit(&AppEvent::Published {
                temperature_centi: centi_scale(sample.temperature_c),
                humidity_centi: centi_scale(sample.humidity_pct),
                peers: peripheral.connection_count(),
            }),
            // Unreachable with a correctly constructed peripheral; surfaced
            // rather than swallowed.
            Err(e) => error!("sampling: publish failed: {e}"),
        }
    }

    /// Total sampling cycles attempted since startup.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Failed cycles since the last good sample.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
