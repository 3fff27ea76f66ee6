//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future telemetry characteristic adapter would implement the same trait.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | link_state={:?}", state);
            }
            AppEvent::CentralConnected { conn, total } => {
                info!("CONN  | peer={} total={}", conn.raw(), total);
            }
            AppEvent::CentralDisconnected { conn, remaining } => {
                info!("DISC  | peer={} remaining={}", conn.raw(), remaining);
            }
            AppEvent::AdvertisingResumed => {
                info!("ADV   | resumed after last peer dropped");
            }
            AppEvent::RelayApplied { conn, mask } => {
                info!("RELAY | mask=0b{:02b} from peer={}", mask.bits(), conn.raw());
            }
            AppEvent::Published {
                temperature_centi,
                humidity_centi,
                peers,
            } => {
                // One line per second at the default sampling interval —
                // debug level keeps the production console quiet.
                debug!(
                    "PUB   | T={}.{:02}C RH={}.{:02}% peers={}",
                    temperature_centi / 100,
                    (temperature_centi % 100).abs(),
                    humidity_centi / 100,
                    (humidity_centi % 100).abs(),
                    peers,
                );
            }
            AppEvent::SampleSkipped { error, consecutive } => {
                warn!("SKIP  | sensor={} consecutive={}", error, consecutive);
            }
        }
    }
}
