//! Outbound application events.
//!
//! The GATT core and sampling loop emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them — log to serial, count for diagnostics, etc.

use crate::error::SensorError;
use crate::gatt::{ConnectionId, LinkState, RelayMask};

/// Structured events emitted by the protocol core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The peripheral started and issued its first advertisement.
    Started(LinkState),

    /// A central connected.
    CentralConnected { conn: ConnectionId, total: usize },

    /// A central disconnected.
    CentralDisconnected { conn: ConnectionId, remaining: usize },

    /// The last peer dropped and advertising was re-issued.
    AdvertisingResumed,

    /// A write command was applied to the relay outputs.
    RelayApplied { conn: ConnectionId, mask: RelayMask },

    /// A sample was published to every connected peer.
    Published {
        temperature_centi: i16,
        humidity_centi: i16,
        peers: usize,
    },

    /// A sampling cycle was skipped because the sensor read failed.
    SampleSkipped {
        error: SensorError,
        consecutive: u32,
    },
}
