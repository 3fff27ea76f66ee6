//! GATT peripheral state machine.
//!
//! Orchestrates the protocol core: owns the [`CharacteristicStore`] and
//! [`ConnectionRegistry`], interprets inbound radio events, drives outbound
//! value updates, and manages the advertise/connected lifecycle.
//!
//! ## Link state
//!
//! ```text
//!        start()              on_connect
//!  Idle ────────▶ Advertising ──────────▶ Connected(n)
//!                      ▲                      │
//!                      └──────────────────────┘
//!                        last peer disconnects
//!                        (advertising re-issued exactly once)
//! ```
//!
//! ## Consistency
//!
//! Every publish/write path updates the store *before* fanning out, and
//! both happen inside one event-loop turn — a central reading back a
//! handle after receiving a notification always sees the notified value.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, EventSink, RadioPort};
use crate::config::SystemConfig;
use crate::error::{Error, GattError, Result};
use crate::events::Event;
use crate::gatt::registry::{ConnectionId, ConnectionRegistry};
use crate::gatt::store::{
    encode_centi, encode_relay, Capabilities, CharKind, CharacteristicStore, Handle,
};
use crate::gatt::RelayMask;

/// Advertise/connected lifecycle state.
///
/// `Idle` exists only between construction and [`GattPeripheral::start`];
/// once running, the device is always either advertising or connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Constructed, service registered, radio not yet started.
    Idle,
    /// Discoverable, no active connections.
    Advertising,
    /// `n ≥ 1` active connections.
    Connected(usize),
}

/// The peripheral-role protocol core.
pub struct GattPeripheral {
    store: CharacteristicStore,
    registry: ConnectionRegistry,
    temp_handle: Handle,
    humid_handle: Handle,
    relay_handle: Handle,
    state: LinkState,
    adv_interval_ms: u32,
}

impl GattPeripheral {
    /// Register the Environmental Sensing service characteristics and seed
    /// their initial values. The radio is not touched until [`start`].
    ///
    /// [`start`]: Self::start
    pub fn new(config: &SystemConfig) -> Result<Self> {
        let mut store = CharacteristicStore::new();

        // Indicate is declared on the sensor characteristics for protocol
        // compatibility; the core only ever notifies.
        let sensor_caps = Capabilities::READ | Capabilities::NOTIFY | Capabilities::INDICATE;
        let relay_caps =
            Capabilities::READ | Capabilities::WRITE_NO_RESPONSE | Capabilities::NOTIFY;

        let temp_handle = store.register(CharKind::Temperature, sensor_caps)?;
        let humid_handle = store.register(CharKind::Humidity, sensor_caps)?;
        let relay_handle = store.register(CharKind::RelayState, relay_caps)?;

        store.write(temp_handle, &encode_centi(0.0))?;
        store.write(humid_handle, &encode_centi(0.0))?;
        store.write(relay_handle, &encode_relay(RelayMask::OFF))?;

        Ok(Self {
            store,
            registry: ConnectionRegistry::new(),
            temp_handle,
            humid_handle,
            relay_handle,
            state: LinkState::Idle,
            adv_interval_ms: config.adv_interval_ms,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Mirror the seeded values into the radio stack and issue the first
    /// advertisement. Call once after construction.
    pub fn start(&mut self, radio: &mut impl RadioPort, sink: &mut impl EventSink) {
        for handle in [self.temp_handle, self.humid_handle, self.relay_handle] {
            if let Ok(value) = self.store.read(handle) {
                radio.set_value(handle, value);
            }
        }
        radio.advertise(self.adv_interval_ms);
        self.state = LinkState::Advertising;
        sink.emit(&AppEvent::Started(self.state));
        info!("GATT peripheral advertising (interval {} ms)", self.adv_interval_ms);
    }

    // ── Event dispatch ────────────────────────────────────────

    /// Dispatch one inbound radio event.
    ///
    /// Defensive registry mismatches are logged and absorbed here;
    /// protocol-invariant violations propagate to the caller for
    /// error-level logging at the integration boundary.
    pub fn on_event(
        &mut self,
        event: Event,
        relays: &mut impl ActuatorPort,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match event {
            Event::CentralConnect { conn } => {
                self.on_connect(conn, sink);
                Ok(())
            }
            Event::CentralDisconnect { conn } => {
                self.on_disconnect(conn, radio, sink);
                Ok(())
            }
            Event::GattsWrite { conn, handle, data } => {
                self.on_write(conn, handle, data.as_slice(), relays, radio, sink)
            }
            Event::IndicateDone {
                conn,
                handle,
                status,
            } => {
                // Observational only: no characteristic gates on a confirmed
                // indication in this service set.
                debug!(
                    "indicate ack from peer {} handle {} status {}",
                    conn.raw(),
                    handle.raw(),
                    status
                );
                Ok(())
            }
            Event::SampleTick => {
                // Routed to the sampling loop by the main loop; reaching the
                // protocol core is a dispatch bug.
                debug_assert!(false, "SampleTick dispatched to GattPeripheral");
                Ok(())
            }
        }
    }

    fn on_connect(&mut self, conn: ConnectionId, sink: &mut impl EventSink) {
        match self.registry.add(conn) {
            Ok(()) => {
                self.state = LinkState::Connected(self.registry.len());
                sink.emit(&AppEvent::CentralConnected {
                    conn,
                    total: self.registry.len(),
                });
                info!("central {} connected ({} total)", conn.raw(), self.registry.len());
            }
            // A buggy stack may re-report a live peer; the set must not
            // be corrupted by it.
            Err(e) => warn!("connect event absorbed: {e}"),
        }
    }

    fn on_disconnect(
        &mut self,
        conn: ConnectionId,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) {
        match self.registry.remove(conn) {
            Ok(()) => {
                let remaining = self.registry.len();
                sink.emit(&AppEvent::CentralDisconnected { conn, remaining });
                info!("central {} disconnected ({} remain)", conn.raw(), remaining);
                if remaining == 0 {
                    // Mandatory: resume discoverability after losing the
                    // last peer, exactly once per disconnect.
                    radio.advertise(self.adv_interval_ms);
                    self.state = LinkState::Advertising;
                    sink.emit(&AppEvent::AdvertisingResumed);
                } else {
                    self.state = LinkState::Connected(remaining);
                }
            }
            Err(e) => warn!("disconnect event absorbed: {e}"),
        }
    }

    /// Handle an inbound characteristic write.
    ///
    /// Only the relay characteristic is writable. A non-empty write takes
    /// the low 2 bits of the first byte as the command mask (there are two
    /// physical outputs; higher bits are silently ignored), drives the
    /// actuator, mirrors the state into the store, and notifies every
    /// connected peer. An empty write is a no-op.
    pub fn on_write(
        &mut self,
        conn: ConnectionId,
        handle: Handle,
        data: &[u8],
        relays: &mut impl ActuatorPort,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let caps = self.store.capabilities(handle)?;
        if !caps.writable() {
            return Err(Error::Gatt(GattError::NotWritable(handle.raw())));
        }

        let Some(&first) = data.first() else {
            debug!("empty write to handle {} ignored", handle.raw());
            return Ok(());
        };

        let mask = RelayMask::from_command_byte(first);
        relays.apply(mask);

        let encoded = encode_relay(mask);
        self.store.write(self.relay_handle, &encoded)?;
        radio.set_value(self.relay_handle, &encoded);
        for peer in self.registry.snapshot() {
            radio.notify(peer, self.relay_handle, &encoded);
        }

        sink.emit(&AppEvent::RelayApplied { conn, mask });
        info!("relay command 0b{:02b} from peer {}", mask.bits(), conn.raw());
        Ok(())
    }

    /// Publish a fresh environmental sample.
    ///
    /// Both store writes complete before any notification is sent, so the
    /// fan-out and a subsequent read can never disagree. This is the only
    /// path driven by the sampling loop rather than inbound radio events.
    pub fn publish(
        &mut self,
        temperature_c: f32,
        humidity_pct: f32,
        radio: &mut impl RadioPort,
    ) -> Result<()> {
        let temp = encode_centi(temperature_c);
        let humid = encode_centi(humidity_pct);

        self.store.write(self.temp_handle, &temp)?;
        self.store.write(self.humid_handle, &humid)?;
        radio.set_value(self.temp_handle, &temp);
        radio.set_value(self.humid_handle, &humid);

        for peer in self.registry.snapshot() {
            radio.notify(peer, self.temp_handle, &temp);
            radio.notify(peer, self.humid_handle, &humid);
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Stored value for `handle` (what a central's read returns).
    pub fn read(&self, handle: Handle) -> Result<&[u8]> {
        Ok(self.store.read(handle)?)
    }

    pub fn temperature_handle(&self) -> Handle {
        self.temp_handle
    }

    pub fn humidity_handle(&self) -> Handle {
        self.humid_handle
    }

    pub fn relay_handle(&self) -> Handle {
        self.relay_handle
    }
}
