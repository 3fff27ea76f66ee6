//! Fuzz target: `GattPeripheral::on_event`
//!
//! Interprets the input as an opcode stream of connect / disconnect /
//! write / publish events and asserts the protocol invariants after every
//! step: the relay store value never exceeds the two-bit mask, the link
//! state always matches the registry count, and nothing panics.
//!
//! cargo fuzz run fuzz_event_stream

#![no_main]

use libfuzzer_sys::fuzz_target;

use envnode::app::events::AppEvent;
use envnode::app::ports::{ActuatorPort, EventSink, RadioPort};
use envnode::config::SystemConfig;
use envnode::events::{Event, WriteData};
use envnode::gatt::{ConnectionId, GattPeripheral, Handle, LinkState, RelayMask};

struct Relays(u8);

impl ActuatorPort for Relays {
    fn apply(&mut self, mask: RelayMask) {
        self.0 = mask.bits();
    }

    fn mask(&self) -> RelayMask {
        RelayMask::from_command_byte(self.0)
    }
}

struct NullRadio;

impl RadioPort for NullRadio {
    fn advertise(&mut self, _interval_ms: u32) {}
    fn set_value(&mut self, _handle: Handle, _value: &[u8]) {}
    fn notify(&mut self, _conn: ConnectionId, _handle: Handle, _value: &[u8]) {}
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let mut p = GattPeripheral::new(&SystemConfig::default()).unwrap();
    let mut relays = Relays(0);
    let mut radio = NullRadio;
    let mut sink = NullSink;
    p.start(&mut radio, &mut sink);

    let mut bytes = data.iter().copied();
    while let Some(op) = bytes.next() {
        let arg = bytes.next().unwrap_or(0);
        let conn = ConnectionId::new(u16::from(arg & 0x7));
        let event = match op % 5 {
            0 => Event::CentralConnect { conn },
            1 => Event::CentralDisconnect { conn },
            2 => Event::GattsWrite {
                conn,
                handle: p.relay_handle(),
                data: WriteData::from_slice(&[arg]),
            },
            3 => Event::GattsWrite {
                conn,
                handle: p.relay_handle(),
                data: WriteData::from_slice(&[]),
            },
            _ => Event::IndicateDone {
                conn,
                handle: p.temperature_handle(),
                status: arg,
            },
        };
        // Rejections are typed, never panics.
        let _ = p.on_event(event, &mut relays, &mut radio, &mut sink);

        let stored = p.read(p.relay_handle()).unwrap();
        assert_eq!(stored.len(), 1, "relay value must stay a single byte");
        assert!(stored[0] <= 0x3, "relay value must stay within the mask");
        assert_eq!(stored[0], relays.0, "store and actuator must agree");

        match p.state() {
            LinkState::Connected(n) => assert_eq!(n, p.connection_count()),
            LinkState::Advertising => assert_eq!(p.connection_count(), 0),
            LinkState::Idle => unreachable!("Idle unreachable after start"),
        }
    }
});
