//! End-to-end tests for the GATT peripheral protocol path: radio events in,
//! actuator commands and notification fan-out out, sampling loop on top.

use envnode::app::events::AppEvent;
use envnode::config::SystemConfig;
use envnode::error::SensorError;
use envnode::events::{Event, WriteData};
use envnode::gatt::{ConnectionId, GattPeripheral, LinkState};
use envnode::sampling::SamplingLoop;

use crate::mock_hw::{MockRadio, MockRelays, ScriptedSensor, VecSink};

struct Rig {
    peripheral: GattPeripheral,
    relays: MockRelays,
    radio: MockRadio,
    sink: VecSink,
}

impl Rig {
    fn new() -> Self {
        let mut peripheral = GattPeripheral::new(&SystemConfig::default()).unwrap();
        let relays = MockRelays::new();
        let mut radio = MockRadio::new();
        let mut sink = VecSink::new();
        peripheral.start(&mut radio, &mut sink);
        Self {
            peripheral,
            relays,
            radio,
            sink,
        }
    }

    fn dispatch(&mut self, event: Event) {
        self.peripheral
            .on_event(event, &mut self.relays, &mut self.radio, &mut self.sink)
            .unwrap();
    }

    fn connect(&mut self, raw: u16) {
        self.dispatch(Event::CentralConnect {
            conn: ConnectionId::new(raw),
        });
    }

    fn disconnect(&mut self, raw: u16) {
        self.dispatch(Event::CentralDisconnect {
            conn: ConnectionId::new(raw),
        });
    }

    fn write_relay(&mut self, raw: u16, payload: &[u8]) {
        self.dispatch(Event::GattsWrite {
            conn: ConnectionId::new(raw),
            handle: self.peripheral.relay_handle(),
            data: WriteData::from_slice(payload),
        });
    }
}

// ── Publish flow ──────────────────────────────────────────────

#[test]
fn publish_reaches_store_stack_and_every_peer() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.connect(2);
    rig.radio.clear();

    let mut sensor = ScriptedSensor::new();
    sensor.push_ok(23.47, 55.12);
    let mut sampling = SamplingLoop::new();
    sampling.tick(
        &mut sensor,
        &mut rig.peripheral,
        &mut rig.radio,
        &mut rig.sink,
    );

    let temp = rig.peripheral.temperature_handle();
    let humid = rig.peripheral.humidity_handle();

    // Fixed-point contract: °C × 100 and %RH × 100, little-endian i16.
    assert_eq!(rig.peripheral.read(temp).unwrap(), &2347_i16.to_le_bytes());
    assert_eq!(rig.peripheral.read(humid).unwrap(), &5512_i16.to_le_bytes());

    // Stack mirror carries the same bytes the notifications did.
    assert_eq!(
        rig.radio.last_set_value(temp).unwrap(),
        2347_i16.to_le_bytes()
    );

    // Exactly one notify per characteristic per peer, no duplicates.
    for handle in [temp, humid] {
        let notifies = rig.radio.notifies_for(handle);
        assert_eq!(notifies.len(), 2);
        let mut peers: Vec<u16> = notifies.iter().map(|(p, _)| *p).collect();
        peers.sort_unstable();
        assert_eq!(peers, vec![1, 2]);
    }

    // Notified payloads equal the readable values.
    for (_, payload) in rig.radio.notifies_for(temp) {
        assert_eq!(payload, 2347_i16.to_le_bytes());
    }

    assert!(rig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::Published { peers: 2, .. })));
}

#[test]
fn sensor_failure_skips_cycle_entirely() {
    let mut rig = Rig::new();
    rig.connect(1);

    let mut sensor = ScriptedSensor::new();
    sensor
        .push_ok(20.0, 40.0)
        .push_err(SensorError::ChecksumMismatch);
    let mut sampling = SamplingLoop::new();

    sampling.tick(
        &mut sensor,
        &mut rig.peripheral,
        &mut rig.radio,
        &mut rig.sink,
    );
    let temp_before = rig
        .peripheral
        .read(rig.peripheral.temperature_handle())
        .unwrap()
        .to_vec();
    let notify_count_before = rig.radio.notify_count();

    sampling.tick(
        &mut sensor,
        &mut rig.peripheral,
        &mut rig.radio,
        &mut rig.sink,
    );

    assert_eq!(
        rig.peripheral
            .read(rig.peripheral.temperature_handle())
            .unwrap(),
        temp_before,
        "failed cycle must leave values unchanged"
    );
    assert_eq!(
        rig.radio.notify_count(),
        notify_count_before,
        "failed cycle must not notify"
    );
    assert_eq!(
        rig.sink
            .count_matching(|e| matches!(e, AppEvent::SampleSkipped { .. })),
        1
    );
}

#[test]
fn warmup_cycles_flow_through_sampling_loop() {
    // Real DHT driver in host-simulation mode: the settle cycle surfaces
    // as WarmingUp, then readings flow.
    use envnode::sensors::dht::DhtSensor;

    let mut rig = Rig::new();
    let mut dht = DhtSensor::new(envnode::pins::DHT_DATA_GPIO, 1);
    let mut sampling = SamplingLoop::new();

    sampling.tick(&mut dht, &mut rig.peripheral, &mut rig.radio, &mut rig.sink);
    assert_eq!(sampling.consecutive_failures(), 1);
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::SampleSkipped {
            error: SensorError::WarmingUp,
            ..
        })
    ));

    sampling.tick(&mut dht, &mut rig.peripheral, &mut rig.radio, &mut rig.sink);
    assert_eq!(sampling.consecutive_failures(), 0);
    assert!(rig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::Published { .. })));
}

// ── Relay command path ────────────────────────────────────────

#[test]
fn relay_write_burst_applies_in_order_and_fans_out() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.connect(2);
    rig.radio.clear();

    let burst: [u8; 6] = [0x00, 0x01, 0x02, 0x03, 0xFF, 0xFC];
    for byte in burst {
        rig.write_relay(1, &[byte]);
    }

    // Actuator saw every command, in order, always masked to 2 bits.
    let applied: Vec<u8> = rig.relays.applied.iter().map(|m| m.bits()).collect();
    assert_eq!(applied, vec![0x0, 0x1, 0x2, 0x3, 0x3, 0x0]);

    // Store reflects the final command.
    assert_eq!(
        rig.peripheral.read(rig.peripheral.relay_handle()).unwrap(),
        &[0x0]
    );

    // Each write notified both peers.
    let relay_notifies = rig.radio.notifies_for(rig.peripheral.relay_handle());
    assert_eq!(relay_notifies.len(), burst.len() * 2);
}

#[test]
fn relay_write_notifies_peers_other_than_the_writer() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.connect(2);
    rig.connect(3);
    rig.radio.clear();

    rig.write_relay(2, &[0x01]);

    let mut peers: Vec<u16> = rig
        .radio
        .notifies_for(rig.peripheral.relay_handle())
        .iter()
        .map(|(p, _)| *p)
        .collect();
    peers.sort_unstable();
    assert_eq!(peers, vec![1, 2, 3], "relay state fans out to every subscriber");
}

#[test]
fn empty_relay_write_is_a_noop() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.radio.clear();

    rig.write_relay(1, &[]);

    assert!(rig.relays.applied.is_empty());
    assert_eq!(rig.radio.notify_count(), 0);
    assert_eq!(
        rig.peripheral.read(rig.peripheral.relay_handle()).unwrap(),
        &[0x0]
    );
}

#[test]
fn write_to_sensor_characteristic_is_rejected() {
    let mut rig = Rig::new();
    rig.connect(1);
    let temp = rig.peripheral.temperature_handle();
    let before = rig.peripheral.read(temp).unwrap().to_vec();

    let result = rig.peripheral.on_event(
        Event::GattsWrite {
            conn: ConnectionId::new(1),
            handle: temp,
            data: WriteData::from_slice(&[0x01]),
        },
        &mut rig.relays,
        &mut rig.radio,
        &mut rig.sink,
    );

    assert!(result.is_err());
    assert!(rig.relays.applied.is_empty(), "must not reach the actuator");
    assert_eq!(rig.peripheral.read(temp).unwrap(), before);
}

// ── Connection lifecycle ──────────────────────────────────────

#[test]
fn last_disconnect_resumes_advertising_and_accepts_reconnect() {
    let mut rig = Rig::new();
    assert_eq!(rig.radio.advertise_count(), 1, "initial advertise");

    rig.connect(1);
    rig.connect(2);
    rig.disconnect(2);
    assert_eq!(rig.radio.advertise_count(), 1, "peer 1 still connected");

    rig.disconnect(1);
    assert_eq!(rig.peripheral.state(), LinkState::Advertising);
    assert_eq!(rig.radio.advertise_count(), 2, "re-advertise exactly once");
    assert!(rig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::AdvertisingResumed)));

    rig.connect(3);
    assert_eq!(rig.peripheral.state(), LinkState::Connected(1));
}

#[test]
fn dropped_peer_never_sees_another_notification() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.connect(2);
    rig.disconnect(1);
    rig.radio.clear();

    let mut sensor = ScriptedSensor::new();
    sensor.push_ok(25.0, 50.0);
    let mut sampling = SamplingLoop::new();
    sampling.tick(
        &mut sensor,
        &mut rig.peripheral,
        &mut rig.radio,
        &mut rig.sink,
    );
    rig.write_relay(2, &[0x03]);

    assert!(
        rig.radio
            .calls
            .iter()
            .all(|c| !matches!(c, crate::mock_hw::RadioCall::Notify { conn, .. } if conn.raw() == 1)),
        "registry removal must precede all subsequent fan-out"
    );
}

#[test]
fn duplicate_connect_and_spurious_disconnect_are_absorbed() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.connect(1);
    assert_eq!(rig.peripheral.connection_count(), 1);

    rig.disconnect(9);
    assert_eq!(rig.peripheral.connection_count(), 1);
    assert_eq!(
        rig.radio.advertise_count(),
        1,
        "spurious disconnect must not re-advertise"
    );
}

#[test]
fn indicate_ack_changes_nothing() {
    let mut rig = Rig::new();
    rig.connect(1);
    let state = rig.peripheral.state();
    let calls = rig.radio.calls.len();

    rig.dispatch(Event::IndicateDone {
        conn: ConnectionId::new(1),
        handle: rig.peripheral.temperature_handle(),
        status: 0,
    });

    assert_eq!(rig.peripheral.state(), state);
    assert_eq!(rig.radio.calls.len(), calls);
}
