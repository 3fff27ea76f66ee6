//! Mock hardware adapters for integration tests.
//!
//! Record every port call so tests can assert on the full command history
//! without touching real GPIO or a radio stack.

use std::collections::VecDeque;

use envnode::app::events::AppEvent;
use envnode::app::ports::{ActuatorPort, EventSink, Measurement, RadioPort, SensorPort};
use envnode::error::SensorError;
use envnode::gatt::{ConnectionId, Handle, RelayMask};

// ── Radio call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    Advertise { interval_ms: u32 },
    SetValue { handle: Handle, value: Vec<u8> },
    Notify {
        conn: ConnectionId,
        handle: Handle,
        value: Vec<u8>,
    },
}

// ── MockRadio ─────────────────────────────────────────────────

pub struct MockRadio {
    pub calls: Vec<RadioCall>,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    pub fn advertise_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RadioCall::Advertise { .. }))
            .count()
    }

    /// Every notify for `handle` as (peer, payload) pairs, in send order.
    pub fn notifies_for(&self, handle: Handle) -> Vec<(u16, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RadioCall::Notify {
                    conn,
                    handle: h,
                    value,
                } if *h == handle => Some((conn.raw(), value.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn notify_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RadioCall::Notify { .. }))
            .count()
    }

    /// The most recent value mirrored into the stack for `handle`.
    pub fn last_set_value(&self, handle: Handle) -> Option<Vec<u8>> {
        self.calls.iter().rev().find_map(|c| match c {
            RadioCall::SetValue { handle: h, value } if *h == handle => Some(value.clone()),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioPort for MockRadio {
    fn advertise(&mut self, interval_ms: u32) {
        self.calls.push(RadioCall::Advertise { interval_ms });
    }

    fn set_value(&mut self, handle: Handle, value: &[u8]) {
        self.calls.push(RadioCall::SetValue {
            handle,
            value: value.to_vec(),
        });
    }

    fn notify(&mut self, conn: ConnectionId, handle: Handle, value: &[u8]) {
        self.calls.push(RadioCall::Notify {
            conn,
            handle,
            value: value.to_vec(),
        });
    }
}

// ── MockRelays ────────────────────────────────────────────────

pub struct MockRelays {
    pub applied: Vec<RelayMask>,
    mask: RelayMask,
}

#[allow(dead_code)]
impl MockRelays {
    pub fn new() -> Self {
        Self {
            applied: Vec::new(),
            mask: RelayMask::OFF,
        }
    }
}

impl Default for MockRelays {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockRelays {
    fn apply(&mut self, mask: RelayMask) {
        self.applied.push(mask);
        self.mask = mask;
    }

    fn mask(&self) -> RelayMask {
        self.mask
    }
}

// ── ScriptedSensor ────────────────────────────────────────────

/// Sensor whose readings are scripted per tick; runs dry as timeouts.
pub struct ScriptedSensor {
    script: VecDeque<Result<Measurement, SensorError>>,
}

#[allow(dead_code)]
impl ScriptedSensor {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
        }
    }

    pub fn push_ok(&mut self, temperature_c: f32, humidity_pct: f32) -> &mut Self {
        self.script.push_back(Ok(Measurement {
            temperature_c,
            humidity_pct,
        }));
        self
    }

    pub fn push_err(&mut self, error: SensorError) -> &mut Self {
        self.script.push_back(Err(error));
        self
    }
}

impl Default for ScriptedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for ScriptedSensor {
    fn measure(&mut self) -> Result<Measurement, SensorError> {
        self.script.pop_front().unwrap_or(Err(SensorError::Timeout))
    }
}

// ── VecSink ───────────────────────────────────────────────────

pub struct VecSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count_matching(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for VecSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}
