//! Characteristic value store.
//!
//! Holds the last-published value and capability flags for each exposed
//! characteristic, keyed by a stable [`Handle`] assigned at registration.
//! The store has no side effects beyond itself — notification fan-out is
//! the caller's ([`GattPeripheral`](super::peripheral::GattPeripheral))
//! responsibility, which is what keeps the value/notification consistency
//! invariant local to one call site.
//!
//! ## Encoding contract
//!
//! Temperature and humidity are stored as a little-endian signed 16-bit
//! integer holding the physical value scaled by 100 (23.47 °C → 2347).
//! Relay state is a single byte whose low 2 bits are the actuator mask.
//! This fixed-point layout is a wire contract with downstream readers and
//! must be preserved exactly.

use crate::error::GattError;
use crate::gatt::RelayMask;

/// Fixed characteristic set — one slot per [`CharKind`].
const MAX_CHARACTERISTICS: usize = 3;

/// Per-characteristic value capacity in bytes.
pub const MAX_VALUE_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Handle / kind / capabilities
// ---------------------------------------------------------------------------

/// Stable characteristic handle, assigned once at service registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u16);

impl Handle {
    /// Raw handle value, for logging and adapter-side mapping.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Reconstruct a handle from its raw value.
    ///
    /// For adapter-side use only: radio callbacks carry the raw value of a
    /// handle previously obtained from [`CharacteristicStore::register`].
    /// A fabricated value is rejected by the store as `UnknownHandle`.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }
}

/// Semantic kind of an exposed characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharKind {
    Temperature,
    Humidity,
    RelayState,
}

/// Capability flag bitmask for a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const READ: Self = Self(0b0001);
    pub const NOTIFY: Self = Self(0b0010);
    pub const INDICATE: Self = Self(0b0100);
    pub const WRITE_NO_RESPONSE: Self = Self(0b1000);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn readable(self) -> bool {
        self.contains(Self::READ)
    }

    pub const fn notifiable(self) -> bool {
        self.contains(Self::NOTIFY)
    }

    pub const fn indicatable(self) -> bool {
        self.contains(Self::INDICATE)
    }

    pub const fn writable(self) -> bool {
        self.contains(Self::WRITE_NO_RESPONSE)
    }
}

impl core::ops::BitOr for Capabilities {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct Slot {
    kind: CharKind,
    caps: Capabilities,
    value: heapless::Vec<u8, MAX_VALUE_LEN>,
}

/// Owns every characteristic value for the service. Values are mutated only
/// through [`write`](Self::write); characteristics are never destroyed during
/// the process lifetime.
pub struct CharacteristicStore {
    slots: heapless::Vec<Slot, MAX_CHARACTERISTICS>,
}

impl CharacteristicStore {
    pub fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
        }
    }

    /// Register a characteristic and return its stable handle.
    ///
    /// Called once per kind at startup. A second registration for the same
    /// kind is a programming error, reported as `DuplicateRegistration`.
    pub fn register(&mut self, kind: CharKind, caps: Capabilities) -> Result<Handle, GattError> {
        if self.slots.iter().any(|s| s.kind == kind) {
            return Err(GattError::DuplicateRegistration);
        }
        let handle = Handle(self.slots.len() as u16);
        // Capacity equals the kind count, so a full set implies a duplicate
        // kind — which the check above already rejected.
        self.slots
            .push(Slot {
                kind,
                caps,
                value: heapless::Vec::new(),
            })
            .map_err(|_| GattError::DuplicateRegistration)
            .and(Ok(handle))
    }

    /// Overwrite the stored value for `handle`. No fan-out here.
    pub fn write(&mut self, handle: Handle, bytes: &[u8]) -> Result<(), GattError> {
        let slot = self
            .slots
            .get_mut(handle.0 as usize)
            .ok_or(GattError::UnknownHandle(handle.0))?;
        slot.value.clear();
        slot.value
            .extend_from_slice(bytes)
            .map_err(|()| GattError::ValueTooLong)
    }

    /// The current stored value for `handle`.
    pub fn read(&self, handle: Handle) -> Result<&[u8], GattError> {
        self.slots
            .get(handle.0 as usize)
            .map(|s| s.value.as_slice())
            .ok_or(GattError::UnknownHandle(handle.0))
    }

    /// Capability flags for `handle`.
    pub fn capabilities(&self, handle: Handle) -> Result<Capabilities, GattError> {
        self.slots
            .get(handle.0 as usize)
            .map(|s| s.caps)
            .ok_or(GattError::UnknownHandle(handle.0))
    }

    /// Semantic kind for `handle`.
    pub fn kind(&self, handle: Handle) -> Result<CharKind, GattError> {
        self.slots
            .get(handle.0 as usize)
            .map(|s| s.kind)
            .ok_or(GattError::UnknownHandle(handle.0))
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Scale a physical value to its ×100 fixed-point representation.
///
/// Rounds to the nearest centi-unit so that decimal inputs with two
/// fractional digits map exactly despite f32 representation error
/// (23.47 → 2347, not 2346). Saturates at the i16 range.
pub fn centi_scale(value: f32) -> i16 {
    (value * 100.0).round() as i16
}

/// Little-endian i16 encoding of a ×100-scaled physical value.
pub fn encode_centi(value: f32) -> [u8; 2] {
    centi_scale(value).to_le_bytes()
}

/// Single-byte relay state encoding: low 2 bits = mask, high bits zero.
pub fn encode_relay(mask: RelayMask) -> [u8; 1] {
    [mask.bits()]
}
