//! Unified error types for the EnvNode firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level event loop's error handling uniform.
//! All variants are `Copy` so they can be cheaply passed through the GATT core
//! and sampling loop without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A GATT protocol invariant was violated (core/platform contract mismatch).
    Gatt(GattError),
    /// The connection registry saw an event inconsistent with its set.
    Registry(RegistryError),
    /// The environmental sensor could not produce a sample.
    Sensor(SensorError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gatt(e) => write!(f, "gatt: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// GATT protocol errors
// ---------------------------------------------------------------------------

/// Protocol-invariant violations. Unreachable given correct service
/// registration and platform event contracts; surfaced immediately at the
/// integration boundary, never silently swallowed inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattError {
    /// The handle was never registered with the characteristic store.
    UnknownHandle(u16),
    /// A write was dispatched for a handle without the writable capability.
    NotWritable(u16),
    /// `register` was invoked twice for the same characteristic kind.
    DuplicateRegistration,
    /// A value exceeds the fixed per-characteristic storage capacity.
    ValueTooLong,
}

impl fmt::Display for GattError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownHandle(h) => write!(f, "unknown handle {h}"),
            Self::NotWritable(h) => write!(f, "handle {h} is not writable"),
            Self::DuplicateRegistration => write!(f, "characteristic already registered"),
            Self::ValueTooLong => write!(f, "value exceeds characteristic capacity"),
        }
    }
}

impl From<GattError> for Error {
    fn from(e: GattError) -> Self {
        Self::Gatt(e)
    }
}

// ---------------------------------------------------------------------------
// Connection registry errors
// ---------------------------------------------------------------------------

/// Defensive registry mismatches. The platform should not emit duplicate
/// connect or unmatched disconnect events, but a misbehaving radio stack is
/// a realistic operating condition — these are logged and absorbed, never
/// propagated as crashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Connect event for a peer already present in the set.
    AlreadyConnected(u16),
    /// Disconnect event for a peer absent from the set.
    NotConnected(u16),
    /// Connect event while the registry is at its fixed capacity.
    AtCapacity,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConnected(c) => write!(f, "peer {c} already connected"),
            Self::NotConnected(c) => write!(f, "peer {c} not connected"),
            Self::AtCapacity => write!(f, "connection registry full"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Transient sensor failures. The sampling loop skips the cycle and retries
/// naturally on the next periodic tick — no backoff, no process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The sensor did not answer the start pulse within the protocol timeout.
    Timeout,
    /// The 40-bit frame arrived but its checksum byte did not match.
    ChecksumMismatch,
    /// The sensor is still settling after power-up.
    WarmingUp,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "read timed out"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::WarmingUp => write!(f, "sensor warming up"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
