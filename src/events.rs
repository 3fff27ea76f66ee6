//! Radio/timer event queue.
//!
//! Events are produced by:
//! - Bluedroid GATT callbacks (connect, disconnect, write, indicate ack)
//! - The periodic sampling timer
//!
//! Events are consumed by the main loop, which is the **single owner** of
//! the characteristic store, connection registry, and relay pins. Routing
//! every mutation through this queue is the mutual-exclusion discipline
//! that lets the core itself stay lock-free.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GATTS callback   │────▶│              │     │              │
//! │ Sampling timer   │────▶│  Event Queue │────▶│  Main Loop   │
//! │                  │     │  (lock-free) │     │  (consumer)  │
//! └──────────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::gatt::{ConnectionId, Handle};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 32;

/// Largest inbound GATT write payload the queue carries. The only writable
/// characteristic is the one-byte relay command; anything longer is
/// truncated at the adapter boundary and the core ignores the tail anyway.
pub const MAX_WRITE_LEN: usize = 20;

/// Fixed-size copy of an inbound write payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteData {
    buf: [u8; MAX_WRITE_LEN],
    len: u8,
}

impl WriteData {
    /// Copy `data` in, truncating past [`MAX_WRITE_LEN`].
    pub fn from_slice(data: &[u8]) -> Self {
        let len = data.len().min(MAX_WRITE_LEN);
        let mut buf = [0u8; MAX_WRITE_LEN];
        buf[..len].copy_from_slice(&data[..len]);
        Self {
            buf,
            len: len as u8,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The closed event set delivered to the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A central connected.
    CentralConnect { conn: ConnectionId },
    /// A central disconnected.
    CentralDisconnect { conn: ConnectionId },
    /// A central wrote a characteristic value.
    GattsWrite {
        conn: ConnectionId,
        handle: Handle,
        data: WriteData,
    },
    /// A previously sent indication was acknowledged.
    IndicateDone {
        conn: ConnectionId,
        handle: Handle,
        status: u8,
    },
    /// The periodic sampling timer fired.
    SampleTick,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Radio callbacks and the sampling timer write (produce), the main loop
// reads (consume). Producer calls are serialized by the platform: each
// callback runs to completion in the event-delivery context before the
// next is dispatched. Uses atomic head/tail indices.

static EVENT_HEAD: AtomicUsize = AtomicUsize::new(0);
static EVENT_TAIL: AtomicUsize = AtomicUsize::new(0);
// SAFETY: EVENT_BUFFER slots are written only by the producer side before
// the head index is published (Release), and read only by the consumer
// after observing the published head (Acquire). The platform serializes
// producers; the main loop is the single consumer.
static mut EVENT_BUFFER: [Event; EVENT_QUEUE_CAP] = [Event::SampleTick; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from the radio callback / timer task context (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: the slot at `head` is outside the tail..head live window, so
    // the consumer cannot be reading it; producers are serialized.
    unsafe {
        EVENT_BUFFER[head] = event;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    // SAFETY: `tail` is inside the published live window; the producer only
    // writes slots outside it.
    let event = unsafe { EVENT_BUFFER[tail] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP, Ordering::Release);

    Some(event)
}

/// Drain all pending events into a callback, FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

#[cfg(test)]
mod tests {
    use super::*;

    // The ring itself is process-global state shared across the whole test
    // binary, so only the pure payload type is unit-tested here.

    #[test]
    fn write_data_truncates() {
        let long = [0xAB_u8; MAX_WRITE_LEN + 10];
        let data = WriteData::from_slice(&long);
        assert_eq!(data.as_slice().len(), MAX_WRITE_LEN);
        assert!(data.as_slice().iter().all(|b| *b == 0xAB));
    }

    #[test]
    fn write_data_roundtrip() {
        let data = WriteData::from_slice(&[0x03, 0x7F]);
        assert_eq!(data.as_slice(), &[0x03, 0x7F]);
        assert!(!data.is_empty());
    }

    #[test]
    fn write_data_empty() {
        let data = WriteData::from_slice(&[]);
        assert!(data.is_empty());
        assert_eq!(data.as_slice(), &[] as &[u8]);
    }
}
