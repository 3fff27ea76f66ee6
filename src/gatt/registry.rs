//! Connected-peer registry.
//!
//! The single source of truth for notify fan-out: a peer receives
//! notifications if and only if it is present here. Entries are created on
//! CONNECT and destroyed on DISCONNECT — no other component keeps a copy
//! that could go stale, which is what guarantees a dropped connection never
//! receives further notifications.

use crate::error::RegistryError;

/// Maximum concurrent peers tracked. The platform radio stack enforces its
/// own connection limit; this bound only sizes the fixed storage.
pub const MAX_CONNECTIONS: usize = 4;

/// Opaque peer session identifier assigned by the radio stack on connect,
/// invalidated on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u16);

impl ConnectionId {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Point-in-time enumeration of connected peers, used for fan-out.
pub type Snapshot = heapless::Vec<ConnectionId, MAX_CONNECTIONS>;

/// The set of currently connected peers. Uniqueness invariant: no duplicate
/// add, no double removal — violations are reported as typed errors for the
/// caller to log and absorb.
pub struct ConnectionRegistry {
    peers: heapless::Vec<ConnectionId, MAX_CONNECTIONS>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            peers: heapless::Vec::new(),
        }
    }

    /// Insert a peer reported by a CONNECT event.
    pub fn add(&mut self, conn: ConnectionId) -> Result<(), RegistryError> {
        if self.peers.contains(&conn) {
            return Err(RegistryError::AlreadyConnected(conn.raw()));
        }
        self.peers
            .push(conn)
            .map_err(|_| RegistryError::AtCapacity)
    }

    /// Remove a peer reported by a DISCONNECT event.
    pub fn remove(&mut self, conn: ConnectionId) -> Result<(), RegistryError> {
        match self.peers.iter().position(|p| *p == conn) {
            Some(idx) => {
                // swap_remove keeps removal O(1); fan-out order is unspecified.
                self.peers.swap_remove(idx);
                Ok(())
            }
            None => Err(RegistryError::NotConnected(conn.raw())),
        }
    }

    /// A point-in-time copy of the peer set.
    ///
    /// Fan-out iterates the copy, so a disconnect processed mid-iteration in
    /// some future multi-context design cannot invalidate it. Under the
    /// current single-owner event loop this is trivially safe, but the
    /// contract must hold regardless.
    pub fn snapshot(&self) -> Snapshot {
        self.peers.clone()
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.peers.contains(&conn)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_snapshot() {
        let mut reg = ConnectionRegistry::new();
        reg.add(ConnectionId::new(1)).unwrap();
        reg.add(ConnectionId::new(2)).unwrap();
        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert!(snap.contains(&ConnectionId::new(1)));
        assert!(snap.contains(&ConnectionId::new(2)));
    }

    #[test]
    fn duplicate_add_rejected() {
        let mut reg = ConnectionRegistry::new();
        reg.add(ConnectionId::new(7)).unwrap();
        assert_eq!(
            reg.add(ConnectionId::new(7)),
            Err(RegistryError::AlreadyConnected(7))
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_absent_peer_rejected() {
        let mut reg = ConnectionRegistry::new();
        assert_eq!(
            reg.remove(ConnectionId::new(3)),
            Err(RegistryError::NotConnected(3))
        );
    }

    #[test]
    fn double_remove_rejected_not_corrupting() {
        let mut reg = ConnectionRegistry::new();
        reg.add(ConnectionId::new(5)).unwrap();
        reg.remove(ConnectionId::new(5)).unwrap();
        assert_eq!(
            reg.remove(ConnectionId::new(5)),
            Err(RegistryError::NotConnected(5))
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn at_capacity_reported() {
        let mut reg = ConnectionRegistry::new();
        for i in 0..MAX_CONNECTIONS as u16 {
            reg.add(ConnectionId::new(i)).unwrap();
        }
        assert_eq!(
            reg.add(ConnectionId::new(99)),
            Err(RegistryError::AtCapacity)
        );
        assert_eq!(reg.len(), MAX_CONNECTIONS);
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let mut reg = ConnectionRegistry::new();
        reg.add(ConnectionId::new(1)).unwrap();
        let snap = reg.snapshot();
        reg.remove(ConnectionId::new(1)).unwrap();
        assert_eq!(snap.len(), 1, "snapshot must not track later removals");
        assert!(reg.is_empty());
    }
}
