//! Sensor subsystem.
//!
//! A single environmental sensor feeds this firmware: the DHT22 combined
//! temperature/humidity part on a one-wire data line.

pub mod dht;
