//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements               | Connects to               |
//! |-------------|--------------------------|---------------------------|
//! | `ble`       | RadioPort                | Bluedroid GATT server     |
//! | `hardware`  | SensorPort, ActuatorPort | DHT22 GPIO, relay GPIO    |
//! | `log_sink`  | EventSink                | Serial log output         |
//! | `device_id` | —                        | eFuse factory MAC         |

pub mod ble;
pub mod device_id;
pub mod hardware;
pub mod log_sink;
