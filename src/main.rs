//! EnvNode Firmware — Main Entry Point
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     LogEventSink     BleRadio                 │
//! │  (Sensor+Actuator)   (EventSink)      (RadioPort + callbacks)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          GattPeripheral (pure protocol logic)          │    │
//! │  │  store · registry · link state                         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  SamplingLoop (timer-driven) · Event queue (lock-free SPSC)    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use envnode::adapters::ble::BleRadio;
use envnode::adapters::device_id;
use envnode::adapters::hardware::HardwareAdapter;
use envnode::adapters::log_sink::LogEventSink;
use envnode::config::SystemConfig;
use envnode::drivers::relay::RelayBank;
use envnode::drivers::status_led::HeartbeatLed;
use envnode::drivers::{hw_init, hw_timer};
use envnode::events::{self, Event};
use envnode::gatt::GattPeripheral;
use envnode::pins;
use envnode::sampling::SamplingLoop;
use envnode::sensors::dht::DhtSensor;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  EnvNode v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Configuration (defaults — nothing persists across resets) ──
    let config = SystemConfig::default();

    // ── Device identity ───────────────────────────────────────
    let mac = device_id::read_mac();
    let name = device_id::advertising_name(&config, &mac);
    info!("Device name: {}", name);

    // ── 4. Construct adapters ─────────────────────────────────
    let mut hw = HardwareAdapter::new(
        DhtSensor::new(pins::DHT_DATA_GPIO, config.sensor_settle_cycles),
        RelayBank::new(),
        HeartbeatLed::new(),
    );
    let mut sink = LogEventSink::new();

    // ── 5. Protocol core + radio stack ────────────────────────
    let mut peripheral =
        GattPeripheral::new(&config).map_err(|e| anyhow::anyhow!("gatt init: {e}"))?;

    let mut radio = BleRadio::new(
        name,
        peripheral.temperature_handle(),
        peripheral.humidity_handle(),
        peripheral.relay_handle(),
    );
    radio
        .init()
        .map_err(|e| anyhow::anyhow!("radio init: {e}"))?;

    peripheral.start(&mut radio, &mut sink);

    // ── 6. Sampling driver ────────────────────────────────────
    let mut sampling = SamplingLoop::new();
    hw_timer::start_sample_timer(config.sample_interval_ms);

    info!("System ready. Entering event loop.");

    // ── 7. Event loop ─────────────────────────────────────────
    loop {
        // Simulate the sample timer via sleep on non-espidf targets.
        // On real hardware, esp_timer and Bluedroid callbacks feed the
        // queue from their own tasks.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(
                config.sample_interval_ms,
            )));
            events::push_event(Event::SampleTick);
        }

        // Process all pending events — the single consumer side of the
        // queue, and the only context that mutates the protocol core.
        events::drain_events(|event| match event {
            Event::SampleTick => {
                sampling.tick(&mut hw, &mut peripheral, &mut radio, &mut sink);
                hw.toggle_heartbeat();
            }
            radio_event => {
                if let Err(e) = peripheral.on_event(radio_event, &mut hw, &mut radio, &mut sink) {
                    log::error!("gatt event dropped: {e}");
                }
            }
        });

        // Yield until the next timer/radio callback lands an event.
        #[cfg(target_os = "espidf")]
        // SAFETY: plain FreeRTOS delay from the main task.
        unsafe {
            esp_idf_svc::sys::vTaskDelay(1);
        }
    }
}
