//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions and initial levels using raw ESP-IDF sys
//! calls. Called once from `main()` before the event loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the event loop; single-threaded.
    unsafe {
        // Relay outputs: driven low at boot so both channels start released,
        // pull-down keeps them released through reset glitches.
        for gpio in [pins::RELAY1_GPIO, pins::RELAY2_GPIO] {
            let ret = gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_OUTPUT);
            if ret != ESP_OK {
                return Err(HwInitError::GpioConfigFailed(ret));
            }
            gpio_set_pull_mode(gpio, gpio_pull_mode_t_GPIO_PULLDOWN_ONLY);
            gpio_set_level(gpio, 0);
        }

        // Heartbeat LED output.
        let ret = gpio_set_direction(pins::HEARTBEAT_LED_GPIO, gpio_mode_t_GPIO_MODE_OUTPUT);
        if ret != ESP_OK {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        gpio_set_level(pins::HEARTBEAT_LED_GPIO, 0);

        // DHT data line idles as an input against the external pull-up; the
        // driver flips direction per read.
        let ret = gpio_set_direction(pins::DHT_DATA_GPIO, gpio_mode_t_GPIO_MODE_INPUT);
        if ret != ESP_OK {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO write helper ─────────────────────────────────────────

/// Set a digital output level. Drivers route every pin write through here
/// so simulation builds stay hardware-free.
#[cfg(target_os = "espidf")]
pub fn gpio_write(gpio: i32, high: bool) {
    // SAFETY: plain register write on a pin configured by init_peripherals().
    unsafe {
        gpio_set_level(gpio, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_gpio: i32, _high: bool) {}
