//! DHT22 (AM2302) combined temperature/humidity sensor driver.
//!
//! Single-wire protocol: the host pulls the data line low for ≥1 ms, then
//! releases it; the sensor answers with an 80 µs low / 80 µs high preamble
//! followed by 40 bits. Each bit starts with a ~50 µs low phase; the length
//! of the following high phase encodes the bit (≈28 µs = 0, ≈70 µs = 1).
//! Payload: 16-bit humidity ×10, 16-bit temperature ×10 (bit 15 = sign),
//! 8-bit checksum = sum of the four data bytes.
//!
//! Reads can genuinely fail in the field — a missed response window or a
//! corrupted frame — and are reported as typed [`SensorError`]s for the
//! sampling loop to skip over.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the data GPIO with busy-wait timing.
//! On host/test: reads from injectable statics.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicI16, AtomicU16, AtomicU8, Ordering};

use crate::app::ports::{Measurement, SensorPort};
use crate::error::SensorError;

// ── Host-side injection (simulation) ──────────────────────────

/// Stored as physical value ×10 — the sensor's native resolution.
#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_DECI: AtomicI16 = AtomicI16::new(215);
#[cfg(not(target_os = "espidf"))]
static SIM_HUMID_DECI: AtomicU16 = AtomicU16::new(480);
/// 0 = healthy, 1 = timeout, 2 = checksum mismatch.
#[cfg(not(target_os = "espidf"))]
static SIM_FAULT: AtomicU8 = AtomicU8::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_reading(temperature_c: f32, humidity_pct: f32) {
    SIM_TEMP_DECI.store((temperature_c * 10.0) as i16, Ordering::Relaxed);
    SIM_HUMID_DECI.store((humidity_pct * 10.0) as u16, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_inject_fault(fault: Option<SensorError>) {
    let raw = match fault {
        None => 0,
        Some(SensorError::Timeout) => 1,
        Some(_) => 2,
    };
    SIM_FAULT.store(raw, Ordering::Relaxed);
}

// ── Protocol timing (espidf) ──────────────────────────────────

/// Host start pulse, µs. Datasheet asks for ≥1 ms.
#[cfg(target_os = "espidf")]
const START_PULSE_US: u32 = 1100;
/// Longest level we wait for before declaring the sensor absent, µs.
#[cfg(target_os = "espidf")]
const LEVEL_TIMEOUT_US: u64 = 120;
/// High phase longer than this is a 1-bit, µs.
#[cfg(target_os = "espidf")]
const BIT_THRESHOLD_US: u64 = 50;

/// DHT22 driver bound to one data GPIO.
pub struct DhtSensor {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    data_gpio: i32,
    /// Sampling cycles still to discard while the sensor settles after
    /// power-up; readings in this window are unreliable per the datasheet.
    settle_remaining: u8,
}

impl DhtSensor {
    pub fn new(data_gpio: i32, settle_cycles: u8) -> Self {
        Self {
            data_gpio,
            settle_remaining: settle_cycles,
        }
    }

    #[cfg(target_os = "espidf")]
    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        use esp_idf_svc::sys::*;

        let gpio = self.data_gpio;

        // Busy-wait until the line reaches `level`, bounded by the protocol
        // timeout. Returns the wait duration in µs.
        unsafe fn wait_for_level(gpio: i32, level: bool, start: i64) -> Result<u64, SensorError> {
            loop {
                // SAFETY: gpio_get_level is a plain register read on a pin
                // configured by init_peripherals().
                let now = unsafe { esp_timer_get_time() };
                let current = unsafe { gpio_get_level(gpio) != 0 };
                if current == level {
                    return Ok((now - start) as u64);
                }
                if (now - start) as u64 > LEVEL_TIMEOUT_US {
                    return Err(SensorError::Timeout);
                }
            }
        }

        let mut frame = [0u8; 5];

        // SAFETY: exclusive ownership of the DHT data pin; direction flips
        // are part of the one-wire protocol and happen only on this path.
        unsafe {
            // Host start pulse: drive low, then release to the pull-up.
            gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_OUTPUT);
            gpio_set_level(gpio, 0);
            esp_rom_delay_us(START_PULSE_US);
            gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_INPUT);

            // Sensor preamble: 80 µs low, 80 µs high.
            let t = esp_timer_get_time();
            wait_for_level(gpio, false, t)?;
            let t = esp_timer_get_time();
            wait_for_level(gpio, true, t)?;
            let t = esp_timer_get_time();
            wait_for_level(gpio, false, t)?;

            // 40 data bits: 50 µs low start, then a high phase whose width
            // encodes the bit.
            for bit in 0..40 {
                let t = esp_timer_get_time();
                wait_for_level(gpio, true, t)?;
                let t = esp_timer_get_time();
                let high_us = wait_for_level(gpio, false, t)?;
                if high_us > BIT_THRESHOLD_US {
                    frame[bit / 8] |= 1 << (7 - bit % 8);
                }
            }
        }

        Ok(frame)
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&mut self) -> Result<Measurement, SensorError> {
        let frame = self.read_frame()?;

        let sum = frame[0]
            .wrapping_add(frame[1])
            .wrapping_add(frame[2])
            .wrapping_add(frame[3]);
        if sum != frame[4] {
            return Err(SensorError::ChecksumMismatch);
        }

        let humid_deci = u16::from_be_bytes([frame[0], frame[1]]);
        let temp_raw = u16::from_be_bytes([frame[2], frame[3]]);
        // Bit 15 is a sign flag, not two's complement.
        let temp_deci = if temp_raw & 0x8000 != 0 {
            -((temp_raw & 0x7FFF) as i16)
        } else {
            temp_raw as i16
        };

        Ok(Measurement {
            temperature_c: temp_deci as f32 / 10.0,
            humidity_pct: humid_deci as f32 / 10.0,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&mut self) -> Result<Measurement, SensorError> {
        match SIM_FAULT.load(Ordering::Relaxed) {
            0 => Ok(Measurement {
                temperature_c: SIM_TEMP_DECI.load(Ordering::Relaxed) as f32 / 10.0,
                humidity_pct: SIM_HUMID_DECI.load(Ordering::Relaxed) as f32 / 10.0,
            }),
            1 => Err(SensorError::Timeout),
            _ => Err(SensorError::ChecksumMismatch),
        }
    }
}

impl SensorPort for DhtSensor {
    fn measure(&mut self) -> Result<Measurement, SensorError> {
        if self.settle_remaining > 0 {
            self.settle_remaining -= 1;
            return Err(SensorError::WarmingUp);
        }
        self.read_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins;

    // The sim statics are process-global, so the whole injection behaviour
    // is exercised in one sequential test body.
    #[test]
    fn sim_injection_behaviour() {
        // Settle cycles are discarded first.
        sim_inject_fault(None);
        let mut dht = DhtSensor::new(pins::DHT_DATA_GPIO, 2);
        assert_eq!(dht.measure(), Err(SensorError::WarmingUp));
        assert_eq!(dht.measure(), Err(SensorError::WarmingUp));
        assert!(dht.measure().is_ok());

        // Injected readings come back at the sensor's 0.1 resolution.
        sim_set_reading(23.4, 55.1);
        let m = dht.measure().unwrap();
        assert!((m.temperature_c - 23.4).abs() < 0.05);
        assert!((m.humidity_pct - 55.1).abs() < 0.05);

        // Injected faults surface as typed errors and clear cleanly.
        sim_inject_fault(Some(SensorError::Timeout));
        assert_eq!(dht.measure(), Err(SensorError::Timeout));
        sim_inject_fault(Some(SensorError::ChecksumMismatch));
        assert_eq!(dht.measure(), Err(SensorError::ChecksumMismatch));
        sim_inject_fault(None);
        assert!(dht.measure().is_ok());
    }
}
