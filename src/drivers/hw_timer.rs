//! Hardware timer module using ESP-IDF's esp_timer API.
//!
//! Creates the periodic sampling timer that pushes [`Event::SampleTick`]
//! into the lock-free event queue. On simulation targets, the main loop
//! approximates timing with thread::sleep instead.
//!
//! The timer callback executes in the ESP timer task context (not ISR), so
//! it can safely call `push_event()`.

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut SAMPLE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: SAMPLE_TIMER is written once in `start_sample_timer()` before
/// any timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn sample_timer() -> esp_timer_handle_t {
    unsafe { SAMPLE_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sample_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::SampleTick);
}

/// Start the periodic sampling timer at `interval_ms`.
#[cfg(target_os = "espidf")]
pub fn start_sample_timer(interval_ms: u32) {
    // SAFETY: SAMPLE_TIMER is written here once at boot from the single
    // main-task context before any timer callbacks fire. The callback
    // itself only calls push_event(), which is lock-free.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(sample_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"sample\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&args, &raw mut SAMPLE_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: sample timer create failed (rc={}) — continuing without ticks",
                ret
            );
            return;
        }
        let ret = esp_timer_start_periodic(SAMPLE_TIMER, u64::from(interval_ms) * 1000);
        if ret != ESP_OK {
            log::error!("hw_timer: sample timer start failed (rc={})", ret);
            return;
        }
        info!("hw_timer: sampling every {} ms", interval_ms);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_sample_timer(_interval_ms: u32) {
    log::info!("hw_timer(sim): timer not started (ticks driven by sleep loop)");
}

/// Stop the sampling timer.
#[cfg(target_os = "espidf")]
pub fn stop_sample_timer() {
    // SAFETY: sample_timer() contract — main task only; null-check prevents
    // stopping a timer that never started.
    unsafe {
        let t = sample_timer();
        if !t.is_null() {
            esp_timer_stop(t);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_sample_timer() {}
