//! BLE radio adapter.
//!
//! Implements [`RadioPort`] — the hexagonal boundary between the GATT
//! protocol core and the platform radio stack.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                   | Perms                |
//! |----------------|----------------------------------------|----------------------|
//! | Temperature    | `0x2A6E`                               | Read+Notify+Indicate |
//! | Humidity       | `0x2A6F`                               | Read+Notify+Indicate |
//! | Relay control  | `E04E0525-ECBC-4E2C-AAB6-A3EC009506C6` | Read+WriteNR+Notify  |
//!
//! Inbound Bluedroid callbacks never touch the protocol core directly:
//! they translate stack attribute handles to core [`Handle`]s and push
//! typed events into the lock-free queue, which the main loop drains.
//! In particular, the adapter does **not** restart advertising on
//! disconnect — that decision belongs to the core's state machine.

use log::info;

use crate::adapters::device_id::DeviceName;
use crate::app::ports::RadioPort;
use crate::error::Result;
use crate::gatt::{ConnectionId, Handle};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

/// org.bluetooth.service.environmental_sensing
pub const ENV_SENSE_SERVICE_UUID: u16 = 0x181A;
/// org.bluetooth.characteristic.temperature
pub const CHAR_TEMPERATURE_UUID: u16 = 0x2A6E;
/// org.bluetooth.characteristic.humidity
pub const CHAR_HUMIDITY_UUID: u16 = 0x2A6F;
/// Custom relay I/O control characteristic
pub const CHAR_RELAY_UUID: u128 = 0xE04E0525_ECBC_4E2C_AAB6_A3EC009506C6;

/// org.bluetooth.characteristic.gap.appearance — generic thermometer
pub const ADV_APPEARANCE_GENERIC_THERMOMETER: u16 = 768;

// ───────────────────────────────────────────────────────────────
// Adapter state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Ready,
    Failed,
}

// ── ESP-IDF BLE static state (callback-task-safe atomics) ─────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These atomics bridge the callback context to the adapter and
// carry the stack-handle → core-handle mapping.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
const HANDLE_UNSET: u32 = u32::MAX;

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SETUP_STEP: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static TEMP_ATTR_HANDLE: AtomicU32 = AtomicU32::new(HANDLE_UNSET);
#[cfg(target_os = "espidf")]
static HUMID_ATTR_HANDLE: AtomicU32 = AtomicU32::new(HANDLE_UNSET);
#[cfg(target_os = "espidf")]
static RELAY_ATTR_HANDLE: AtomicU32 = AtomicU32::new(HANDLE_UNSET);
#[cfg(target_os = "espidf")]
static CORE_TEMP_HANDLE: AtomicU32 = AtomicU32::new(HANDLE_UNSET);
#[cfg(target_os = "espidf")]
static CORE_HUMID_HANDLE: AtomicU32 = AtomicU32::new(HANDLE_UNSET);
#[cfg(target_os = "espidf")]
static CORE_RELAY_HANDLE: AtomicU32 = AtomicU32::new(HANDLE_UNSET);
/// Advertising interval in 0.625 ms units, staged by `advertise()` for the
/// GAP callback that actually starts advertising.
#[cfg(target_os = "espidf")]
static ADV_INTERVAL_UNITS: AtomicU32 = AtomicU32::new(0x190); // 250 ms

// ── UUID / advertising helpers (espidf) ───────────────────────

/// The ESS service UUID expanded to 128 bits (Bluetooth base UUID),
/// little-endian as Bluedroid expects for advertising data.
#[cfg(target_os = "espidf")]
static ADV_SERVICE_UUID128: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x1A, 0x18, 0x00,
    0x00,
];

#[cfg(target_os = "espidf")]
fn uuid16_to_esp(uuid: u16) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    t.uuid.uuid128 = uuid.to_le_bytes();
    t
}

/// Client Characteristic Configuration descriptor UUID.
#[cfg(target_os = "espidf")]
const CCCD_UUID: u16 = 0x2902;

#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, mut uuid: esp_idf_svc::sys::esp_bt_uuid_t, perm: u32, prop: u32) {
    use esp_idf_svc::sys::*;
    // Stack-maintained attribute value with automatic read responses; the
    // core mirrors every store update through `set_value`.
    let mut initial = [0u8; 2];
    let mut attr_value = esp_attr_value_t {
        attr_max_len: crate::gatt::store::MAX_VALUE_LEN as u16,
        attr_len: initial.len() as u16,
        attr_value: initial.as_mut_ptr(),
    };
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_AUTO_RSP as u8,
    };
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            &mut attr_value,
            &mut control,
        );
    }
}

#[cfg(target_os = "espidf")]
unsafe fn add_cccd(svc_handle: u16) {
    use esp_idf_svc::sys::*;
    let mut uuid = uuid16_to_esp(CCCD_UUID);
    unsafe {
        esp_ble_gatts_add_char_descr(
            svc_handle,
            &mut uuid,
            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        );
    }
}

/// Translate a stack attribute handle to the core characteristic handle.
#[cfg(target_os = "espidf")]
fn core_handle_for_attr(attr: u32) -> Option<Handle> {
    let pairs = [
        (&TEMP_ATTR_HANDLE, &CORE_TEMP_HANDLE),
        (&HUMID_ATTR_HANDLE, &CORE_HUMID_HANDLE),
        (&RELAY_ATTR_HANDLE, &CORE_RELAY_HANDLE),
    ];
    for (attr_cell, core_cell) in pairs {
        if attr_cell.load(AtomicOrdering::Relaxed) == attr {
            let raw = core_cell.load(AtomicOrdering::Relaxed);
            if raw != HANDLE_UNSET {
                return Some(Handle::from_raw(raw as u16));
            }
        }
    }
    None
}

// ── GAP / GATTS callbacks (espidf) ────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
            // Payload configured — start (or restart) advertising at the
            // interval staged by `advertise()`.
            let units = ADV_INTERVAL_UNITS.load(AtomicOrdering::Relaxed) as u16;
            let mut adv_params = esp_ble_adv_params_t {
                adv_int_min: units,
                adv_int_max: units,
                adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                ..unsafe { core::mem::zeroed() }
            };
            unsafe {
                esp_ble_gap_start_advertising(&mut adv_params);
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    use crate::events::{push_event, Event, WriteData};

    BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid16_to_esp(ENV_SENSE_SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            // 1 service + 3 × (declaration + value + CCCD) = 10 handles,
            // rounded up for headroom.
            unsafe {
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 12);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let p = unsafe { &(*param).create };
            let svc_handle = p.service_handle;
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
            }
            BLE_SETUP_STEP.store(1, AtomicOrdering::Relaxed);
            unsafe {
                add_gatt_char(
                    svc_handle,
                    uuid16_to_esp(CHAR_TEMPERATURE_UUID),
                    ESP_GATT_PERM_READ,
                    ESP_GATT_CHAR_PROP_BIT_READ
                        | ESP_GATT_CHAR_PROP_BIT_NOTIFY
                        | ESP_GATT_CHAR_PROP_BIT_INDICATE,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let p = unsafe { &(*param).add_char };
            let handle = p.attr_handle as u32;
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_SETUP_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    TEMP_ATTR_HANDLE.store(handle, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: temperature char (handle={})", handle);
                    unsafe { add_cccd(svc_handle) };
                }
                3 => {
                    HUMID_ATTR_HANDLE.store(handle, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: humidity char (handle={})", handle);
                    unsafe { add_cccd(svc_handle) };
                }
                5 => {
                    RELAY_ATTR_HANDLE.store(handle, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: relay char (handle={})", handle);
                    unsafe { add_cccd(svc_handle) };
                }
                step => log::warn!("BLE GATTS: unexpected ADD_CHAR at step {}", step),
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            let step = BLE_SETUP_STEP.load(AtomicOrdering::Relaxed);
            BLE_SETUP_STEP.store(step + 2, AtomicOrdering::Relaxed);
            match step {
                1 => unsafe {
                    add_gatt_char(
                        svc_handle,
                        uuid16_to_esp(CHAR_HUMIDITY_UUID),
                        ESP_GATT_PERM_READ,
                        ESP_GATT_CHAR_PROP_BIT_READ
                            | ESP_GATT_CHAR_PROP_BIT_NOTIFY
                            | ESP_GATT_CHAR_PROP_BIT_INDICATE,
                    );
                },
                3 => unsafe {
                    add_gatt_char(
                        svc_handle,
                        uuid128_to_esp(CHAR_RELAY_UUID),
                        ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE,
                        ESP_GATT_CHAR_PROP_BIT_READ
                            | ESP_GATT_CHAR_PROP_BIT_WRITE_NR
                            | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                    );
                },
                5 => log::info!("BLE GATTS: service table complete"),
                step => log::warn!("BLE GATTS: unexpected ADD_DESCR at step {}", step),
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            log::info!("BLE GATTS: central connected (conn_id={})", p.conn_id);
            push_event(Event::CentralConnect {
                conn: ConnectionId::new(p.conn_id),
            });
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            let p = unsafe { &(*param).disconnect };
            log::info!("BLE GATTS: central disconnected (conn_id={})", p.conn_id);
            // Advertising is NOT restarted here — the protocol core decides
            // when to resume discoverability.
            push_event(Event::CentralDisconnect {
                conn: ConnectionId::new(p.conn_id),
            });
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
            match core_handle_for_attr(p.handle as u32) {
                Some(handle) => {
                    push_event(Event::GattsWrite {
                        conn: ConnectionId::new(p.conn_id),
                        handle,
                        data: WriteData::from_slice(data),
                    });
                }
                // CCCD subscription writes land here; they configure the
                // stack, not the application.
                None => log::debug!("BLE GATTS: descriptor write (attr={})", p.handle),
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONF_EVT => {
            let p = unsafe { &(*param).conf };
            if let Some(handle) = core_handle_for_attr(p.handle as u32) {
                push_event(Event::IndicateDone {
                    conn: ConnectionId::new(p.conn_id),
                    handle,
                    status: p.status as u8,
                });
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BleRadio
// ───────────────────────────────────────────────────────────────

/// Concrete [`RadioPort`] over the platform BLE stack.
pub struct BleRadio {
    device_name: DeviceName,
    temp_handle: Handle,
    humid_handle: Handle,
    relay_handle: Handle,
    state: BleState,
}

impl BleRadio {
    /// Bind the adapter to the core's characteristic handles so inbound
    /// stack events can be translated back.
    pub fn new(
        device_name: DeviceName,
        temp_handle: Handle,
        humid_handle: Handle,
        relay_handle: Handle,
    ) -> Self {
        Self {
            device_name,
            temp_handle,
            humid_handle,
            relay_handle,
            state: BleState::Idle,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Bring the radio stack up and register the GATT service table.
    /// Call once before [`GattPeripheral::start`](crate::gatt::GattPeripheral::start).
    pub fn init(&mut self) -> Result<()> {
        self.platform_init()?;
        self.state = BleState::Ready;
        info!("BLE: stack ready, device name '{}'", self.device_name);
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) -> Result<()> {
        use esp_idf_svc::sys::*;

        use crate::error::Error;

        CORE_TEMP_HANDLE.store(u32::from(self.temp_handle.raw()), AtomicOrdering::Relaxed);
        CORE_HUMID_HANDLE.store(u32::from(self.humid_handle.raw()), AtomicOrdering::Relaxed);
        CORE_RELAY_HANDLE.store(u32::from(self.relay_handle.raw()), AtomicOrdering::Relaxed);

        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            if esp_bt_controller_init(&mut bt_cfg) != ESP_OK {
                self.state = BleState::Failed;
                return Err(Error::Init("bt_controller_init failed"));
            }
            if esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) != ESP_OK {
                self.state = BleState::Failed;
                return Err(Error::Init("bt_controller_enable failed"));
            }
            if esp_bluedroid_init() != ESP_OK {
                self.state = BleState::Failed;
                return Err(Error::Init("bluedroid_init failed"));
            }
            if esp_bluedroid_enable() != ESP_OK {
                self.state = BleState::Failed;
                return Err(Error::Init("bluedroid_enable failed"));
            }

            // Register GAP and GATTS callbacks. Event dispatching uses
            // static callback functions that post typed events to the main
            // event queue for processing.
            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));

            // Device name for the advertising payload (NUL-terminated).
            let mut name_z = [0u8; 25];
            let len = self.device_name.len().min(24);
            name_z[..len].copy_from_slice(&self.device_name.as_bytes()[..len]);
            esp_ble_gap_set_device_name(name_z.as_ptr() as *const _);

            esp_ble_gatts_app_register(0);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) -> Result<()> {
        info!(
            "BLE(sim): service 0x{:04X} with chars 0x{:04X}/0x{:04X}/{:032X}",
            ENV_SENSE_SERVICE_UUID, CHAR_TEMPERATURE_UUID, CHAR_HUMIDITY_UUID, CHAR_RELAY_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn attr_for(&self, handle: Handle) -> Option<u16> {
        let cell = if handle == self.temp_handle {
            &TEMP_ATTR_HANDLE
        } else if handle == self.humid_handle {
            &HUMID_ATTR_HANDLE
        } else if handle == self.relay_handle {
            &RELAY_ATTR_HANDLE
        } else {
            return None;
        };
        let raw = cell.load(AtomicOrdering::Relaxed);
        (raw != HANDLE_UNSET).then_some(raw as u16)
    }
}

// ───────────────────────────────────────────────────────────────
// RadioPort implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl RadioPort for BleRadio {
    fn advertise(&mut self, interval_ms: u32) {
        use esp_idf_svc::sys::*;

        // 0.625 ms units.
        ADV_INTERVAL_UNITS.store(interval_ms * 8 / 5, AtomicOrdering::Relaxed);

        // Advertising actually starts in the GAP callback once the payload
        // (name + ESS service UUID + appearance) is configured.
        let mut adv_data = esp_ble_adv_data_t {
            set_scan_rsp: false,
            include_name: true,
            include_txpower: false,
            min_interval: 0,
            max_interval: 0,
            appearance: i32::from(ADV_APPEARANCE_GENERIC_THERMOMETER),
            manufacturer_len: 0,
            p_manufacturer_data: core::ptr::null_mut(),
            service_data_len: 0,
            p_service_data: core::ptr::null_mut(),
            service_uuid_len: ADV_SERVICE_UUID128.len() as u16,
            p_service_uuid: ADV_SERVICE_UUID128.as_ptr() as *mut u8,
            flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
        };
        unsafe {
            esp_ble_gap_config_adv_data(&mut adv_data);
        }
    }

    fn set_value(&mut self, handle: Handle, value: &[u8]) {
        use esp_idf_svc::sys::*;
        if let Some(attr) = self.attr_for(handle) {
            unsafe {
                esp_ble_gatts_set_attr_value(attr, value.len() as u16, value.as_ptr());
            }
        }
    }

    fn notify(&mut self, conn: ConnectionId, handle: Handle, value: &[u8]) {
        use esp_idf_svc::sys::*;
        let Some(attr) = self.attr_for(handle) else {
            return;
        };
        let gatts_if = BLE_GATTS_IF.load(AtomicOrdering::Relaxed);
        if gatts_if == 0 {
            return;
        }
        unsafe {
            // need_confirm=false → notification, not indication.
            esp_ble_gatts_send_indicate(
                gatts_if as u8,
                conn.raw(),
                attr,
                value.len() as u16,
                value.as_ptr() as *mut u8,
                false,
            );
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl RadioPort for BleRadio {
    fn advertise(&mut self, interval_ms: u32) {
        info!(
            "BLE(sim): advertising '{}' every {} ms (appearance {})",
            self.device_name, interval_ms, ADV_APPEARANCE_GENERIC_THERMOMETER
        );
    }

    fn set_value(&mut self, handle: Handle, value: &[u8]) {
        log::debug!("BLE(sim): attr {} = {:02X?}", handle.raw(), value);
    }

    fn notify(&mut self, conn: ConnectionId, handle: Handle, value: &[u8]) {
        log::debug!(
            "BLE(sim): notify peer {} handle {} = {:02X?}",
            conn.raw(),
            handle.raw(),
            value
        );
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use crate::gatt::GattPeripheral;

    fn make_radio() -> BleRadio {
        let p = GattPeripheral::new(&SystemConfig::default()).unwrap();
        let mut name = DeviceName::new();
        name.push_str("envnode-test").ok();
        BleRadio::new(
            name,
            p.temperature_handle(),
            p.humidity_handle(),
            p.relay_handle(),
        )
    }

    #[test]
    fn init_lifecycle() {
        let mut radio = make_radio();
        assert_eq!(radio.state(), BleState::Idle);
        radio.init().unwrap();
        assert_eq!(radio.state(), BleState::Ready);
    }

    #[test]
    fn sim_port_calls_are_harmless() {
        let mut radio = make_radio();
        radio.init().unwrap();
        radio.advertise(250);
        let p = GattPeripheral::new(&SystemConfig::default()).unwrap();
        radio.set_value(p.temperature_handle(), &[0x2B, 0x09]);
        radio.notify(ConnectionId::new(1), p.relay_handle(), &[0x3]);
    }
}
