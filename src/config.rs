//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// BLE

/// GAP device name, also used as the complete local name in the scan response.
pub const DEVICE_NAME: &str = "IoT Clock";

/// Advertising interval while discoverable (in 0.625 ms units). 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

/// Desired connection interval range (in 1.25 ms units).
/// 80 = 100 ms, 800 = 1 s.
pub const BLE_CONN_INTERVAL_MIN: u16 = 80;
pub const BLE_CONN_INTERVAL_MAX: u16 = 800;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 1000 = 10 s.
///
/// This is also the effective bound on how long a blocked attribute
/// response keeps being retried.
pub const BLE_SUP_TIMEOUT: u16 = 1000;

/// Delay after connecting before the peripheral asks the central for the
/// desired connection parameters (seconds).
pub const BLE_CONN_PAUSE_SECS: u64 = 6;

/// Static passkey shown to the user when the central pairs with MITM protection.
pub const BLE_PASSKEY: &[u8; 6] = b"000000";

/// Bonds kept in RAM; the oldest is evicted when full.
pub const MAX_BONDS: usize = 4;

/// ATT MTU requested from the SoftDevice.
pub const BLE_ATT_MTU: u16 = 23;

/// Largest attribute payload we hold for retransmission.
pub const ATT_PAYLOAD_MAX: usize = BLE_ATT_MTU as usize - 3;

// Event loop

/// Period of the recurring application event (ms).
pub const PERIODIC_EVT_PERIOD_MS: u64 = 5000;

/// Depth of the application event queue (profile callbacks, buttons).
pub const APP_QUEUE_DEPTH: usize = 8;

/// Depth of the stack message queue (GATT/HCI messages, connection event ends).
pub const STACK_QUEUE_DEPTH: usize = 4;

// Clock / access code

/// Length of a timestamp frame: `YYYY/MM/DD HH:MM HH:MM`.
pub const TIMESTAMP_LEN: usize = 22;

/// Number of button presses in one access code attempt.
pub const ACCESS_CODE_LEN: usize = 5;

/// Day of month the access code is derived from until the clock is first
/// set (14 = `01110`).
pub const DEFAULT_ACCESS_DAY: u8 = 14;

// Display
//
// SSD1306 128x64 with a 6x10 font gives 6 lines of 21 characters.

pub const DISPLAY_LINES: usize = 6;
pub const DISPLAY_COLUMNS: usize = 21;

/// `DD/MM/YY HH:MM`, or the echo of a timestamp being received.
pub const LINE_CLOCK: u8 = 0;
/// Access code entry echo.
pub const LINE_CODE: u8 = 1;
/// Connection status text.
pub const LINE_STATUS: u8 = 2;
/// Own or peer device address.
pub const LINE_ADDRESS: u8 = 3;
/// Last characteristic write.
pub const LINE_CHAR: u8 = 4;
/// ATT diagnostics (retries, MTU, flow control).
pub const LINE_ATT: u8 = 5;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Button A (code bit 1)  → P0.11
//   Button B (code bit 0)  → P0.12
//   Error LED              → P0.13 (active-low)
//   Unlock LED             → P0.14 (active-low)
//   Buzzer                 → P0.03 (active-high)
//   I²C SDA                → P0.26
//   I²C SCL                → P0.27

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;
