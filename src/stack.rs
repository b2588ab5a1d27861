//! Types and traits at the boundary with the BLE stack.
//!
//! The firmware implements these over the SoftDevice; host tests
//! implement them in memory.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::ATT_PAYLOAD_MAX;

pub type ConnHandle = u16;

/// GAP peripheral role state, as reported by the role callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GapRoleState {
    Init,
    Started,
    Advertising,
    Waiting,
    WaitingAfterTimeout,
    Connected,
    ConnectedAdvertising,
    Error,
}

/// Characteristics of the simple profile service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProfileParam {
    /// Read/write byte.
    Char1,
    /// Read-only byte.
    Char2,
    /// Write-only byte; timestamp frames arrive here one character at a time.
    Char3,
    /// Notify byte; mirrors characteristic 3 on every periodic event.
    Char4,
}

/// Outcome of handing something to the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttStatus {
    Success,
    /// No link-layer buffer was available; try again later.
    Pending,
    /// The stack could not allocate a message buffer; try again later.
    BufferNotAvailable,
    NotConnected,
    Failure(u32),
}

impl AttStatus {
    /// Statuses for which a held response is kept and resent.
    pub fn is_retryable(self) -> bool {
        matches!(self, AttStatus::Pending | AttStatus::BufferNotAvailable)
    }
}

/// ATT method opcodes we originate.
pub mod method {
    pub const READ_RSP: u8 = 0x0B;
    pub const WRITE_RSP: u8 = 0x13;
    pub const HANDLE_VALUE_NOTI: u8 = 0x1B;
}

/// An outgoing attribute-protocol PDU owned by the application.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttRsp {
    pub conn: ConnHandle,
    pub method: u8,
    pub payload: Vec<u8, ATT_PAYLOAD_MAX>,
}

/// Profile characteristic storage.
pub trait Profile {
    fn get_parameter(&self, param: ProfileParam) -> Option<u8>;

    /// Store a value in the attribute table. Notifications are sent
    /// separately through [`AttTransport`].
    fn set_parameter(&mut self, param: ProfileParam, value: u8);

    /// Publish the Device Information system ID.
    fn set_system_id(&mut self, id: [u8; 8]);
}

/// Attribute response transmission.
pub trait AttTransport {
    fn send_rsp(&mut self, rsp: &AttRsp) -> AttStatus;

    /// Enable or disable connection-event-end notifications for `conn`.
    fn conn_event_notice(&mut self, conn: ConnHandle, enable: bool) -> AttStatus;
}

/// GAP addresses, little-endian as the radio sends them.
pub trait GapRole {
    fn own_address(&self) -> [u8; 6];
    fn peer_address(&self) -> Option<[u8; 6]>;

    /// Handle of the current connection, if any.
    fn conn_handle(&self) -> Option<ConnHandle>;
}

/// Derive the 8-byte Device Information system ID from a device address:
/// the company part keeps the low three bytes, two zero bytes follow, and
/// the top three address bytes end the ID.
pub fn system_id(addr: [u8; 6]) -> [u8; 8] {
    [addr[0], addr[1], addr[2], 0, 0, addr[3], addr[4], addr[5]]
}

/// Format an address most significant byte first, e.g. `0xC0FFEE000001`.
pub fn format_address(addr: [u8; 6]) -> String<14> {
    let mut s = String::new();
    let _ = s.push_str("0x");
    for b in addr.iter().rev() {
        let _ = write!(s, "{:02X}", b);
    }
    s
}
