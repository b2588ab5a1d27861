//! Events delivered to the dispatch loop.
//!
//! Three sources wake the loop: messages from the BLE stack, application
//! events posted by callbacks and button handlers, and the periodic timer.
//! The first two are queues; the timer only raises a flag bit.
//!
//! On the SoftDevice build only `ConnEventEnd` and `MtuUpdated` are relayed
//! from stack events. `GattMsg::Rsp`, `GattMsg::FlowCtrlViolated` and
//! `StackMsg::HciCommandComplete` have no SoftDevice counterpart: read and
//! write responses are produced inside the SoftDevice, which also enforces
//! ATT flow control itself. They remain part of the message set so the
//! dispatch core can sit on a host stack that does report them.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::access::Button;
use crate::stack::{AttRsp, AttStatus, ConnHandle, GapRoleState, ProfileParam};

/// Events posted by profile callbacks and interrupt handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppEvent {
    StateChange(GapRoleState),
    /// The central wrote `value` to `param`.
    CharChange { param: ProfileParam, value: u8 },
    ButtonPress(Button),
}

/// GATT client/server messages relayed by the stack.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattMsg {
    /// A response the stack could not transmit; `status` says why.
    Rsp { status: AttStatus, rsp: AttRsp },
    /// The central sent a request before the previous one was answered.
    FlowCtrlViolated { opcode: u8 },
    MtuUpdated { mtu: u16 },
}

/// Messages from the BLE stack.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackMsg {
    /// A connection event ended on `ConnHandle`.
    ConnEventEnd(ConnHandle),
    Gatt(GattMsg),
    HciCommandComplete { opcode: u16 },
}

/// Everything the loop dispatches, in one closed set.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    App(AppEvent),
    Stack(StackMsg),
    PeriodicTick,
}

impl From<AppEvent> for Event {
    fn from(e: AppEvent) -> Self {
        Event::App(e)
    }
}

impl From<StackMsg> for Event {
    fn from(m: StackMsg) -> Self {
        Event::Stack(m)
    }
}

/// Flag bits raised from interrupt or timer context.
pub struct EventFlags(AtomicU16);

impl EventFlags {
    pub const PERIODIC: u16 = 1 << 0;

    pub const fn new() -> Self {
        Self(AtomicU16::new(0))
    }

    pub fn set(&self, bits: u16) {
        self.0.fetch_or(bits, Ordering::AcqRel);
    }

    /// Clear `bits`, returning whether any of them were set.
    pub fn take(&self, bits: u16) -> bool {
        self.0.fetch_and(!bits, Ordering::AcqRel) & bits != 0
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// The wake sources, as seen by one wake cycle.
pub trait Inbox {
    fn stack_msg(&mut self) -> Option<StackMsg>;
    fn app_event(&mut self) -> Option<AppEvent>;
    /// Consume the periodic flag.
    fn take_periodic(&mut self) -> bool;
}
