//! Dispatch core.
//!
//! [`CoreContext`] owns every piece of application state and the
//! collaborators it drives. The firmware wakes it whenever one of the
//! [`Inbox`] sources has work; each wake cycle runs to completion without
//! suspending.

use heapless::Vec;

use crate::access::{AccessCode, Button, Outcome};
use crate::alarm::{AlarmClock, ClockState};
use crate::att_rsp::AttRspRetry;
use crate::board::{Board, Output, SystemClock};
use crate::config::{
    DEFAULT_ACCESS_DAY, LINE_ADDRESS, LINE_ATT, LINE_CHAR, LINE_CLOCK, LINE_STATUS,
};
use crate::display::Display;
use crate::event::{AppEvent, Event, GattMsg, Inbox, StackMsg};
use crate::stack::{
    format_address, method, system_id, AttRsp, AttStatus, AttTransport, GapRole, GapRoleState,
    Profile, ProfileParam,
};
use crate::timestamp::TimestampInput;

/// The BLE stack as the core sees it.
pub trait Stack: Profile + AttTransport + GapRole {}

impl<T: Profile + AttTransport + GapRole> Stack for T {}

pub struct CoreContext<D, B, C, S> {
    pub display: D,
    pub board: B,
    pub clock: C,
    pub stack: S,
    access: AccessCode,
    alarm: AlarmClock,
    att: AttRspRetry,
    input: TimestampInput,
    role_state: GapRoleState,
    periodic_running: bool,
}

impl<D, B, C, S> CoreContext<D, B, C, S>
where
    D: Display,
    B: Board,
    C: SystemClock,
    S: Stack,
{
    pub fn new(display: D, board: B, clock: C, stack: S) -> Self {
        Self {
            display,
            board,
            clock,
            stack,
            access: AccessCode::new(DEFAULT_ACCESS_DAY),
            alarm: AlarmClock::new(),
            att: AttRspRetry::new(),
            input: TimestampInput::new(),
            role_state: GapRoleState::Init,
            periodic_running: false,
        }
    }

    pub fn access(&self) -> &AccessCode {
        &self.access
    }

    pub fn alarm(&self) -> &AlarmClock {
        &self.alarm
    }

    pub fn att(&self) -> &AttRspRetry {
        &self.att
    }

    pub fn input(&self) -> &TimestampInput {
        &self.input
    }

    pub fn role_state(&self) -> GapRoleState {
        self.role_state
    }

    pub fn periodic_running(&self) -> bool {
        self.periodic_running
    }

    /// Run one wake cycle: at most one stack message, then every queued
    /// application event in order, then the periodic work if its flag is up.
    ///
    /// Returns true when a stack message was handled, in which case more
    /// may be waiting and the caller should run another cycle.
    pub fn process_wake<I: Inbox>(&mut self, inbox: &mut I) -> bool {
        let had_stack_msg = match inbox.stack_msg() {
            Some(msg) => {
                self.dispatch(Event::Stack(msg));
                true
            }
            None => false,
        };

        while let Some(event) = inbox.app_event() {
            self.dispatch(Event::App(event));
        }

        if inbox.take_periodic() && self.periodic_running {
            self.board.start_periodic();
            self.dispatch(Event::PeriodicTick);
        }

        had_stack_msg
    }

    pub fn dispatch(&mut self, event: Event) {
        match event {
            Event::App(AppEvent::StateChange(state)) => self.on_state_change(state),
            Event::App(AppEvent::CharChange { param, value }) => {
                self.on_char_change(param, value)
            }
            Event::App(AppEvent::ButtonPress(button)) => self.on_button(button),
            Event::Stack(msg) => self.on_stack_msg(msg),
            Event::PeriodicTick => self.on_periodic(),
        }
    }

    fn start_periodic(&mut self) {
        if !self.periodic_running {
            self.board.start_periodic();
            self.periodic_running = true;
        }
    }

    fn stop_periodic(&mut self) {
        if self.periodic_running {
            self.board.stop_periodic();
            self.periodic_running = false;
        }
    }

    fn on_state_change(&mut self, state: GapRoleState) {
        info!("gap: {} -> {}", self.role_state, state);
        self.role_state = state;

        match state {
            GapRoleState::Started => {
                let addr = self.stack.own_address();
                self.stack.set_system_id(system_id(addr));
                self.display
                    .print(LINE_ADDRESS, format_args!("{}", format_address(addr).as_str()));
                self.display.print(LINE_STATUS, format_args!("Initialized"));
            }
            GapRoleState::Advertising => {
                self.display.print(LINE_STATUS, format_args!("Advertising"));
            }
            GapRoleState::Connected => {
                self.start_periodic();
                if let Some(peer) = self.stack.peer_address() {
                    self.display
                        .print(LINE_ADDRESS, format_args!("{}", format_address(peer).as_str()));
                }
                self.display.print(LINE_STATUS, format_args!("Connected"));
            }
            GapRoleState::ConnectedAdvertising => {
                self.display
                    .print(LINE_STATUS, format_args!("Connected Advertising"));
            }
            GapRoleState::Waiting => {
                // A programmed alarm must still go off without a central.
                if self.alarm.state() != ClockState::Armed {
                    self.stop_periodic();
                }
                self.att.release(&mut self.display, AttStatus::NotConnected);
                self.display.print(LINE_STATUS, format_args!("Disconnected"));
                self.display.clear_lines(LINE_ADDRESS, LINE_ATT);
            }
            GapRoleState::WaitingAfterTimeout => {
                self.att.release(&mut self.display, AttStatus::NotConnected);
                self.display.print(LINE_STATUS, format_args!("Timed Out"));
                self.display.clear_lines(LINE_ADDRESS, LINE_ATT);
            }
            GapRoleState::Error => {
                self.display.print(LINE_STATUS, format_args!("Error"));
            }
            GapRoleState::Init => {
                self.display.clear_line(LINE_STATUS);
            }
        }
    }

    fn on_char_change(&mut self, param: ProfileParam, value: u8) {
        match param {
            ProfileParam::Char1 => {
                self.display.print(LINE_CHAR, format_args!("Char 1: {}", value));
            }
            ProfileParam::Char3 => {
                self.display.print(LINE_CHAR, format_args!("Char 3: {}", value));
                self.receive_timestamp_byte(value);
            }
            ProfileParam::Char2 | ProfileParam::Char4 => {}
        }
    }

    fn receive_timestamp_byte(&mut self, value: u8) {
        if self.input.is_empty() {
            self.display.clear_line(LINE_CLOCK);
        }
        let echo = [value];
        let text = core::str::from_utf8(&echo).unwrap_or("?");
        self.display.write_at(LINE_CLOCK, self.input.len() as u8, text);
        self.alarm.invalidate();

        match self.input.push(value) {
            None => {}
            Some(Ok((ts, alarm))) => {
                self.alarm.set_clock(&mut self.clock, &ts, alarm);
                self.clock_tick();
            }
            Some(Err(e)) => {
                warn!("timestamp rejected: {}", e);
                self.display.print(LINE_CLOCK, format_args!("Bad timestamp"));
            }
        }
    }

    fn on_button(&mut self, button: Button) {
        match self.access.record_press(button, &mut self.display) {
            Outcome::Pending => {}
            Outcome::Denied => {
                self.board.set_output(Output::UnlockLed, false);
                self.board.set_output(Output::ErrorLed, true);
            }
            Outcome::Granted => {
                self.board.set_output(Output::ErrorLed, false);
                self.board.set_output(Output::UnlockLed, true);
                self.board.set_output(Output::Buzzer, false);
                if self.alarm.silence() {
                    info!("clock: alarm silenced");
                }
            }
        }
    }

    fn on_stack_msg(&mut self, msg: StackMsg) {
        match msg {
            StackMsg::ConnEventEnd(_) => {
                self.att.on_conn_event_end(&mut self.stack, &mut self.display);
            }
            StackMsg::Gatt(GattMsg::Rsp { status, rsp }) => {
                if status.is_retryable() {
                    self.att.hold(&mut self.stack, &mut self.display, rsp);
                }
            }
            StackMsg::Gatt(GattMsg::FlowCtrlViolated { opcode }) => {
                warn!("gatt: flow control violated, opcode {=u8:#x}", opcode);
                self.display
                    .print(LINE_ATT, format_args!("FC Violated: {}", opcode));
            }
            StackMsg::Gatt(GattMsg::MtuUpdated { mtu }) => {
                debug!("gatt: mtu {=u16}", mtu);
                self.display.print(LINE_ATT, format_args!("MTU Size: {}", mtu));
            }
            StackMsg::HciCommandComplete { opcode } => {
                debug!("hci: command complete {=u16:#x}", opcode);
            }
        }
    }

    fn on_periodic(&mut self) {
        if let (Some(conn), Some(value)) = (
            self.stack.conn_handle(),
            self.stack.get_parameter(ProfileParam::Char3),
        ) {
            self.stack.set_parameter(ProfileParam::Char4, value);
            let mut payload = Vec::new();
            let _ = payload.push(value);
            let rsp = AttRsp {
                conn,
                method: method::HANDLE_VALUE_NOTI,
                payload,
            };
            self.att.send(&mut self.stack, &mut self.display, rsp);
        }
        self.clock_tick();
    }

    fn clock_tick(&mut self) {
        let tick = self.alarm.tick(&self.clock, &mut self.display);
        if let Some(day) = tick.day_changed {
            self.access.set_day(day);
        }
        if tick.fired {
            self.board.set_output(Output::Buzzer, true);
        }
    }
}
