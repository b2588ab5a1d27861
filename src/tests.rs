//! End-to-end tests for the dispatch core.
//!
//! These run on the host with in-memory collaborators and drive
//! [`CoreContext`] the way the firmware does: post events, then run wake
//! cycles.

use std::collections::VecDeque;

use crate::access::Button;
use crate::alarm::ClockState;
use crate::board::{Board, Output, SystemClock};
use crate::config::*;
use crate::display::{Display, TextBuffer};
use crate::event::{AppEvent, GattMsg, Inbox, StackMsg};
use crate::stack::{
    method, AttRsp, AttStatus, AttTransport, ConnHandle, GapRole, GapRoleState, Profile,
    ProfileParam,
};
use crate::CoreContext;

// ═══════════════════════════════════════════════════════════════════════════
// In-memory collaborators
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct Screen {
    buf: TextBuffer<DISPLAY_LINES, DISPLAY_COLUMNS>,
    /// Line of every write, in order.
    writes: Vec<u8>,
}

impl Screen {
    fn text(&self, line: u8) -> &str {
        self.buf.text(line as usize)
    }
}

impl Display for Screen {
    fn write_at(&mut self, line: u8, column: u8, text: &str) {
        self.writes.push(line);
        self.buf.write_at(line, column, text);
    }

    fn clear_line(&mut self, line: u8) {
        self.buf.clear_line(line);
    }
}

#[derive(Default)]
struct Pins {
    error_led: bool,
    unlock_led: bool,
    buzzer: bool,
    starts: u32,
    stops: u32,
}

impl Board for Pins {
    fn set_output(&mut self, output: Output, on: bool) {
        match output {
            Output::ErrorLed => self.error_led = on,
            Output::UnlockLed => self.unlock_led = on,
            Output::Buzzer => self.buzzer = on,
        }
    }

    fn start_periodic(&mut self) {
        self.starts += 1;
    }

    fn stop_periodic(&mut self) {
        self.stops += 1;
    }
}

#[derive(Default)]
struct Rtc(u32);

impl SystemClock for Rtc {
    fn set_epoch_seconds(&mut self, secs: u32) {
        self.0 = secs;
    }

    fn epoch_seconds(&self) -> u32 {
        self.0
    }
}

const OWN_ADDR: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0xC6];
const PEER_ADDR: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x4F];

#[derive(Default)]
struct Link {
    chars: [Option<u8>; 4],
    system_id: Option<[u8; 8]>,
    conn: Option<ConnHandle>,
    script: VecDeque<AttStatus>,
    sent: Vec<AttRsp>,
    notice: Option<bool>,
}

fn slot(param: ProfileParam) -> usize {
    match param {
        ProfileParam::Char1 => 0,
        ProfileParam::Char2 => 1,
        ProfileParam::Char3 => 2,
        ProfileParam::Char4 => 3,
    }
}

impl Profile for Link {
    fn get_parameter(&self, param: ProfileParam) -> Option<u8> {
        self.chars[slot(param)]
    }

    fn set_parameter(&mut self, param: ProfileParam, value: u8) {
        self.chars[slot(param)] = Some(value);
    }

    fn set_system_id(&mut self, id: [u8; 8]) {
        self.system_id = Some(id);
    }
}

impl AttTransport for Link {
    fn send_rsp(&mut self, rsp: &AttRsp) -> AttStatus {
        let status = self.script.pop_front().unwrap_or(AttStatus::Success);
        if status == AttStatus::Success {
            self.sent.push(rsp.clone());
        }
        status
    }

    fn conn_event_notice(&mut self, _conn: ConnHandle, enable: bool) -> AttStatus {
        self.notice = Some(enable);
        AttStatus::Success
    }
}

impl GapRole for Link {
    fn own_address(&self) -> [u8; 6] {
        OWN_ADDR
    }

    fn peer_address(&self) -> Option<[u8; 6]> {
        self.conn.map(|_| PEER_ADDR)
    }

    fn conn_handle(&self) -> Option<ConnHandle> {
        self.conn
    }
}

#[derive(Default)]
struct Queues {
    stack: VecDeque<StackMsg>,
    app: VecDeque<AppEvent>,
    periodic: bool,
}

impl Inbox for Queues {
    fn stack_msg(&mut self) -> Option<StackMsg> {
        self.stack.pop_front()
    }

    fn app_event(&mut self) -> Option<AppEvent> {
        self.app.pop_front()
    }

    fn take_periodic(&mut self) -> bool {
        core::mem::take(&mut self.periodic)
    }
}

type Core = CoreContext<Screen, Pins, Rtc, Link>;

struct Rig {
    core: Core,
    inbox: Queues,
}

impl Rig {
    fn new() -> Self {
        Self {
            core: CoreContext::new(
                Screen::default(),
                Pins::default(),
                Rtc::default(),
                Link::default(),
            ),
            inbox: Queues::default(),
        }
    }

    /// Run wake cycles until every source is drained.
    fn run(&mut self) {
        while self.core.process_wake(&mut self.inbox) {}
    }

    fn post(&mut self, event: AppEvent) {
        self.inbox.app.push_back(event);
        self.run();
    }

    fn state(&mut self, state: GapRoleState) {
        self.post(AppEvent::StateChange(state));
    }

    fn connect(&mut self) {
        self.core.stack.conn = Some(0x0001);
        self.state(GapRoleState::Connected);
    }

    fn disconnect(&mut self) {
        self.core.stack.conn = None;
        self.state(GapRoleState::Waiting);
    }

    fn write_char3(&mut self, frame: &[u8]) {
        for &b in frame {
            self.core.stack.chars[2] = Some(b);
            self.post(AppEvent::CharChange {
                param: ProfileParam::Char3,
                value: b,
            });
        }
    }

    fn press(&mut self, buttons: &[Button]) {
        for &b in buttons {
            self.post(AppEvent::ButtonPress(b));
        }
    }

    /// Advance the clock and deliver one periodic expiry.
    fn periodic(&mut self, secs: u32) {
        self.core.clock.0 += secs;
        self.inbox.periodic = true;
        self.run();
    }
}

const FRAME: &[u8] = b"2018/03/04 13:16 13:18";

// ═══════════════════════════════════════════════════════════════════════════
// Wake cycle ordering
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn stack_then_app_then_periodic() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(FRAME);
    rig.core.display.writes.clear();

    rig.core.clock.0 += 60;
    rig.inbox.periodic = true;
    rig.inbox.app.push_back(AppEvent::StateChange(GapRoleState::ConnectedAdvertising));
    rig.inbox.stack.push_back(StackMsg::Gatt(GattMsg::MtuUpdated { mtu: 23 }));
    assert!(rig.core.process_wake(&mut rig.inbox));

    assert_eq!(rig.core.display.writes, [LINE_ATT, LINE_STATUS, LINE_CLOCK]);
    assert!(!rig.core.process_wake(&mut rig.inbox));
}

#[test]
fn one_stack_message_per_cycle() {
    let mut rig = Rig::new();
    rig.inbox.stack.push_back(StackMsg::Gatt(GattMsg::MtuUpdated { mtu: 23 }));
    rig.inbox.stack.push_back(StackMsg::Gatt(GattMsg::MtuUpdated { mtu: 185 }));
    rig.inbox.app.push_back(AppEvent::StateChange(GapRoleState::Advertising));
    rig.inbox.app.push_back(AppEvent::CharChange {
        param: ProfileParam::Char2,
        value: 2,
    });

    assert!(rig.core.process_wake(&mut rig.inbox));
    assert_eq!(rig.inbox.stack.len(), 1);
    assert!(rig.inbox.app.is_empty());
    assert_eq!(rig.core.display.text(LINE_ATT), "MTU Size: 23");

    assert!(rig.core.process_wake(&mut rig.inbox));
    assert_eq!(rig.core.display.text(LINE_ATT), "MTU Size: 185");
    assert!(!rig.core.process_wake(&mut rig.inbox));
}

#[test]
fn periodic_flag_ignored_while_timer_stopped() {
    let mut rig = Rig::new();
    rig.periodic(5);
    assert_eq!(rig.core.board.starts, 0);
    assert!(rig.core.stack.chars[3].is_none());
}

#[test]
fn periodic_restarts_timer() {
    let mut rig = Rig::new();
    rig.connect();
    assert_eq!(rig.core.board.starts, 1);
    rig.periodic(5);
    rig.periodic(5);
    assert_eq!(rig.core.board.starts, 3);
}

// ═══════════════════════════════════════════════════════════════════════════
// Connection state
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn started_publishes_system_id_and_address() {
    let mut rig = Rig::new();
    rig.state(GapRoleState::Started);
    assert_eq!(
        rig.core.stack.system_id,
        Some([0x01, 0x02, 0x03, 0x00, 0x00, 0x04, 0x05, 0xC6])
    );
    assert_eq!(rig.core.display.text(LINE_ADDRESS), "0xC60504030201");
    assert_eq!(rig.core.display.text(LINE_STATUS), "Initialized");
    assert_eq!(rig.core.role_state(), GapRoleState::Started);
}

#[test]
fn connection_lifecycle_texts() {
    let mut rig = Rig::new();
    rig.state(GapRoleState::Advertising);
    assert_eq!(rig.core.display.text(LINE_STATUS), "Advertising");

    rig.connect();
    assert!(rig.core.periodic_running());
    assert_eq!(rig.core.display.text(LINE_STATUS), "Connected");
    assert_eq!(rig.core.display.text(LINE_ADDRESS), "0x4FEEDDCCBBAA");

    rig.post(AppEvent::CharChange {
        param: ProfileParam::Char1,
        value: 42,
    });
    assert_eq!(rig.core.display.text(LINE_CHAR), "Char 1: 42");

    rig.disconnect();
    assert!(!rig.core.periodic_running());
    assert_eq!(rig.core.board.stops, 1);
    assert_eq!(rig.core.display.text(LINE_STATUS), "Disconnected");
    assert_eq!(rig.core.display.text(LINE_ADDRESS), "");
    assert_eq!(rig.core.display.text(LINE_CHAR), "");

    rig.state(GapRoleState::WaitingAfterTimeout);
    assert_eq!(rig.core.display.text(LINE_STATUS), "Timed Out");
    rig.state(GapRoleState::Error);
    assert_eq!(rig.core.display.text(LINE_STATUS), "Error");
    rig.state(GapRoleState::Init);
    assert_eq!(rig.core.display.text(LINE_STATUS), "");
}

#[test]
fn armed_alarm_keeps_timer_after_disconnect() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(FRAME);
    rig.disconnect();

    assert!(rig.core.periodic_running());
    assert_eq!(rig.core.board.stops, 0);

    rig.periodic(120);
    assert!(rig.core.board.buzzer);
}

// ═══════════════════════════════════════════════════════════════════════════
// Timestamp input and alarm
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn timestamp_frame_programs_clock() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(&FRAME[..10]);
    assert_eq!(rig.core.display.text(LINE_CLOCK), "2018/03/04");
    assert_eq!(rig.core.display.text(LINE_CHAR), "Char 3: 52");
    assert_eq!(rig.core.clock.0, 0);

    rig.write_char3(&FRAME[10..]);
    assert_eq!(rig.core.clock.0, 1_520_169_360);
    assert_eq!(rig.core.alarm().state(), ClockState::Armed);
    assert_eq!(rig.core.display.text(LINE_CLOCK), "04/03/18 13:16");
    assert!(rig.core.input().is_empty());

    // The access code now follows day 4.
    assert_eq!(
        rig.core.access().expected().presses(),
        [Button::B, Button::B, Button::A, Button::B, Button::B]
    );
}

#[test]
fn malformed_frame_leaves_clock_alone() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(b"2018/03/04 13:16-13:18");
    assert_eq!(rig.core.clock.0, 0);
    assert_eq!(rig.core.alarm().state(), ClockState::Idle);
    assert_eq!(rig.core.display.text(LINE_CLOCK), "Bad timestamp");

    // The next frame starts from an empty buffer.
    rig.write_char3(FRAME);
    assert_eq!(rig.core.alarm().state(), ClockState::Armed);
}

#[test]
fn out_of_range_frame_is_rejected() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(b"2018/02/30 13:16 13:18");
    assert_eq!(rig.core.alarm().state(), ClockState::Idle);
    assert_eq!(rig.core.display.text(LINE_CLOCK), "Bad timestamp");
}

#[test]
fn queued_writes_keep_their_own_bytes() {
    let mut rig = Rig::new();
    rig.connect();

    // Both writes land before the loop wakes; the profile only holds the last.
    rig.core.stack.chars[2] = Some(b'0');
    for value in [b'2', b'0'] {
        rig.inbox.app.push_back(AppEvent::CharChange {
            param: ProfileParam::Char3,
            value,
        });
    }
    assert!(!rig.core.process_wake(&mut rig.inbox));

    assert_eq!(rig.core.input().as_bytes(), b"20");
    assert_eq!(rig.core.display.text(LINE_CLOCK), "20");
}

#[test]
fn clock_line_recovers_after_rejected_frame() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(FRAME);
    assert_eq!(rig.core.display.text(LINE_CLOCK), "04/03/18 13:16");

    rig.write_char3(b"garbage garbage garbag");
    assert_eq!(rig.core.display.text(LINE_CLOCK), "Bad timestamp");

    // Same minute: the clock text itself has not changed.
    rig.periodic(5);
    rig.periodic(5);
    assert_eq!(rig.core.display.text(LINE_CLOCK), "04/03/18 13:16");
    assert_eq!(rig.core.alarm().state(), ClockState::Armed);
}

#[test]
fn clock_line_recovers_after_partial_echo() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(FRAME);
    rig.write_char3(b"2019");
    assert_eq!(rig.core.display.text(LINE_CLOCK), "2019");

    rig.periodic(5);
    assert_eq!(rig.core.display.text(LINE_CLOCK), "04/03/18 13:16");
    assert_eq!(rig.core.input().len(), 4);
}

#[test]
fn alarm_fires_and_grant_silences_it() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(FRAME);

    rig.periodic(60);
    assert!(!rig.core.board.buzzer);
    rig.periodic(60);
    assert!(rig.core.board.buzzer);
    assert_eq!(rig.core.alarm().state(), ClockState::AlarmFired);

    // Wrong code leaves it ringing.
    rig.press(&[Button::A; 5]);
    assert!(rig.core.board.buzzer);
    assert!(rig.core.board.error_led);

    let code = rig.core.access().expected().presses();
    rig.press(&code);
    assert!(!rig.core.board.buzzer);
    assert!(!rig.core.board.error_led);
    assert!(rig.core.board.unlock_led);
    assert!(!rig.core.alarm().is_sounding());

    // Still 13:18, no second firing.
    rig.periodic(5);
    assert!(!rig.core.board.buzzer);
}

// ═══════════════════════════════════════════════════════════════════════════
// Access code
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn default_code_unlocks_before_clock_is_set() {
    let mut rig = Rig::new();
    rig.press(&[Button::B, Button::A, Button::A]);
    assert_eq!(rig.core.display.text(LINE_CODE), "011");
    assert_eq!(rig.core.access().index(), 3);

    rig.press(&[Button::A, Button::B]);
    assert!(rig.core.board.unlock_led);
    assert_eq!(rig.core.access().index(), 0);
}

#[test]
fn denied_code_lights_error_led() {
    let mut rig = Rig::new();
    rig.press(&[Button::B, Button::A, Button::A, Button::A, Button::B]);
    assert!(rig.core.board.unlock_led);

    rig.press(&[Button::A, Button::A, Button::A, Button::A, Button::B]);
    assert!(rig.core.board.error_led);
    assert!(!rig.core.board.unlock_led);
}

// ═══════════════════════════════════════════════════════════════════════════
// Periodic notify and response retry
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn periodic_copies_char3_to_char4() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(b"7");
    rig.periodic(5);

    assert_eq!(rig.core.stack.chars[3], Some(b'7'));
    assert_eq!(rig.core.stack.sent.len(), 1);
    let sent = &rig.core.stack.sent[0];
    assert_eq!(sent.method, method::HANDLE_VALUE_NOTI);
    assert_eq!(sent.payload.as_slice(), b"7");
}

#[test]
fn busy_notify_is_retried_on_connection_events() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(b"7");
    rig.core.stack.script.extend([AttStatus::Pending, AttStatus::Pending]);

    rig.periodic(5);
    assert!(rig.core.att().is_pending());
    assert_eq!(rig.core.stack.notice, Some(true));

    rig.inbox.stack.push_back(StackMsg::ConnEventEnd(1));
    rig.run();
    assert!(rig.core.att().is_pending());
    assert_eq!(rig.core.display.text(LINE_ATT), "Rsp send retry: 1");

    rig.inbox.stack.push_back(StackMsg::ConnEventEnd(1));
    rig.run();
    assert!(!rig.core.att().is_pending());
    assert_eq!(rig.core.stack.notice, Some(false));
    assert_eq!(rig.core.stack.sent.len(), 1);
    assert_eq!(rig.core.display.text(LINE_ATT), "Rsp sent retry: 2");
}

#[test]
fn disconnect_discards_pending_response() {
    let mut rig = Rig::new();
    rig.connect();
    rig.write_char3(b"7");
    rig.core.stack.script.extend([AttStatus::BufferNotAvailable; 8]);
    rig.periodic(5);
    for _ in 0..3 {
        rig.inbox.stack.push_back(StackMsg::ConnEventEnd(1));
        rig.run();
        assert!(rig.core.att().is_pending());
    }

    rig.disconnect();
    assert!(!rig.core.att().is_pending());
    assert_eq!(rig.core.att().retries(), 0);
    assert!(rig.core.stack.sent.is_empty());
}

#[test]
fn stack_reported_pending_rsp_is_held() {
    let mut rig = Rig::new();
    rig.connect();
    let rsp = AttRsp {
        conn: 1,
        method: method::WRITE_RSP,
        payload: heapless::Vec::new(),
    };
    rig.inbox.stack.push_back(StackMsg::Gatt(GattMsg::Rsp {
        status: AttStatus::Pending,
        rsp: rsp.clone(),
    }));
    rig.run();
    assert_eq!(rig.core.att().pending(), Some(&rsp));

    rig.inbox.stack.push_back(StackMsg::ConnEventEnd(1));
    rig.run();
    assert_eq!(rig.core.stack.sent, [rsp]);
}

#[test]
fn flow_control_violation_is_shown() {
    let mut rig = Rig::new();
    rig.inbox
        .stack
        .push_back(StackMsg::Gatt(GattMsg::FlowCtrlViolated { opcode: 0x12 }));
    rig.inbox
        .stack
        .push_back(StackMsg::HciCommandComplete { opcode: 0xFC09 });
    rig.run();
    assert_eq!(rig.core.display.text(LINE_ATT), "FC Violated: 18");
}
