//! Clock and alarm manager.
//!
//! Once the central has programmed the clock, every periodic event reads
//! it back, refreshes the clock line and compares the time against the
//! alarm. The alarm fires once per programming.

use chrono::Datelike;
use heapless::String;

use crate::board::SystemClock;
use crate::calendar;
use crate::config::LINE_CLOCK;
use crate::display::Display;
use crate::timestamp::{AlarmTime, ParsedTimestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockState {
    /// Clock never programmed.
    Idle,
    /// Waiting for the alarm time.
    Armed,
    /// Alarm went off; only a new programming re-arms it.
    AlarmFired,
}

/// What a clock tick observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// New day of month, reported once per distinct day.
    pub day_changed: Option<u8>,
    /// The alarm fired on this tick.
    pub fired: bool,
}

pub struct AlarmClock {
    state: ClockState,
    alarm: AlarmTime,
    rendered: String<14>,
    last_day: Option<u8>,
    sounding: bool,
}

impl AlarmClock {
    pub const fn new() -> Self {
        Self {
            state: ClockState::Idle,
            alarm: AlarmTime { hour: 0, minute: 0 },
            rendered: String::new(),
            last_day: None,
            sounding: false,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn alarm(&self) -> Option<AlarmTime> {
        (self.state != ClockState::Idle).then_some(self.alarm)
    }

    /// The alarm output should currently be driven.
    pub fn is_sounding(&self) -> bool {
        self.sounding
    }

    /// Program the system clock and arm the alarm.
    pub fn set_clock<C: SystemClock>(&mut self, rtc: &mut C, ts: &ParsedTimestamp, alarm: AlarmTime) {
        let epoch = ts.epoch_seconds();
        rtc.set_epoch_seconds(epoch);
        self.alarm = alarm;
        self.state = ClockState::Armed;
        self.sounding = false;
        self.invalidate();
        info!(
            "clock: set to {=u32}, alarm {=u8}:{=u8}",
            epoch,
            alarm.hour,
            alarm.minute
        );
    }

    /// The clock line was overwritten elsewhere; redraw it on the next tick.
    pub fn invalidate(&mut self) {
        self.rendered.clear();
    }

    /// Read the clock, refresh the display and check the alarm.
    ///
    /// Does nothing until the clock has been programmed.
    pub fn tick<C: SystemClock, D: Display>(&mut self, rtc: &C, display: &mut D) -> Tick {
        let mut tick = Tick::default();
        if self.state == ClockState::Idle {
            return tick;
        }

        let now = calendar::from_epoch(rtc.epoch_seconds());
        let text = calendar::render(&now);
        if text != self.rendered {
            display.print(LINE_CLOCK, format_args!("{}", text.as_str()));
            self.rendered = text;
        }

        let day = now.day() as u8;
        if self.last_day != Some(day) {
            self.last_day = Some(day);
            tick.day_changed = Some(day);
        }

        if self.state == ClockState::Armed && self.alarm.matches(&now) {
            info!("clock: alarm {=u8}:{=u8}", self.alarm.hour, self.alarm.minute);
            self.state = ClockState::AlarmFired;
            self.sounding = true;
            tick.fired = true;
        }
        tick
    }

    /// Stop the alarm output. Returns whether it was sounding.
    pub fn silence(&mut self) -> bool {
        core::mem::replace(&mut self.sounding, false)
    }
}

impl Default for AlarmClock {
    fn default() -> Self {
        Self::new()
    }
}
