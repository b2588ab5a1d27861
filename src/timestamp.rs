//! Timestamp frames written by the central.
//!
//! The phone writes one character per GATT write to characteristic 3.
//! Once 22 bytes have arrived they form a frame with the fixed layout
//!
//! ```text
//! YYYY/MM/DD HH:MM HH:MM
//! 0123456789012345678901
//! ```
//!
//! where the first `HH:MM` is the time to program into the system clock
//! and the second is the alarm time.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use heapless::Vec;

use crate::calendar::{self, MAX_YEAR, MIN_YEAR};
use crate::config::TIMESTAMP_LEN;
use crate::error::{Error, Field, Malformed};

/// Wall-clock time to program into the system clock.
///
/// Only constructible from valid calendar fields inside the clock range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedTimestamp {
    when: NaiveDateTime,
    epoch: u32,
}

impl ParsedTimestamp {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8) -> Result<Self, Error> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::OutOfRange(Field::Year));
        }
        if !(1..=12).contains(&month) {
            return Err(Error::OutOfRange(Field::Month));
        }
        let date = NaiveDate::from_ymd_opt(year.into(), month.into(), day.into())
            .ok_or(Error::OutOfRange(Field::Day))?;
        let when = date.and_time(time_of_day(hour, minute, Field::Hour, Field::Minute)?);
        let epoch = calendar::to_epoch(&when).ok_or(Error::OutOfRange(Field::Year))?;
        Ok(Self { when, epoch })
    }

    pub fn year(&self) -> u16 {
        self.when.year() as u16
    }

    pub fn month(&self) -> u8 {
        self.when.month() as u8
    }

    pub fn day(&self) -> u8 {
        self.when.day() as u8
    }

    pub fn hour(&self) -> u8 {
        self.when.hour() as u8
    }

    pub fn minute(&self) -> u8 {
        self.when.minute() as u8
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.when
    }

    /// Seconds since the epoch, seconds field zero.
    pub fn epoch_seconds(&self) -> u32 {
        self.epoch
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ParsedTimestamp {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{=u16}/{=u8}/{=u8} {=u8}:{=u8}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute()
        )
    }
}

/// Hour and minute at which the buzzer goes off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmTime {
    pub hour: u8,
    pub minute: u8,
}

impl AlarmTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, Error> {
        time_of_day(hour, minute, Field::AlarmHour, Field::AlarmMinute)?;
        Ok(Self { hour, minute })
    }

    /// `when` falls inside the alarm minute.
    pub fn matches(&self, when: &NaiveDateTime) -> bool {
        when.hour() == u32::from(self.hour) && when.minute() == u32::from(self.minute)
    }
}

fn time_of_day(
    hour: u8,
    minute: u8,
    hour_field: Field,
    minute_field: Field,
) -> Result<NaiveTime, Error> {
    let field = if hour > 23 { hour_field } else { minute_field };
    NaiveTime::from_hms_opt(hour.into(), minute.into(), 0).ok_or(Error::OutOfRange(field))
}

/// Reads fixed-width decimal fields and delimiters left to right.
struct Cursor<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(raw: &'a [u8]) -> Self {
        Self { raw, pos: 0 }
    }

    fn number(&mut self, width: usize) -> Result<u16, Malformed> {
        let mut value = 0u16;
        for _ in 0..width {
            let b = self.raw[self.pos];
            if !b.is_ascii_digit() {
                return Err(Malformed::Digit {
                    offset: self.pos as u8,
                });
            }
            value = value * 10 + u16::from(b - b'0');
            self.pos += 1;
        }
        Ok(value)
    }

    fn two_digits(&mut self) -> Result<u8, Malformed> {
        // At most 99.
        self.number(2).map(|v| v as u8)
    }

    fn delimiter(&mut self, expected: u8) -> Result<(), Malformed> {
        if self.raw[self.pos] != expected {
            return Err(Malformed::Delimiter {
                offset: self.pos as u8,
                expected,
            });
        }
        self.pos += 1;
        Ok(())
    }
}

/// Parse a complete 22-byte frame.
///
/// Fails with [`Error::MalformedInput`] when the layout is broken and with
/// [`Error::OutOfRange`] when a field is not a real calendar value.
pub fn parse(raw: &[u8]) -> Result<(ParsedTimestamp, AlarmTime), Error> {
    if raw.len() != TIMESTAMP_LEN {
        return Err(Malformed::Length(raw.len()).into());
    }

    let mut cur = Cursor::new(raw);
    let year = cur.number(4)?;
    cur.delimiter(b'/')?;
    let month = cur.two_digits()?;
    cur.delimiter(b'/')?;
    let day = cur.two_digits()?;
    cur.delimiter(b' ')?;
    let hour = cur.two_digits()?;
    cur.delimiter(b':')?;
    let minute = cur.two_digits()?;
    cur.delimiter(b' ')?;
    let alarm_hour = cur.two_digits()?;
    cur.delimiter(b':')?;
    let alarm_minute = cur.two_digits()?;

    let ts = ParsedTimestamp::new(year, month, day, hour, minute)?;
    let alarm = AlarmTime::new(alarm_hour, alarm_minute)?;
    Ok((ts, alarm))
}

/// Accumulates single-byte characteristic writes into a frame.
pub struct TimestampInput {
    buf: Vec<u8, TIMESTAMP_LEN>,
}

impl TimestampInput {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append one received byte.
    ///
    /// Returns `None` while the frame is incomplete. On the 22nd byte the
    /// frame is parsed, the buffer is cleared, and the parse result is
    /// returned.
    pub fn push(&mut self, byte: u8) -> Option<Result<(ParsedTimestamp, AlarmTime), Error>> {
        // The buffer is cleared whenever it fills, so this cannot fail.
        let _ = self.buf.push(byte);
        if !self.buf.is_full() {
            return None;
        }
        let result = parse(&self.buf);
        self.buf.clear();
        Some(result)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes received so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for TimestampInput {
    fn default() -> Self {
        Self::new()
    }
}
