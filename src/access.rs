//! Two-button access code.
//!
//! The code is the day of the month in binary, five bits, most significant
//! bit first. Button A enters a 1 and button B a 0. After the fifth press
//! the entry is compared and cleared whatever the result.

use crate::config::{ACCESS_CODE_LEN, LINE_CODE};
use crate::display::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    A,
    B,
}

impl Button {
    pub fn bit(self) -> bool {
        matches!(self, Button::A)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Fewer than five presses so far.
    Pending,
    Granted,
    Denied,
}

/// Bit pattern a full entry must match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExpectedCode([bool; ACCESS_CODE_LEN]);

impl ExpectedCode {
    /// Low five bits of `day`, most significant first.
    pub fn from_day(day: u8) -> Self {
        let mut bits = [false; ACCESS_CODE_LEN];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = day & (1 << (ACCESS_CODE_LEN - 1 - i)) != 0;
        }
        Self(bits)
    }

    pub fn bits(&self) -> &[bool; ACCESS_CODE_LEN] {
        &self.0
    }

    /// The button sequence that enters this code.
    pub fn presses(&self) -> [Button; ACCESS_CODE_LEN] {
        self.0.map(|b| if b { Button::A } else { Button::B })
    }
}

pub struct AccessCode {
    entered: [bool; ACCESS_CODE_LEN],
    index: usize,
    expected: ExpectedCode,
    day: u8,
}

impl AccessCode {
    pub fn new(day: u8) -> Self {
        Self {
            entered: [false; ACCESS_CODE_LEN],
            index: 0,
            expected: ExpectedCode::from_day(day),
            day,
        }
    }

    /// Presses recorded in the current attempt.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn expected(&self) -> ExpectedCode {
        self.expected
    }

    /// Track the current day of month. The expected code is recomputed only
    /// when the day actually changes; returns whether it did.
    pub fn set_day(&mut self, day: u8) -> bool {
        if day == self.day {
            return false;
        }
        self.day = day;
        self.expected = ExpectedCode::from_day(day);
        debug!("access: day {=u8}, code recomputed", day);
        true
    }

    /// Record one button press and echo it on the code line.
    pub fn record_press<D: Display>(&mut self, button: Button, display: &mut D) -> Outcome {
        if self.index == 0 {
            display.clear_line(LINE_CODE);
        }

        let bit = button.bit();
        self.entered[self.index] = bit;
        display.write_at(LINE_CODE, self.index as u8, if bit { "1" } else { "0" });
        self.index += 1;

        if self.index < ACCESS_CODE_LEN {
            return Outcome::Pending;
        }

        let outcome = if self.entered == *self.expected.bits() {
            Outcome::Granted
        } else {
            Outcome::Denied
        };
        self.index = 0;
        self.entered = [false; ACCESS_CODE_LEN];
        info!("access: {}", outcome);
        outcome
    }
}
