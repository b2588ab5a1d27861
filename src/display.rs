//! Character display capability.
//!
//! The core only ever talks to a line/column text surface. [`TextBuffer`]
//! is the in-memory implementation; the OLED adapter in the firmware
//! renders one of these to the panel after every change.

use core::fmt::{self, Write};

use heapless::String;

use crate::config::DISPLAY_COLUMNS;

/// Fire-and-forget text output. Writes past the edge are clipped.
pub trait Display {
    /// Write `text` starting at `column` of `line`, leaving the rest of the
    /// line untouched.
    fn write_at(&mut self, line: u8, column: u8, text: &str);

    /// Blank a single line.
    fn clear_line(&mut self, line: u8);

    /// Blank lines `from..=to`.
    fn clear_lines(&mut self, from: u8, to: u8) {
        for line in from..=to {
            self.clear_line(line);
        }
    }

    /// Replace the whole of `line` with formatted text.
    fn print(&mut self, line: u8, args: fmt::Arguments<'_>) {
        let mut text = LineWriter::default();
        let _ = text.write_fmt(args);
        self.clear_line(line);
        self.write_at(line, 0, text.0.as_str());
    }
}

/// Formats into one display line, dropping whatever does not fit.
#[derive(Default)]
struct LineWriter(String<DISPLAY_COLUMNS>);

impl Write for LineWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Fixed-size grid of ASCII characters.
pub struct TextBuffer<const LINES: usize, const COLS: usize> {
    cells: [[u8; COLS]; LINES],
    dirty: bool,
}

impl<const LINES: usize, const COLS: usize> TextBuffer<LINES, COLS> {
    pub const fn new() -> Self {
        Self {
            cells: [[b' '; COLS]; LINES],
            dirty: false,
        }
    }

    /// Full-width contents of `line`, including trailing blanks.
    pub fn line(&self, line: usize) -> &str {
        // Only printable ASCII is ever stored.
        core::str::from_utf8(&self.cells[line]).unwrap_or("")
    }

    /// Contents of `line` without trailing blanks.
    pub fn text(&self, line: usize) -> &str {
        self.line(line).trim_end()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        (0..LINES).map(move |l| self.line(l))
    }

    /// Returns true once after any change.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }
}

impl<const LINES: usize, const COLS: usize> Default for TextBuffer<LINES, COLS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const LINES: usize, const COLS: usize> Display for TextBuffer<LINES, COLS> {
    fn write_at(&mut self, line: u8, column: u8, text: &str) {
        let Some(row) = self.cells.get_mut(line as usize) else {
            return;
        };
        let start = column as usize;
        for (cell, c) in row.iter_mut().skip(start).zip(text.chars()) {
            *cell = if c.is_ascii_graphic() || c == ' ' {
                c as u8
            } else {
                b'?'
            };
        }
        self.dirty = true;
    }

    fn clear_line(&mut self, line: u8) {
        if let Some(row) = self.cells.get_mut(line as usize) {
            *row = [b' '; COLS];
            self.dirty = true;
        }
    }
}
