//! SSD1306 OLED display wrapper.
//!
//! The core writes into a [`TextBuffer`]; [`OledDisplay::refresh`] redraws
//! the panel from it when something changed.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use iotclock::config::{DISPLAY_COLUMNS, DISPLAY_LINES};
use iotclock::display::{Display, TextBuffer};
use iotclock::Error;

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Panel<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

const LINE_PITCH: i32 = 10;
const FIRST_BASELINE: i32 = 8;

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

pub struct OledDisplay<I2C> {
    panel: Panel<I2C>,
    text: TextBuffer<DISPLAY_LINES, DISPLAY_COLUMNS>,
}

impl<I2C> OledDisplay<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Initialise the SSD1306 and clear the screen.
    pub fn new(i2c: I2C) -> Result<Self, Error> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        panel.init().map_err(|_| Error::Display)?;
        panel.clear_buffer();
        panel.flush().map_err(|_| Error::Display)?;
        Ok(Self {
            panel,
            text: TextBuffer::new(),
        })
    }

    /// Redraw the panel if the text changed since the last call.
    pub fn refresh(&mut self) {
        if !self.text.take_dirty() {
            return;
        }
        self.panel.clear_buffer();
        for (row, line) in self.text.lines().enumerate() {
            let y = FIRST_BASELINE + row as i32 * LINE_PITCH;
            let _ = Text::new(line.trim_end(), Point::new(0, y), text_style()).draw(&mut self.panel);
        }
        let _ = self.panel.flush();
    }
}

impl<I2C> Display for OledDisplay<I2C> {
    fn write_at(&mut self, line: u8, column: u8, text: &str) {
        self.text.write_at(line, column, text);
    }

    fn clear_line(&mut self, line: u8) {
        self.text.clear_line(line);
    }
}
