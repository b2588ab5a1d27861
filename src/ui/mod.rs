//! User interface - SSD1306 OLED text display + the two code buttons.
//!
//! ## Components
//!
//! - **Display**: SSD1306 128×64 OLED via I²C, six lines of 21 characters
//! - **Buttons**: 2 tactile switches with debouncing (A = 1, B = 0)

pub mod buttons;
pub mod display;
