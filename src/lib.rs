//! Host-testable core of the iotclock firmware.
//!
//! Everything here is hardware-independent: the access-code verifier,
//! timestamp parsing, calendar conversion, the clock/alarm manager, the
//! attribute-response retry protocol and the dispatch core that ties them
//! together. The firmware binary (`main.rs`) implements the collaborator
//! traits over SoftDevice, GPIO and the OLED.
//!
//! Usage: `cargo test --lib`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod access;
pub mod alarm;
pub mod app;
pub mod att_rsp;
pub mod board;
pub mod calendar;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod stack;
pub mod timestamp;

pub use app::CoreContext;
pub use error::Error;

#[cfg(test)]
mod tests;
