//! Unified error type for iotclock.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Timestamp input
    /// The timestamp frame does not follow `YYYY/MM/DD HH:MM HH:MM`.
    MalformedInput(Malformed),

    /// A timestamp field parsed as a number but is not a valid calendar value.
    OutOfRange(Field),

    // Event plumbing
    /// An event queue was full and the event was dropped.
    QueueFull,

    // Peripherals (fatal at boot)
    /// The display driver could not be initialised.
    Display,

    /// The GATT server could not be registered with the SoftDevice.
    GattServer,
}

/// Where a timestamp frame stopped following the fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Malformed {
    /// The frame is not exactly 22 bytes long.
    Length(usize),
    /// A delimiter was expected at `offset`.
    Delimiter { offset: u8, expected: u8 },
    /// A decimal digit was expected at `offset`.
    Digit { offset: u8 },
}

/// Timestamp field names, used to report range failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    AlarmHour,
    AlarmMinute,
}

// Convenience conversions

impl From<Malformed> for Error {
    fn from(e: Malformed) -> Self {
        Error::MalformedInput(e)
    }
}
