//! Board-level outputs, the periodic timer and the system clock.

/// Discrete outputs driven by the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Output {
    /// Lit after a wrong access code.
    ErrorLed,
    /// Lit after a correct access code.
    UnlockLed,
    /// Alarm sounder.
    Buzzer,
}

pub trait Board {
    /// Drive `output` on (`true`) or off. Polarity is the board's concern.
    fn set_output(&mut self, output: Output, on: bool);

    /// (Re)arm the one-shot periodic timer. When it expires the periodic
    /// flag is raised and the event loop is woken.
    fn start_periodic(&mut self);

    fn stop_periodic(&mut self);
}

/// Seconds-resolution real-time clock.
pub trait SystemClock {
    fn set_epoch_seconds(&mut self, secs: u32);
    fn epoch_seconds(&self) -> u32;
}
