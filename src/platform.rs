//! Board outputs, the periodic timer and the uptime-based system clock.

use defmt::{debug, info};
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};

use iotclock::board::{self, Board, SystemClock};
use iotclock::config::PERIODIC_EVT_PERIOD_MS;
use iotclock::event::EventFlags;

use crate::wake;

/// `true` (re)arms the periodic timer, `false` stops it.
static PERIODIC_CTRL: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// LEDs are active-low, the buzzer active-high.
pub struct Pins {
    error_led: Output<'static>,
    unlock_led: Output<'static>,
    buzzer: Output<'static>,
}

impl Pins {
    pub fn new(error_led: AnyPin, unlock_led: AnyPin, buzzer: AnyPin) -> Self {
        Self {
            error_led: Output::new(error_led, Level::High, OutputDrive::Standard),
            unlock_led: Output::new(unlock_led, Level::High, OutputDrive::Standard),
            buzzer: Output::new(buzzer, Level::Low, OutputDrive::Standard),
        }
    }
}

impl Board for Pins {
    fn set_output(&mut self, output: board::Output, on: bool) {
        debug!("output {} -> {}", output, on);
        match output {
            board::Output::ErrorLed => self.error_led.set_level(Level::from(!on)),
            board::Output::UnlockLed => self.unlock_led.set_level(Level::from(!on)),
            board::Output::Buzzer => self.buzzer.set_level(Level::from(on)),
        }
    }

    fn start_periodic(&mut self) {
        PERIODIC_CTRL.signal(true);
    }

    fn stop_periodic(&mut self) {
        PERIODIC_CTRL.signal(false);
    }
}

/// One-shot periodic clock. Each expiry raises the periodic flag; the
/// dispatch loop re-arms it while it wants more.
#[embassy_executor::task]
pub async fn periodic_task() -> ! {
    let period = Duration::from_millis(PERIODIC_EVT_PERIOD_MS);
    let mut armed = false;

    loop {
        if !armed {
            armed = PERIODIC_CTRL.wait().await;
            continue;
        }
        match select(PERIODIC_CTRL.wait(), Timer::after(period)).await {
            Either::First(on) => armed = on,
            Either::Second(()) => {
                armed = false;
                wake::raise(EventFlags::PERIODIC);
            }
        }
    }
}

/// Wall-clock seconds kept as an offset from the uptime counter.
pub struct UptimeClock {
    offset: u32,
}

impl UptimeClock {
    pub const fn new() -> Self {
        Self { offset: 0 }
    }

    fn uptime() -> u32 {
        Instant::now().as_secs() as u32
    }
}

impl SystemClock for UptimeClock {
    fn set_epoch_seconds(&mut self, secs: u32) {
        self.offset = secs.wrapping_sub(Self::uptime());
        info!("rtc: epoch {=u32}", secs);
    }

    fn epoch_seconds(&self) -> u32 {
        self.offset.wrapping_add(Self::uptime())
    }
}
