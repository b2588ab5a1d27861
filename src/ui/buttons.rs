//! GPIO button input with async debouncing.
//!
//! Two physical buttons (active-low with internal pull-up) enter the
//! access code:
//!   - A - code bit 1
//!   - B - code bit 0
//!
//! Each button is handled by an async task that waits for a GPIO edge,
//! debounces it, and posts a `ButtonPress` to the application queue.

use defmt::info;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::{Duration, Timer};

use iotclock::access::Button;
use iotclock::config::BUTTON_DEBOUNCE_MS;
use iotclock::event::AppEvent;

use crate::wake;

/// Run a single button polling loop.
///
/// Waits for the pin to go low (pressed), debounces, posts the press,
/// then waits for release before repeating.
#[embassy_executor::task(pool_size = 2)]
pub async fn button_task(pin: AnyPin, button: Button) -> ! {
    let mut btn = Input::new(pin, Pull::Up);

    loop {
        // Wait for falling edge (button press, active-low).
        btn.wait_for_falling_edge().await;

        // Debounce: wait and re-check.
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        if btn.is_low() {
            info!("Button: {}", button);
            let _ = wake::post_app(AppEvent::ButtonPress(button));

            // Wait for release to avoid repeat triggers.
            btn.wait_for_rising_edge().await;
            Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        }
    }
}
