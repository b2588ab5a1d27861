//! iotclock firmware - BLE alarm clock peripheral for nRF52840.
//!
//! The central programs the clock by writing a timestamp frame to the
//! simple profile service one byte at a time; two buttons enter an access
//! code derived from the day of the month; an SSD1306 OLED shows the
//! clock, the code entry and link diagnostics.
//!
//! All application state lives in one `CoreContext` owned by the main
//! task. Every other task only posts events and signals the wake
//! primitive.

#![no_std]
#![no_main]

mod ble;
mod platform;
mod ui;
mod wake;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::AnyPin;
use embassy_nrf::interrupt::Priority;
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use iotclock::access::Button;
use iotclock::CoreContext;

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

static SERVER: StaticCell<ble::Server> = StaticCell::new();

fn nrf_config() -> embassy_nrf::config::Config {
    let mut config = embassy_nrf::config::Config::default();
    // Priorities 0, 1 and 4 belong to the SoftDevice.
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    config
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("iotclock starting");
    let p = embassy_nrf::init(nrf_config());

    // Display first so boot failures are visible on RTT before BLE starts.
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim::Config::default());
    let display = unwrap!(ui::display::OledDisplay::new(i2c));

    let board = platform::Pins::new(
        AnyPin::from(p.P0_13),
        AnyPin::from(p.P0_14),
        AnyPin::from(p.P0_03),
    );
    unwrap!(spawner.spawn(platform::periodic_task()));

    let sd = ble::enable();
    let server: &'static ble::Server = SERVER.init(unwrap!(ble::Server::create(sd)));
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(ble::softdevice_task(sd)));
    unwrap!(spawner.spawn(ble::ble_task(sd, server)));

    unwrap!(spawner.spawn(ui::buttons::button_task(AnyPin::from(p.P0_11), Button::A)));
    unwrap!(spawner.spawn(ui::buttons::button_task(AnyPin::from(p.P0_12), Button::B)));

    let stack = ble::link::FirmwareStack::new(sd, server);
    let mut ctx = CoreContext::new(display, board, platform::UptimeClock::new(), stack);
    let mut inbox = wake::QueueInbox;

    info!("dispatch loop running");
    loop {
        wake::WAKE.wait().await;
        while ctx.process_wake(&mut inbox) {}
        ctx.display.refresh();
    }
}
