//! Wake sources for the dispatch loop.
//!
//! Producers (SoftDevice callback, GATT server callback, button and timer
//! tasks) never block: they `try_send` into a queue or set a flag bit and
//! then signal [`WAKE`]. A full queue drops the event.

use defmt::warn;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::signal::Signal;

use iotclock::config::{APP_QUEUE_DEPTH, STACK_QUEUE_DEPTH};
use iotclock::event::{AppEvent, EventFlags, Inbox, StackMsg};
use iotclock::Error;

pub static WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static APP_EVENTS: Channel<CriticalSectionRawMutex, AppEvent, APP_QUEUE_DEPTH> = Channel::new();
static STACK_MSGS: Channel<CriticalSectionRawMutex, StackMsg, STACK_QUEUE_DEPTH> = Channel::new();
static FLAGS: EventFlags = EventFlags::new();

pub fn post_app(event: AppEvent) -> Result<(), Error> {
    APP_EVENTS.try_send(event).map_err(|TrySendError::Full(ev)| {
        warn!("app queue full, dropped {}", ev);
        Error::QueueFull
    })?;
    WAKE.signal(());
    Ok(())
}

pub fn post_stack(msg: StackMsg) -> Result<(), Error> {
    STACK_MSGS.try_send(msg).map_err(|TrySendError::Full(msg)| {
        warn!("stack queue full, dropped {}", msg);
        Error::QueueFull
    })?;
    WAKE.signal(());
    Ok(())
}

pub fn raise(bits: u16) {
    FLAGS.set(bits);
    WAKE.signal(());
}

/// Drains the static queues on behalf of the dispatch core.
pub struct QueueInbox;

impl Inbox for QueueInbox {
    fn stack_msg(&mut self) -> Option<StackMsg> {
        STACK_MSGS.try_receive().ok()
    }

    fn app_event(&mut self) -> Option<AppEvent> {
        APP_EVENTS.try_receive().ok()
    }

    fn take_periodic(&mut self) -> bool {
        FLAGS.take(EventFlags::PERIODIC)
    }
}
