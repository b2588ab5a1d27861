//! Attribute-response retry.
//!
//! When the link layer has no room for an outgoing PDU the stack reports
//! it as pending. We keep a single copy of that PDU and resend it at the
//! end of each connection event until it goes out, fails for good, or the
//! link drops. There is no retry ceiling; the supervision timeout ends a
//! stuck link and the disconnect discards the PDU.

use crate::config::LINE_ATT;
use crate::display::Display;
use crate::stack::{AttRsp, AttStatus, AttTransport};

pub struct AttRspRetry {
    pending: Option<AttRsp>,
    retries: u16,
}

impl AttRspRetry {
    pub const fn new() -> Self {
        Self {
            pending: None,
            retries: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resend attempts made for the held response.
    pub fn retries(&self) -> u16 {
        self.retries
    }

    pub fn pending(&self) -> Option<&AttRsp> {
        self.pending.as_ref()
    }

    /// Try to send `rsp` now, holding it for retry if the link is busy.
    pub fn send<T, D>(&mut self, transport: &mut T, display: &mut D, rsp: AttRsp) -> AttStatus
    where
        T: AttTransport,
        D: Display,
    {
        let status = transport.send_rsp(&rsp);
        if status.is_retryable() {
            self.hold(transport, display, rsp);
        } else if status != AttStatus::Success {
            debug!("att: send failed {}", status);
        }
        status
    }

    /// Take ownership of a response the stack could not send.
    ///
    /// The response is kept only if connection-event-end notices could be
    /// enabled; a previously held response is released first.
    pub fn hold<T, D>(&mut self, transport: &mut T, display: &mut D, rsp: AttRsp)
    where
        T: AttTransport,
        D: Display,
    {
        match transport.conn_event_notice(rsp.conn, true) {
            AttStatus::Success => {
                self.release(display, AttStatus::Failure(0));
                debug!("att: holding rsp method={=u8:#x} conn={}", rsp.method, rsp.conn);
                self.pending = Some(rsp);
                self.retries = 0;
            }
            status => {
                warn!("att: notice registration failed {}, rsp dropped", status);
            }
        }
    }

    /// Resend the held response at the end of a connection event.
    pub fn on_conn_event_end<T, D>(&mut self, transport: &mut T, display: &mut D)
    where
        T: AttTransport,
        D: Display,
    {
        let Some(rsp) = self.pending.as_ref() else {
            return;
        };
        self.retries = self.retries.saturating_add(1);
        let status = transport.send_rsp(rsp);
        if status.is_retryable() {
            display.print(LINE_ATT, format_args!("Rsp send retry: {}", self.retries));
        } else {
            let _ = transport.conn_event_notice(rsp.conn, false);
            self.release(display, status);
        }
    }

    /// Drop the held response, reporting how the last attempt ended.
    ///
    /// Called with [`AttStatus::NotConnected`] when the link goes away.
    pub fn release<D: Display>(&mut self, display: &mut D, status: AttStatus) {
        if self.pending.take().is_none() {
            return;
        }
        if status == AttStatus::Success {
            info!("att: rsp sent after {} retries", self.retries);
            display.print(LINE_ATT, format_args!("Rsp sent retry: {}", self.retries));
        } else {
            warn!("att: rsp released after {} retries ({})", self.retries, status);
            display.print(LINE_ATT, format_args!("Rsp retry failed: {}", self.retries));
        }
        self.retries = 0;
    }
}

impl Default for AttRspRetry {
    fn default() -> Self {
        Self::new()
    }
}
