//! The core's view of the SoftDevice: profile values, notifications and
//! GAP addresses.

use core::sync::atomic::Ordering;

use defmt::{debug, warn};
use nrf_softdevice::ble::gatt_server::NotifyValueError;
use nrf_softdevice::ble::{get_address, Connection};
use nrf_softdevice::{RawError, Softdevice};

use iotclock::stack::{
    method, AttRsp, AttStatus, AttTransport, ConnHandle, GapRole, Profile, ProfileParam,
};

use super::{Server, CONNECTION, CONN_EVENT_NOTICE};

pub struct FirmwareStack {
    sd: &'static Softdevice,
    server: &'static Server,
}

impl FirmwareStack {
    pub fn new(sd: &'static Softdevice, server: &'static Server) -> Self {
        Self { sd, server }
    }

    fn connection(&self) -> Option<Connection> {
        CONNECTION.lock(|c| c.borrow().clone())
    }
}

impl Profile for FirmwareStack {
    fn get_parameter(&self, param: ProfileParam) -> Option<u8> {
        let simple = &self.server.simple;
        let value = match param {
            ProfileParam::Char1 => simple.char1_get(),
            ProfileParam::Char2 => simple.char2_get(),
            ProfileParam::Char3 => simple.char3_get(),
            ProfileParam::Char4 => simple.char4_get(),
        };
        value.ok()
    }

    fn set_parameter(&mut self, param: ProfileParam, value: u8) {
        let simple = &self.server.simple;
        let result = match param {
            ProfileParam::Char1 => simple.char1_set(&value),
            ProfileParam::Char2 => simple.char2_set(&value),
            ProfileParam::Char3 => simple.char3_set(&value),
            ProfileParam::Char4 => simple.char4_set(&value),
        };
        if let Err(e) = result {
            warn!("set {} failed: {}", param, e);
        }
    }

    fn set_system_id(&mut self, id: [u8; 8]) {
        if let Err(e) = self.server.dis.system_id_set(&id) {
            warn!("system id not stored: {}", e);
        }
    }
}

impl AttTransport for FirmwareStack {
    fn send_rsp(&mut self, rsp: &AttRsp) -> AttStatus {
        let Some(conn) = self.connection() else {
            return AttStatus::NotConnected;
        };
        if conn.handle() != Some(rsp.conn) {
            return AttStatus::NotConnected;
        }
        // Read and write responses are produced by the SoftDevice; only
        // notifications originate here.
        if rsp.method != method::HANDLE_VALUE_NOTI {
            return AttStatus::Failure(rsp.method as u32);
        }
        let Some(&value) = rsp.payload.first() else {
            return AttStatus::Failure(0);
        };

        match self.server.simple.char4_notify(&conn, &value) {
            Ok(()) => AttStatus::Success,
            Err(NotifyValueError::Disconnected) => AttStatus::NotConnected,
            Err(NotifyValueError::Raw(RawError::Resources)) => AttStatus::Pending,
            Err(NotifyValueError::Raw(e)) => {
                debug!("notify failed: {}", e);
                AttStatus::Failure(e as u32)
            }
        }
    }

    fn conn_event_notice(&mut self, conn: ConnHandle, enable: bool) -> AttStatus {
        match self.connection().and_then(|c| c.handle()) {
            Some(h) if h == conn => {
                CONN_EVENT_NOTICE.store(enable, Ordering::Relaxed);
                AttStatus::Success
            }
            _ => {
                CONN_EVENT_NOTICE.store(false, Ordering::Relaxed);
                AttStatus::NotConnected
            }
        }
    }
}

impl GapRole for FirmwareStack {
    fn own_address(&self) -> [u8; 6] {
        get_address(self.sd).bytes()
    }

    fn peer_address(&self) -> Option<[u8; 6]> {
        self.connection().map(|c| c.peer_address().bytes())
    }

    fn conn_handle(&self) -> Option<ConnHandle> {
        self.connection().and_then(|c| c.handle())
    }
}
