//! Pairing and bonding for the peripheral link.
//!
//! The clock has a display but no keyboard, so it pairs as display-only
//! with the fixed passkey from [`BLE_PASSKEY`]. The central initiates;
//! bonds live in RAM and are lost on reset.

use core::cell::RefCell;

use defmt::{info, warn};
use heapless::Vec;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode};
use nrf_softdevice::raw;
use static_cell::StaticCell;

use iotclock::config::{BLE_PASSKEY, MAX_BONDS};

struct PeerBond {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

pub struct Bonder {
    peers: RefCell<Vec<PeerBond, MAX_BONDS>>,
}

impl Bonder {
    fn new() -> Self {
        Self {
            peers: RefCell::new(Vec::new()),
        }
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::DisplayOnly
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn display_passkey(&self, passkey: &[u8; 6]) {
        info!("pairing passkey: {=[u8]:a}", passkey.as_slice());
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        let mut peers = self.peers.borrow_mut();
        if let Some(existing) = peers.iter_mut().find(|p| p.master_id == master_id) {
            existing.key = key;
            existing.peer_id = peer_id;
            return;
        }

        if peers.is_full() {
            peers.remove(0);
        }
        let _ = peers.push(PeerBond {
            master_id,
            key,
            peer_id,
        });
        info!("bonded, {} stored", peers.len());
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.peers
            .borrow()
            .iter()
            .find_map(|p| (p.master_id == master_id).then_some(p.key))
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("security mode updated: {}", mode);
    }
}

/// The bond table. Call once; it is shared by every advertising round.
pub fn bonder() -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new())
}

/// Make the SoftDevice use the fixed passkey instead of a random one.
pub fn set_static_passkey() {
    let opt = raw::ble_opt_t {
        gap_opt: raw::ble_gap_opt_t {
            passkey: raw::ble_gap_opt_passkey_t {
                p_passkey: BLE_PASSKEY.as_ptr(),
            },
        },
    };
    let ret = unsafe { raw::sd_ble_opt_set(raw::BLE_GAP_OPTS_BLE_GAP_OPT_PASSKEY, &opt) };
    if ret != raw::NRF_SUCCESS {
        warn!("static passkey not set: {}", ret);
    }
}
