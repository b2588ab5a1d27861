//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **GATT server** - the simple profile service (0xFFF0) and Device
//!    Information (0x180A).
//! 2. **Advertiser** - connectable undirected advertising, restarted after
//!    every disconnection. One central at a time.
//! 3. **Security** - display-only pairing with a fixed passkey and bonding
//!    (see [`bond`]). A few seconds into each link the peripheral asks for
//!    its preferred connection parameters.
//! 4. **Event relay** - SoftDevice events the core cares about (connection
//!    event ends, MTU exchange, disconnect reason) are turned into stack
//!    messages from the SoftDevice callback.
//!
//! Communication with the dispatch loop goes through [`crate::wake`].

pub mod bond;
pub mod link;

use core::cell::RefCell;
use core::mem;
use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Timer;
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::{raw, Softdevice};

use iotclock::config::{
    BLE_ADV_INTERVAL, BLE_ATT_MTU, BLE_CONN_INTERVAL_MAX, BLE_CONN_INTERVAL_MIN,
    BLE_CONN_PAUSE_SECS, BLE_SLAVE_LATENCY, BLE_SUP_TIMEOUT, DEVICE_NAME,
};
use iotclock::event::{AppEvent, GattMsg, StackMsg};
use iotclock::stack::{GapRoleState, ProfileParam};
use iotclock::Error;

use crate::wake;

/// The live connection, shared with [`link::FirmwareStack`].
pub static CONNECTION: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

/// Relay connection-event ends to the dispatch loop while set.
pub static CONN_EVENT_NOTICE: AtomicBool = AtomicBool::new(false);

/// The last disconnection was a supervision timeout.
static TIMED_OUT: AtomicBool = AtomicBool::new(false);

#[nrf_softdevice::gatt_service(uuid = "fff0")]
pub struct SimpleService {
    #[characteristic(uuid = "fff1", read, write)]
    pub char1: u8,
    #[characteristic(uuid = "fff2", read)]
    pub char2: u8,
    #[characteristic(uuid = "fff3", write)]
    pub char3: u8,
    #[characteristic(uuid = "fff4", notify)]
    pub char4: u8,
}

#[nrf_softdevice::gatt_service(uuid = "180a")]
pub struct DeviceInformationService {
    #[characteristic(uuid = "2a23", read)]
    pub system_id: [u8; 8],
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub simple: SimpleService,
    pub dis: DeviceInformationService,
}

impl Server {
    /// Register the services and load the characteristic defaults.
    pub fn create(sd: &mut Softdevice) -> Result<Self, Error> {
        let server = Server::new(sd).map_err(|_| Error::GattServer)?;
        let defaults = server
            .simple
            .char1_set(&1)
            .and(server.simple.char2_set(&2))
            .and(server.simple.char3_set(&3))
            .and(server.simple.char4_set(&4));
        if defaults.is_err() {
            warn!("characteristic defaults not stored");
        }
        Ok(server)
    }
}

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(ServiceList::Complete, &[ServiceUuid16::from_u16(0xFFF0)])
    .build();

static SCAN_DATA: LegacyAdvertisementPayload =
    LegacyAdvertisementBuilder::new().full_name(DEVICE_NAME).build();

/// Enable the SoftDevice for a single peripheral link.
pub fn enable() -> &'static mut Softdevice {
    let config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: BLE_ATT_MTU,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&config);

    let ppcp = preferred_conn_params();
    let ret = unsafe { raw::sd_ble_gap_ppcp_set(&ppcp) };
    if ret != raw::NRF_SUCCESS {
        warn!("ppcp_set failed: {}", ret);
    }
    bond::set_static_passkey();
    sd
}

fn preferred_conn_params() -> raw::ble_gap_conn_params_t {
    raw::ble_gap_conn_params_t {
        min_conn_interval: BLE_CONN_INTERVAL_MIN,
        max_conn_interval: BLE_CONN_INTERVAL_MAX,
        slave_latency: BLE_SLAVE_LATENCY,
        conn_sup_timeout: BLE_SUP_TIMEOUT,
    }
}

/// Once the link has settled, ask the central for the preferred parameters.
async fn request_conn_params(conn: &Connection) -> ! {
    Timer::after_secs(BLE_CONN_PAUSE_SECS).await;
    match conn.set_conn_params(preferred_conn_params()) {
        Ok(()) => debug!("conn param update requested"),
        Err(e) => warn!("conn param update failed: {}", e),
    }
    loop {
        core::future::pending::<()>().await;
    }
}

fn relay(evt: &raw::ble_evt_t) {
    match evt.header.evt_id as u32 {
        raw::BLE_GAP_EVTS_BLE_GAP_EVT_DISCONNECTED => {
            let reason = unsafe { evt.evt.gap_evt.params.disconnected.reason };
            debug!("disconnected, reason {=u8:#x}", reason);
            TIMED_OUT.store(
                reason as u32 == raw::BLE_HCI_CONNECTION_TIMEOUT,
                Ordering::Relaxed,
            );
        }
        raw::BLE_GATTS_EVTS_BLE_GATTS_EVT_HVN_TX_COMPLETE => {
            if CONN_EVENT_NOTICE.load(Ordering::Relaxed) {
                let conn = unsafe { evt.evt.gatts_evt.conn_handle };
                let _ = wake::post_stack(StackMsg::ConnEventEnd(conn));
            }
        }
        raw::BLE_GATTS_EVTS_BLE_GATTS_EVT_EXCHANGE_MTU_REQUEST => {
            let client = unsafe { evt.evt.gatts_evt.params.exchange_mtu_request.client_rx_mtu };
            let mtu = client.min(BLE_ATT_MTU);
            let _ = wake::post_stack(StackMsg::Gatt(GattMsg::MtuUpdated { mtu }));
        }
        _ => {}
    }
}

#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run_with_callback(|evt| relay(unsafe { &*evt })).await
}

/// Advertise, serve one central until it leaves, repeat.
#[embassy_executor::task]
pub async fn ble_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    let bonder = bond::bonder();
    let _ = wake::post_app(AppEvent::StateChange(GapRoleState::Started));

    loop {
        let config = peripheral::Config {
            interval: BLE_ADV_INTERVAL,
            ..Default::default()
        };
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };

        let _ = wake::post_app(AppEvent::StateChange(GapRoleState::Advertising));
        let conn = match peripheral::advertise_pairable(sd, adv, &config, bonder).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("advertising failed: {}", e);
                let _ = wake::post_app(AppEvent::StateChange(GapRoleState::Error));
                Timer::after_secs(1).await;
                continue;
            }
        };
        info!("connected to {}", conn.peer_address());

        CONNECTION.lock(|c| *c.borrow_mut() = Some(conn.clone()));
        let _ = wake::post_app(AppEvent::StateChange(GapRoleState::Connected));

        let serve = gatt_server::run(&conn, server, |e| match e {
            ServerEvent::Simple(e) => match e {
                SimpleServiceEvent::Char1Write(val) => {
                    debug!("char1 <- {}", val);
                    let _ = wake::post_app(AppEvent::CharChange {
                        param: ProfileParam::Char1,
                        value: val,
                    });
                }
                SimpleServiceEvent::Char3Write(val) => {
                    debug!("char3 <- {}", val);
                    let _ = wake::post_app(AppEvent::CharChange {
                        param: ProfileParam::Char3,
                        value: val,
                    });
                }
                SimpleServiceEvent::Char4CccdWrite { notifications } => {
                    info!("char4 notifications: {}", notifications);
                }
            },
            ServerEvent::Dis(e) => match e {},
        });
        let e = match select(serve, request_conn_params(&conn)).await {
            Either::First(e) => e,
            Either::Second(never) => never,
        };
        info!("gatt_server run exited: {:?}", e);

        CONNECTION.lock(|c| *c.borrow_mut() = None);
        CONN_EVENT_NOTICE.store(false, Ordering::Relaxed);
        let state = if TIMED_OUT.swap(false, Ordering::Relaxed) {
            GapRoleState::WaitingAfterTimeout
        } else {
            GapRoleState::Waiting
        };
        let _ = wake::post_app(AppEvent::StateChange(state));
    }
}
