//! ==============================================================================
//! session.rs - device session façade
//! ==============================================================================
//!
//! purpose:
//!     the object a host talks to. owns everything else. the link mutex
//!     guards the transport handle, the store's write path and every
//!     connect/disconnect transition. getters never take it.
//!
//! ```text
//!     ┌────────────────────────── DeviceSession ──────────────────────────┐
//!     │  address (RwLock)      connected (AtomicBool)    spawn counter    │
//!     │                                                                    │
//!     │  Arc<Mutex<Link>> ──── the one lock ────┐                          │
//!     │     transport handle                    │ shared with              │
//!     │     poller handle                       v                          │
//!     │  Arc<SnapshotStore>  Arc<FreshnessTimer> ──> poller thread         │
//!     └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! relationships:
//!     - uses: transport.rs, poller.rs, snapshot.rs, freshness.rs, report.rs
//!     - used by: main.rs (host binary), integration tests
//!
//! ==============================================================================

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::error::{DeviceError, Result};
use crate::freshness::FreshnessTimer;
use crate::poller::{fetch_cycle, Poller, PollerSettings};
use crate::report::{WeatherReport, WindSpeedUnit};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::transport::{Connector, Transport};

/// Connection state guarded by the session lock.
pub(crate) struct Link {
    pub(crate) transport: Option<Box<dyn Transport>>,
    pub(crate) poller: Option<Poller>,
}

pub struct DeviceSession {
    connector: Arc<dyn Connector>,
    settings: PollerSettings,
    link: Arc<Mutex<Link>>,
    address: RwLock<Option<String>>,
    connected: AtomicBool,
    store: Arc<SnapshotStore>,
    timer: Arc<FreshnessTimer>,
    worker_spawns: AtomicUsize,
}

impl DeviceSession {
    pub fn new(connector: Arc<dyn Connector>, settings: PollerSettings) -> Self {
        Self {
            connector,
            settings,
            link: Arc::new(Mutex::new(Link {
                transport: None,
                poller: None,
            })),
            address: RwLock::new(None),
            connected: AtomicBool::new(false),
            store: Arc::new(SnapshotStore::new()),
            timer: Arc::new(FreshnessTimer::new()),
            worker_spawns: AtomicUsize::new(0),
        }
    }

    // ==========================================================================
    // lifecycle
    // ==========================================================================

    /// Open the link, validate it with one fetch, then start polling.
    ///
    /// Any failure leaves the session disconnected. Calling this while already
    /// connected does nothing.
    pub fn connect(&self) -> Result<()> {
        let mut link = self.lock_link();
        if link.transport.is_some() {
            debug!("connect() while connected, ignoring");
            return Ok(());
        }

        let address = self
            .address()
            .filter(|a| !a.trim().is_empty())
            .ok_or(DeviceError::NoAddressConfigured)?;
        let base_url = format!("http://{}", address.trim());
        info!(%base_url, "connecting to station");

        link.transport = Some(self.connector.open(&base_url)?);

        if let Err(err) = fetch_cycle(&link, &self.store) {
            link.transport = None;
            warn!(error = %err, "station did not answer, link dropped");
            return Err(DeviceError::LinkFailed(Box::new(err)));
        }

        if link.poller.is_none() {
            let poller = Poller::start(
                Arc::clone(&self.link),
                Arc::clone(&self.store),
                Arc::clone(&self.timer),
                self.settings,
            );
            match poller {
                Ok(poller) => {
                    link.poller = Some(poller);
                    self.worker_spawns.fetch_add(1, Ordering::SeqCst);
                }
                Err(err) => {
                    link.transport = None;
                    return Err(DeviceError::TransportInitFailed(format!(
                        "poller thread could not start: {err}"
                    )));
                }
            }
        }

        self.timer.reset();
        self.connected.store(true, Ordering::SeqCst);
        info!(firmware = %self.store.firmware(), "connected");
        Ok(())
    }

    /// Stop the poller, wait for it to exit, then release the transport.
    ///
    /// Blocks for as long as an in-flight request takes. Safe to call twice.
    pub fn disconnect(&self) {
        let mut link = self.lock_link();

        if let Some(poller) = link.poller.take() {
            debug!("waiting for poller to exit");
            poller.stop();
        }
        if link.transport.take().is_some() {
            info!("disconnected");
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    // ==========================================================================
    // address
    // ==========================================================================

    /// Set the station host or ip (optionally with `:port`). Only while disconnected.
    pub fn set_address(&self, address: &str) -> Result<()> {
        let link = self.lock_link();
        if link.transport.is_some() {
            return Err(DeviceError::InvalidState("address cannot change while connected"));
        }
        *self.address.write().unwrap_or_else(PoisonError::into_inner) = Some(address.to_string());
        debug!(address, "device address set");
        Ok(())
    }

    pub fn address(&self) -> Option<String> {
        self.address.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    // ==========================================================================
    // readings
    // ==========================================================================

    pub fn firmware(&self) -> String {
        self.store.firmware()
    }

    pub fn cloud_condition(&self) -> i32 {
        self.store.cloud_condition()
    }

    pub fn sky_temperature(&self) -> f64 {
        self.store.sky_temperature()
    }

    pub fn ambient_temperature(&self) -> f64 {
        self.store.ambient_temperature()
    }

    pub fn wind_speed(&self) -> f64 {
        self.store.wind_speed()
    }

    pub fn wind_condition(&self) -> i32 {
        self.store.wind_condition()
    }

    pub fn wind_gust(&self) -> f64 {
        self.store.wind_gust()
    }

    pub fn rain_condition(&self) -> i32 {
        self.store.rain_condition()
    }

    pub fn light_condition(&self) -> i32 {
        self.store.light_condition()
    }

    pub fn safe_condition(&self) -> i32 {
        self.store.safe_condition()
    }

    pub fn humidity(&self) -> i32 {
        self.store.humidity()
    }

    pub fn humidity_condition(&self) -> i32 {
        self.store.humidity_condition()
    }

    pub fn dew_point(&self) -> f64 {
        self.store.dew_point()
    }

    pub fn barometric_pressure(&self) -> f64 {
        self.store.barometric_pressure()
    }

    pub fn pressure_condition(&self) -> i32 {
        self.store.pressure_condition()
    }

    /// Seconds since the last successful fetch.
    pub fn elapsed_seconds(&self) -> f64 {
        self.timer.elapsed_seconds()
    }

    /// The station always reports wind in km/h.
    pub fn wind_speed_unit(&self) -> WindSpeedUnit {
        WindSpeedUnit::Kph
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Everything a weather-station host asks for in one call.
    pub fn report(&self) -> Result<WeatherReport> {
        if !self.is_connected() {
            return Err(DeviceError::NotConnected);
        }
        Ok(WeatherReport::new(
            &self.store.snapshot(),
            self.elapsed_seconds(),
            self.wind_speed_unit(),
        ))
    }

    /// Number of poller threads this session has started so far.
    pub fn worker_spawns(&self) -> usize {
        self.worker_spawns.load(Ordering::SeqCst)
    }

    fn lock_link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const BODY: &str = "cwinfo=FW 5.89\ncloudsSafe=1\nclouds=-20.5\ntemp=8.0\nwind=3\nwindSafe=1\n\
gust=6\nrainSafe=1\nlightSafe=1\nsafe=1\nhum=70\nhumSafe=1\ndewp=2.9\nrelpress=1012\npressureSafe=1\n";

    /// Scripted station: `healthy` toggles between a full body and a 500.
    struct FakeConnector {
        healthy: Arc<AtomicBool>,
        refuse: bool,
        opened: AtomicUsize,
    }

    struct FakeTransport {
        healthy: Arc<AtomicBool>,
    }

    impl Transport for FakeTransport {
        fn get(&self, _path: &str) -> Result<String> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(BODY.to_string())
            } else {
                Err(DeviceError::RequestFailed("status: 500".into()))
            }
        }
    }

    impl Connector for FakeConnector {
        fn open(&self, base_url: &str) -> Result<Box<dyn Transport>> {
            assert!(base_url.starts_with("http://"));
            if self.refuse {
                return Err(DeviceError::TransportInitFailed("refused".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeTransport { healthy: self.healthy.clone() }))
        }
    }

    fn session(healthy: bool, refuse: bool) -> (DeviceSession, Arc<FakeConnector>) {
        let connector = Arc::new(FakeConnector {
            healthy: Arc::new(AtomicBool::new(healthy)),
            refuse,
            opened: AtomicUsize::new(0),
        });
        let settings = PollerSettings {
            interval: Duration::from_millis(20),
            lock_wait: Duration::from_millis(10),
        };
        (DeviceSession::new(connector.clone(), settings), connector)
    }

    #[test]
    fn connect_requires_address() {
        let (session, _) = session(true, false);
        assert!(matches!(session.connect(), Err(DeviceError::NoAddressConfigured)));

        session.set_address("  ").unwrap();
        assert!(matches!(session.connect(), Err(DeviceError::NoAddressConfigured)));
        assert!(!session.is_connected());
    }

    #[test]
    fn transport_init_failure_is_surfaced() {
        let (session, _) = session(true, true);
        session.set_address("10.0.0.2").unwrap();
        assert!(matches!(session.connect(), Err(DeviceError::TransportInitFailed(_))));
        assert!(!session.is_connected());
        assert_eq!(session.worker_spawns(), 0);
    }

    #[test]
    fn failed_validation_rolls_back() {
        let (session, _) = session(false, false);
        session.set_address("10.0.0.2").unwrap();

        let err = session.connect().unwrap_err();
        assert!(matches!(&err, DeviceError::LinkFailed(cause) if matches!(**cause, DeviceError::RequestFailed(_))));
        assert!(!session.is_connected());
        assert_eq!(session.worker_spawns(), 0);
        // still disconnected, so the address may change
        session.set_address("10.0.0.3").unwrap();
    }

    #[test]
    fn connect_is_idempotent() {
        let (session, connector) = session(true, false);
        session.set_address("10.0.0.2").unwrap();

        session.connect().unwrap();
        session.connect().unwrap();
        session.connect().unwrap();
        assert_eq!(session.worker_spawns(), 1);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
        assert_eq!(session.ambient_temperature(), 8.0);
        assert_eq!(session.firmware(), "Solo Cloudwatcher FW 5.89");

        session.disconnect();
        session.disconnect();
        assert!(!session.is_connected());

        session.connect().unwrap();
        assert_eq!(session.worker_spawns(), 2);
    }

    #[test]
    fn address_is_locked_while_connected() {
        let (session, _) = session(true, false);
        session.set_address("10.0.0.2").unwrap();
        session.connect().unwrap();

        assert!(matches!(session.set_address("10.0.0.9"), Err(DeviceError::InvalidState(_))));
        assert_eq!(session.address().as_deref(), Some("10.0.0.2"));

        session.disconnect();
        session.set_address("10.0.0.9").unwrap();
        assert_eq!(session.address().as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn station_outage_only_shows_in_freshness() {
        let (session, connector) = session(true, false);
        session.set_address("10.0.0.2").unwrap();
        session.connect().unwrap();
        assert!(session.elapsed_seconds() < 0.5);

        connector.healthy.store(false, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(150));
        assert!(session.elapsed_seconds() >= 0.1);
        assert!(session.is_connected());
        assert_eq!(session.humidity(), 70);

        connector.healthy.store(true, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(100));
        assert!(session.elapsed_seconds() < 0.1);
    }

    #[test]
    fn report_needs_connection() {
        let (session, _) = session(true, false);
        assert!(matches!(session.report(), Err(DeviceError::NotConnected)));

        session.set_address("10.0.0.2").unwrap();
        session.connect().unwrap();
        let report = session.report().unwrap();
        assert_eq!(report.humidity, Some(70));
        assert!(!report.roof_close);
    }
}
