//! ==============================================================================
//! poller.rs - background fetch loop
//! ==============================================================================
//!
//! purpose:
//!     keeps the snapshot current while a session is connected.
//!
//! cycle:
//!     failures never leave this thread. the only symptom a caller sees is
//!     elapsed_seconds() growing.
//!
//! ```text
//!     ┌──────────────┐  stop signal   ┌──────────┐
//!     │ wait interval├───────────────>│   exit   │
//!     └──────┬───────┘                └──────────┘
//!            │ timeout                      ^
//!            v                              │ stop signal
//!     ┌──────────────┐  busy past lock_wait │
//!     │ try the lock ├──────> skip cycle ───┤
//!     └──────┬───────┘                      │
//!            │ granted                      │
//!            v                              │
//!     ┌──────────────────────────────┐      │
//!     │ GET -> parse -> commit       │      │
//!     │ ok: reset freshness timer    │      │
//!     │ err: log, timer keeps going  │      │
//!     └──────┬───────────────────────┘      │
//!            └─────────── loop ─────────────┘
//! ```
//!
//! relationships:
//!     - started/stopped by: session.rs
//!     - uses: transport.rs, parser.rs, snapshot.rs, freshness.rs
//!
//! ==============================================================================

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{DeviceError, Result};
use crate::freshness::FreshnessTimer;
use crate::parser::{parse_fields, FIELD_SEPARATOR};
use crate::session::Link;
use crate::snapshot::SnapshotStore;
use crate::transport::LAST_DATA_PATH;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(500);

/// Granularity of the stop check while waiting for a busy lock.
const LOCK_RETRY_STEP: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    /// Time between cycles, and the upper bound on shutdown latency.
    pub interval: Duration,
    /// How long a cycle waits for the session lock before skipping.
    pub lock_wait: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }
}

/// One fetch-parse-commit pass. The caller holds the session lock.
pub(crate) fn fetch_cycle(link: &Link, store: &SnapshotStore) -> Result<()> {
    let transport = link.transport.as_deref().ok_or(DeviceError::NotConnected)?;
    let body = transport.get(LAST_DATA_PATH)?;
    let fields = parse_fields(&body, FIELD_SEPARATOR)?;
    store.commit(&fields)
}

/// Handle to the running worker thread. Dropping it stops and joins the thread.
pub(crate) struct Poller {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub(crate) fn start(
        link: Arc<Mutex<Link>>,
        store: Arc<SnapshotStore>,
        timer: Arc<FreshnessTimer>,
        settings: PollerSettings,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("cloudwatcher-poller".into())
            .spawn(move || poll_loop(&link, &store, &timer, settings, &stop_rx))?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Signal the worker and block until it has exited.
    pub(crate) fn stop(self) {
        drop(self);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // the worker may already be gone if it panicked
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("poller thread panicked");
            }
        }
    }
}

// ==============================================================================
// worker
// ==============================================================================

enum Access<'a> {
    Granted(MutexGuard<'a, Link>),
    Busy,
    Cancelled,
}

fn poll_loop(
    link: &Mutex<Link>,
    store: &SnapshotStore,
    timer: &FreshnessTimer,
    settings: PollerSettings,
    stop_rx: &Receiver<()>,
) {
    info!(interval_ms = settings.interval.as_millis() as u64, "poller started");

    loop {
        match stop_rx.recv_timeout(settings.interval) {
            Err(RecvTimeoutError::Timeout) => {}
            // explicit stop, or the session side is gone
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let guard = match acquire(link, stop_rx, settings.lock_wait) {
            Access::Granted(guard) => guard,
            Access::Busy => {
                debug!("session busy, skipping poll cycle");
                continue;
            }
            Access::Cancelled => break,
        };

        match fetch_cycle(&guard, store) {
            Ok(()) => {
                timer.reset();
                debug!("poll cycle ok");
            }
            Err(err) => {
                warn!(
                    error = %err,
                    seconds_since_good_data = timer.elapsed_seconds(),
                    "poll cycle failed"
                );
            }
        }
        drop(guard);
    }

    info!("poller stopped");
}

/// Try the session lock for up to `wait`, watching for a stop signal meanwhile.
fn acquire<'a>(link: &'a Mutex<Link>, stop_rx: &Receiver<()>, wait: Duration) -> Access<'a> {
    let deadline = Instant::now() + wait;
    loop {
        match link.try_lock() {
            Ok(guard) => return Access::Granted(guard),
            Err(TryLockError::Poisoned(poisoned)) => return Access::Granted(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Access::Busy;
        }
        match stop_rx.recv_timeout(LOCK_RETRY_STEP.min(deadline - now)) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return Access::Cancelled,
        }
    }
}
