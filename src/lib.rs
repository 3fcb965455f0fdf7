//! ==============================================================================
//! cloudwatcher - Solo Cloudwatcher poller
//! ==============================================================================
//!
//! purpose:
//!     keeps the latest readings of a Solo Cloudwatcher weather station in
//!     memory. a background thread fetches `/cgi-bin/cgiLastData` every few
//!     seconds; callers read any field at any time without waiting on it.
//!
//! usage:
//!
//! ```no_run
//! use std::sync::Arc;
//! use cloudwatcher::{DeviceSession, HttpConnector, PollerSettings};
//!
//! let connector = Arc::new(HttpConnector::default());
//! let session = DeviceSession::new(connector, PollerSettings::default());
//! session.set_address("192.168.0.10")?;
//! session.connect()?;
//! println!("sky {:.1} °C, {}s old", session.sky_temperature(), session.elapsed_seconds());
//! session.disconnect();
//! # Ok::<(), cloudwatcher::DeviceError>(())
//! ```
//!
//! ==============================================================================

pub mod config;
pub mod error;
pub mod freshness;
pub mod parser;
pub mod poller;
pub mod report;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod transport;

pub use error::{DeviceError, Result};
pub use poller::PollerSettings;
pub use report::WeatherReport;
pub use session::DeviceSession;
pub use snapshot::Snapshot;
pub use transport::{Connector, HttpConnector, Transport, TransportSettings};
