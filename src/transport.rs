//! ==============================================================================
//! transport.rs - http GET against the station
//! ==============================================================================
//!
//! purpose:
//!     wraps the one request the station understands. the station lives on
//!     the local network, often behind a self-signed certificate when proxied,
//!     so peer verification is off and redirects are followed.
//!
//! ```text
//!     GET http://<address>/cgi-bin/cgiLastData
//! ```
//!
//! structure:
//!     - Transport: an open handle that can perform GETs (one per connection)
//!     - Connector: creates handles; the http one is built once per process
//!
//! relationships:
//!     - used by: session.rs (opens/drops the handle), poller.rs (fetch cycle)
//!     - uses: reqwest blocking client (the poller is a plain thread)
//!
//! ==============================================================================

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::error::{DeviceError, Result};

/// Path of the station's latest-readings endpoint.
pub const LAST_DATA_PATH: &str = "/cgi-bin/cgiLastData";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_REDIRECTS: usize = 10;

/// An open connection handle.
pub trait Transport: Send + Sync {
    /// GET `path` relative to the handle's base url and return the body verbatim.
    fn get(&self, path: &str) -> Result<String>;
}

/// Creates transport handles for a base url such as `http://192.168.0.10`.
pub trait Connector: Send + Sync {
    fn open(&self, base_url: &str) -> Result<Box<dyn Transport>>;
}

#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    /// Whole-request bound. Also bounds how long disconnect() can wait on an
    /// in-flight poll.
    pub request_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

// ==============================================================================
// http implementation
// ==============================================================================

/// Process-wide http setup. Create one at startup and share it between sessions.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    settings: TransportSettings,
}

impl HttpConnector {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> TransportSettings {
        self.settings
    }
}

impl Connector for HttpConnector {
    fn open(&self, base_url: &str) -> Result<Box<dyn Transport>> {
        let client = Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| DeviceError::TransportInitFailed(e.to_string()))?;

        debug!(base_url, "http transport opened");
        Ok(Box::new(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }))
    }
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl Transport for HttpTransport {
    fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| DeviceError::RequestFailed(describe(&e)))?;

        response
            .text()
            .map_err(|e| DeviceError::RequestFailed(describe(&e)))
    }
}

/// Short classification prefix plus reqwest's own message.
fn describe(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_status() {
        "status"
    } else if err.is_redirect() {
        "redirect"
    } else {
        "request"
    };
    format!("{kind}: {err}")
}
