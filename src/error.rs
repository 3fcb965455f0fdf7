//! ==============================================================================
//! error.rs - failure classes surfaced by the device session
//! ==============================================================================
//!
//! purpose:
//!     one closed enum for everything that can go wrong between "set an address"
//!     and "read a value". connect() returns these synchronously; the background
//!     poller only logs them.
//!
//! relationships:
//!     - used by: parser.rs, snapshot.rs, transport.rs, poller.rs, session.rs
//!
//! ==============================================================================

/// Errors produced by the cloudwatcher core.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Operation needs an open link to the station.
    #[error("not connected to the station")]
    NotConnected,

    /// connect() was called before any address was set.
    #[error("no device address configured")]
    NoAddressConfigured,

    /// The HTTP client handle could not be created.
    #[error("transport init failed: {0}")]
    TransportInitFailed(String),

    /// Non-success status, timeout, or any other request failure.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Response body was empty or had no `key=value` lines.
    #[error("response could not be parsed")]
    ParseFailed,

    /// A required key was absent from the response.
    #[error("field `{key}` missing from response")]
    FieldMissing { key: &'static str },

    /// A required key was present but not numeric.
    #[error("field `{key}` has invalid value {value:?}")]
    FieldFormatInvalid { key: &'static str, value: String },

    /// Operation is not allowed in the current connection state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The validation fetch during connect() failed; the session is disconnected.
    #[error("link check failed: {0}")]
    LinkFailed(#[source] Box<DeviceError>),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
