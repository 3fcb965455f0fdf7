//! ==============================================================================
//! config.rs - Host Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - DeviceConfig: where the station address is persisted, and its default.
//!     - PollingConfig: poll cadence and how long a cycle waits for the lock.
//!     - TransportConfig: http timeouts.
//!     - LoggingConfig: tracing filter level.
//!     - ServerConfig: the json endpoint of the host binary.
//!
//! every section is optional; a missing key takes its default.
//!
//! ==============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::poller::PollerSettings;
use crate::settings::DEFAULT_ADDRESS;
use crate::transport::TransportSettings;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub device: DeviceConfig,
    pub polling: PollingConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceConfig {
    pub settings_file: PathBuf,
    pub default_address: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            settings_file: PathBuf::from("config").join("station.toml"),
            default_address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    pub lock_wait_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 5, lock_wait_ms: 500 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { connect_timeout_seconds: 3, request_timeout_seconds: 10 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_readings: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_readings: true }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { enabled: true, bind: "0.0.0.0:3000".to_string() }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        Ok(config)
    }

    /// Load with default fallback
    ///
    /// Runs before logging is set up, so it reports on stdout.
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: {:#}", e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_secs(self.polling.interval_seconds.max(1)),
            lock_wait: Duration::from_millis(self.polling.lock_wait_ms),
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            connect_timeout: Duration::from_secs(self.transport.connect_timeout_seconds),
            request_timeout: Duration::from_secs(self.transport.request_timeout_seconds),
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│         CLOUDWATCHER HOST CONFIG        │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Settings: {}", self.device.settings_file.display());
        println!("│ Poll Interval: {}s", self.polling.interval_seconds);
        println!("│ Connect Timeout: {}s", self.transport.connect_timeout_seconds);
        println!("│ Log Level: {}", self.logging.level);
        if self.server.enabled {
            println!("│ API: http://{}/api", self.server.bind);
        }
        println!("└─────────────────────────────────────────┘");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: HostConfig = toml::from_str("").unwrap();
        assert_eq!(config.polling.interval_seconds, 5);
        assert_eq!(config.transport.connect_timeout_seconds, 3);
        assert_eq!(config.device.default_address, "192.168.0.10");
        assert_eq!(config.poller_settings().interval, Duration::from_secs(5));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: HostConfig = toml::from_str(
            r#"
            [polling]
            interval_seconds = 10

            [logging]
            level = "debug"

            [server]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.polling.interval_seconds, 10);
        assert_eq!(config.polling.lock_wait_ms, 500);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.show_readings);
        assert!(!config.server.enabled);
        assert_eq!(config.server.bind, "0.0.0.0:3000");
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config: HostConfig = toml::from_str("[polling]\ninterval_seconds = 0").unwrap();
        assert_eq!(config.poller_settings().interval, Duration::from_secs(1));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = HostConfig::load("does/not/exist.toml").unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config file"));
    }

    #[test]
    fn timeouts_carry_into_transport() {
        let config: HostConfig =
            toml::from_str("[transport]\nconnect_timeout_seconds = 2\nrequest_timeout_seconds = 4").unwrap();
        let settings = config.transport_settings();
        assert_eq!(settings.connect_timeout, Duration::from_secs(2));
        assert_eq!(settings.request_timeout, Duration::from_secs(4));
    }
}
