//! settings.rs - persisted station address
//!
//! the address is the only state that survives a restart. it lives in a small
//! toml key-value file:
//!
//! ```toml
//! [solo_cloudwatcher]
//! ip_address = "192.168.0.10"
//! ```
//!
//! other sections in the same file are left untouched on write.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::warn;

pub const SETTINGS_SECTION: &str = "solo_cloudwatcher";
pub const ADDRESS_KEY: &str = "ip_address";
pub const DEFAULT_ADDRESS: &str = "192.168.0.10";

pub struct AddressStore {
    path: PathBuf,
}

impl AddressStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored address, or `default` when the file or key is absent or unreadable.
    pub fn read_address(&self, default: &str) -> String {
        match self.load_table() {
            Ok(table) => table
                .get(SETTINGS_SECTION)
                .and_then(|section| section.get(ADDRESS_KEY))
                .and_then(|value| value.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| default.to_string()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "settings unreadable, using default address");
                default.to_string()
            }
        }
    }

    pub fn write_address(&self, address: &str) -> Result<()> {
        let mut table = self.load_table()?;
        let section = table
            .entry(SETTINGS_SECTION)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .ok_or_else(|| anyhow!("`{SETTINGS_SECTION}` in {} is not a table", self.path.display()))?;
        section.insert(ADDRESS_KEY.to_string(), toml::Value::String(address.to_string()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = toml::to_string(&table).context("failed to encode settings")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    /// Missing file reads as an empty table.
    fn load_table(&self) -> Result<toml::Table> {
        if !self.path.exists() {
            return Ok(toml::Table::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        content
            .parse::<toml::Table>()
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }
}
