//! ==============================================================================
//! snapshot.rs - latest station readings
//! ==============================================================================
//!
//! purpose:
//!     holds one value per sensor field in its own atomic cell so getters never
//!     wait on a fetch in progress.
//!
//! commit order:
//!     fields are decoded and stored one at a time in the order of the table
//!     below. a decode failure stops the pass: fields already stored keep their
//!     new values, fields after the failing key keep their previous values.
//!     there is no single commit point, and callers may see a mix of two fetch
//!     cycles across *different* fields. a single field is never torn.
//!
//! ```text
//!         cwinfo       -> firmware          (string)
//!         cloudsSafe   -> cloud condition   (int)
//!         clouds       -> sky temperature   (double)
//!         temp         -> ambient temp      (double)
//!         wind         -> wind speed        (double)
//!         windSafe     -> wind condition    (int)
//!         gust         -> wind gust         (double)
//!         rainSafe     -> rain condition    (int)
//!         lightSafe    -> light condition   (int)
//!         safe         -> overall safety    (int)
//!         hum          -> humidity %        (int)
//!         humSafe      -> humidity cond.    (int)
//!         dewp         -> dew point         (double)
//!         relpress     -> pressure          (double)
//!         pressureSafe -> pressure cond.    (int)
//! ```
//!
//! relationships:
//!     - written by: poller.rs (under the session lock)
//!     - read by: session.rs getters, report.rs
//!
//! ==============================================================================

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use crate::error::{DeviceError, Result};
use crate::parser::FieldMap;

/// Prefix the station's `cwinfo` value is reported under.
pub const FIRMWARE_PREFIX: &str = "Solo Cloudwatcher ";

// ==============================================================================
// atomic f64 cell
// ==============================================================================

struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

// ==============================================================================
// plain copy for callers
// ==============================================================================

/// A point-in-time copy of every field, read cell by cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub firmware: String,
    pub cloud_condition: i32,
    pub sky_temperature: f64,
    pub ambient_temperature: f64,
    pub wind_speed: f64,
    pub wind_condition: i32,
    pub wind_gust: f64,
    pub rain_condition: i32,
    pub light_condition: i32,
    pub safe_condition: i32,
    pub humidity: i32,
    pub humidity_condition: i32,
    pub dew_point: f64,
    pub barometric_pressure: f64,
    pub pressure_condition: i32,
}

// ==============================================================================
// store
// ==============================================================================

pub struct SnapshotStore {
    firmware: RwLock<String>,
    cloud_condition: AtomicI32,
    sky_temperature: AtomicF64,
    ambient_temperature: AtomicF64,
    wind_speed: AtomicF64,
    wind_condition: AtomicI32,
    wind_gust: AtomicF64,
    rain_condition: AtomicI32,
    light_condition: AtomicI32,
    safe_condition: AtomicI32,
    humidity: AtomicI32,
    humidity_condition: AtomicI32,
    dew_point: AtomicF64,
    barometric_pressure: AtomicF64,
    pressure_condition: AtomicI32,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            firmware: RwLock::new(String::new()),
            cloud_condition: AtomicI32::new(0),
            sky_temperature: AtomicF64::new(0.0),
            ambient_temperature: AtomicF64::new(0.0),
            wind_speed: AtomicF64::new(0.0),
            wind_condition: AtomicI32::new(0),
            wind_gust: AtomicF64::new(0.0),
            rain_condition: AtomicI32::new(0),
            light_condition: AtomicI32::new(0),
            safe_condition: AtomicI32::new(0),
            humidity: AtomicI32::new(0),
            humidity_condition: AtomicI32::new(0),
            dew_point: AtomicF64::new(0.0),
            barometric_pressure: AtomicF64::new(0.0),
            pressure_condition: AtomicI32::new(0),
        }
    }

    /// Decode `fields` and store them in table order.
    ///
    /// On error the store is left partially updated; see the module docs.
    pub fn commit(&self, fields: &FieldMap) -> Result<()> {
        let cwinfo = text_field(fields, "cwinfo")?;
        *self.firmware.write().unwrap_or_else(PoisonError::into_inner) =
            format!("{FIRMWARE_PREFIX}{cwinfo}");

        store_i32(&self.cloud_condition, int_field(fields, "cloudsSafe")?);
        self.sky_temperature.store(double_field(fields, "clouds")?);
        self.ambient_temperature.store(double_field(fields, "temp")?);

        self.wind_speed.store(double_field(fields, "wind")?);
        store_i32(&self.wind_condition, int_field(fields, "windSafe")?);
        self.wind_gust.store(double_field(fields, "gust")?);
        store_i32(&self.rain_condition, int_field(fields, "rainSafe")?);
        store_i32(&self.light_condition, int_field(fields, "lightSafe")?);
        store_i32(&self.safe_condition, int_field(fields, "safe")?);

        store_i32(&self.humidity, int_field(fields, "hum")?);
        store_i32(&self.humidity_condition, int_field(fields, "humSafe")?);
        self.dew_point.store(double_field(fields, "dewp")?);

        self.barometric_pressure.store(double_field(fields, "relpress")?);
        store_i32(&self.pressure_condition, int_field(fields, "pressureSafe")?);

        Ok(())
    }

    pub fn firmware(&self) -> String {
        self.firmware.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn cloud_condition(&self) -> i32 {
        self.cloud_condition.load(Ordering::Acquire)
    }

    pub fn sky_temperature(&self) -> f64 {
        self.sky_temperature.load()
    }

    pub fn ambient_temperature(&self) -> f64 {
        self.ambient_temperature.load()
    }

    pub fn wind_speed(&self) -> f64 {
        self.wind_speed.load()
    }

    pub fn wind_condition(&self) -> i32 {
        self.wind_condition.load(Ordering::Acquire)
    }

    pub fn wind_gust(&self) -> f64 {
        self.wind_gust.load()
    }

    pub fn rain_condition(&self) -> i32 {
        self.rain_condition.load(Ordering::Acquire)
    }

    pub fn light_condition(&self) -> i32 {
        self.light_condition.load(Ordering::Acquire)
    }

    pub fn safe_condition(&self) -> i32 {
        self.safe_condition.load(Ordering::Acquire)
    }

    pub fn humidity(&self) -> i32 {
        self.humidity.load(Ordering::Acquire)
    }

    pub fn humidity_condition(&self) -> i32 {
        self.humidity_condition.load(Ordering::Acquire)
    }

    pub fn dew_point(&self) -> f64 {
        self.dew_point.load()
    }

    pub fn barometric_pressure(&self) -> f64 {
        self.barometric_pressure.load()
    }

    pub fn pressure_condition(&self) -> i32 {
        self.pressure_condition.load(Ordering::Acquire)
    }

    /// Copy every cell. Not a consistent cut if a commit is running.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            firmware: self.firmware(),
            cloud_condition: self.cloud_condition(),
            sky_temperature: self.sky_temperature(),
            ambient_temperature: self.ambient_temperature(),
            wind_speed: self.wind_speed(),
            wind_condition: self.wind_condition(),
            wind_gust: self.wind_gust(),
            rain_condition: self.rain_condition(),
            light_condition: self.light_condition(),
            safe_condition: self.safe_condition(),
            humidity: self.humidity(),
            humidity_condition: self.humidity_condition(),
            dew_point: self.dew_point(),
            barometric_pressure: self.barometric_pressure(),
            pressure_condition: self.pressure_condition(),
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

// ==============================================================================
// field decoding
// ==============================================================================

fn store_i32(cell: &AtomicI32, value: i32) {
    cell.store(value, Ordering::Release);
}

fn text_field<'a>(fields: &'a FieldMap, key: &'static str) -> Result<&'a str> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or(DeviceError::FieldMissing { key })
}

/// Integer codes occasionally come back as `1.0`; those truncate toward zero.
fn int_field(fields: &FieldMap, key: &'static str) -> Result<i32> {
    let raw = text_field(fields, key)?;
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i32>() {
        return Ok(value);
    }
    match trimmed.parse::<f64>().map(f64::trunc) {
        Ok(value) if (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&value) => Ok(value as i32),
        _ => Err(DeviceError::FieldFormatInvalid { key, value: raw.to_string() }),
    }
}

fn double_field(fields: &FieldMap, key: &'static str) -> Result<f64> {
    let raw = text_field(fields, key)?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DeviceError::FieldFormatInvalid { key, value: raw.to_string() })
}
