//! ==============================================================================
//! report.rs - weather-station view of a snapshot
//! ==============================================================================
//!
//! purpose:
//!     what an observatory host wants from a weather station in one struct:
//!     readings with "no data" sentinels filtered out, condition codes mapped
//!     to discrete states, and the roof-close decision.
//!
//! sentinels (as reported by the station):
//!     - wind speed / gust <= -1  -> no anemometer
//!     - humidity <= -1           -> no humidity sensor
//!     - dew point >= 100         -> not computed
//!
//! relationships:
//!     - built by: session.rs (report)
//!     - served by: main.rs (/api)
//!
//! ==============================================================================

use std::fmt;

use serde::Serialize;

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudCondition {
    Unknown,
    Clear,
    Cloudy,
    VeryCloudy,
}

impl From<i32> for CloudCondition {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Clear,
            2 => Self::Cloudy,
            3 => Self::VeryCloudy,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindCondition {
    Unknown,
    Calm,
    Windy,
    VeryWindy,
}

impl From<i32> for WindCondition {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Calm,
            2 => Self::Windy,
            3 => Self::VeryWindy,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RainCondition {
    Unknown,
    Dry,
    Wet,
    Rain,
}

impl From<i32> for RainCondition {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Dry,
            2 => Self::Wet,
            3 => Self::Rain,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaylightCondition {
    Unknown,
    Dark,
    Light,
    VeryLight,
}

impl From<i32> for DaylightCondition {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Dark,
            2 => Self::Light,
            3 => Self::VeryLight,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindSpeedUnit {
    Kph,
    Mps,
    Mph,
}

impl WindSpeedUnit {
    pub fn label(self) -> &'static str {
        match self {
            Self::Kph => "km/h",
            Self::Mps => "m/s",
            Self::Mph => "mph",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub firmware: String,
    pub seconds_since_good_data: u64,
    pub sky_temperature: f64,
    pub ambient_temperature: f64,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_speed_unit: WindSpeedUnit,
    pub humidity: Option<i32>,
    pub dew_point: Option<f64>,
    pub barometric_pressure: f64,
    pub cloud: CloudCondition,
    pub wind: WindCondition,
    pub rain: RainCondition,
    pub daylight: DaylightCondition,
    /// The station says unsafe (`safe=0`).
    pub roof_close: bool,
}

impl WeatherReport {
    pub fn new(snapshot: &Snapshot, elapsed_seconds: f64, unit: WindSpeedUnit) -> Self {
        Self {
            firmware: snapshot.firmware.clone(),
            seconds_since_good_data: elapsed_seconds.max(0.0).round() as u64,
            sky_temperature: snapshot.sky_temperature,
            ambient_temperature: snapshot.ambient_temperature,
            wind_speed: (snapshot.wind_speed > -1.0).then_some(snapshot.wind_speed),
            wind_gust: (snapshot.wind_gust > -1.0).then_some(snapshot.wind_gust),
            wind_speed_unit: unit,
            humidity: (snapshot.humidity > -1).then_some(snapshot.humidity),
            dew_point: (snapshot.dew_point < 100.0).then_some(snapshot.dew_point),
            barometric_pressure: snapshot.barometric_pressure,
            cloud: snapshot.cloud_condition.into(),
            wind: snapshot.wind_condition.into(),
            rain: snapshot.rain_condition.into(),
            daylight: snapshot.light_condition.into(),
            roof_close: snapshot.safe_condition == 0,
        }
    }
}

struct Reading<T>(Option<T>, &'static str);

impl fmt::Display for Reading<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.2} {}", self.1),
            None => f.write_str("N/A"),
        }
    }
}

impl fmt::Display for Reading<i32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v} {}", self.1),
            None => f.write_str("N/A"),
        }
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.wind_speed_unit.label();
        write!(
            f,
            "Sky: {:.2} °C | Ambient: {:.2} °C | Wind: {} (gust {}) | Humidity: {} | Dew point: {} | Pressure: {:.2} mbar | {} | age {}s",
            self.sky_temperature,
            self.ambient_temperature,
            Reading(self.wind_speed, unit),
            Reading(self.wind_gust, unit),
            Reading(self.humidity, "%"),
            Reading(self.dew_point, "°C"),
            self.barometric_pressure,
            if self.roof_close { "UNSAFE" } else { "safe" },
            self.seconds_since_good_data,
        )
    }
}
