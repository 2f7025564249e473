use indexmap::IndexMap;
use serde::Deserialize;

use crate::{error::WeatherError, series::WeatherSeries, vocabulary::Granularity};

/// Decoded body of a forecast response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeatherReport {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i64,
    pub timezone: String,
    pub timezone_abbreviation: String,

    pub current: Option<WeatherSeries>,
    pub current_units: IndexMap<String, String>,
    pub hourly: Option<WeatherSeries>,
    pub hourly_units: IndexMap<String, String>,
    pub daily: Option<WeatherSeries>,
    pub daily_units: IndexMap<String, String>,
    pub minutely_15: Option<WeatherSeries>,
    pub minutely_15_units: IndexMap<String, String>,
}

impl WeatherReport {
    pub fn series(&self, granularity: Granularity) -> Option<&WeatherSeries> {
        match granularity {
            Granularity::Minutely15 => self.minutely_15.as_ref(),
            Granularity::Hourly => self.hourly.as_ref(),
            Granularity::Daily => self.daily.as_ref(),
            Granularity::Current => self.current.as_ref(),
        }
    }

    pub fn units(&self, granularity: Granularity) -> &IndexMap<String, String> {
        match granularity {
            Granularity::Minutely15 => &self.minutely_15_units,
            Granularity::Hourly => &self.hourly_units,
            Granularity::Daily => &self.daily_units,
            Granularity::Current => &self.current_units,
        }
    }

    /// First reading of a `current` variable. A `null` reading counts as missing.
    pub fn current_value(&self, variable: &str) -> Result<f64, WeatherError> {
        self.current
            .as_ref()
            .and_then(|series| series.first(variable))
            .ok_or_else(|| WeatherError::MissingVariable(variable.to_string()))
    }
}

/// One geocoding candidate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeoLocation {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub feature_code: String,
    pub country_code: String,
    pub admin1_id: i64,
    pub admin2_id: i64,
    pub admin3_id: i64,
    pub admin4_id: i64,
    pub timezone: String,
    pub population: i64,
    pub postcodes: Vec<String>,
    pub country_id: i64,
    pub country: String,
    pub admin1: String,
    pub admin2: String,
    pub admin3: String,
    pub admin4: String,
}

impl GeoLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Ranked geocoding results. Open-Meteo omits `results` when nothing matches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeoLocationOutput {
    pub results: Vec<GeoLocation>,
    pub generationtime_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}
