//! Typed request model for the Open-Meteo forecast endpoint.

use chrono::NaiveDate;
use url::form_urlencoded;

use crate::{
    error::{InvalidInput, ValidationErrors},
    vocabulary::{Granularity, param},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindspeedUnit {
    Kmh,
    Ms,
    Mph,
    Kn,
}

impl WindspeedUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindspeedUnit::Kmh => "kmh",
            WindspeedUnit::Ms => "ms",
            WindspeedUnit::Mph => "mph",
            WindspeedUnit::Kn => "kn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecipitationUnit {
    Mm,
    Inch,
}

impl PrecipitationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecipitationUnit::Mm => "mm",
            PrecipitationUnit::Inch => "inch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    Iso8601,
    Unixtime,
}

impl TimeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFormat::Iso8601 => "iso8601",
            TimeFormat::Unixtime => "unixtime",
        }
    }
}

/// A single forecast request. Built right before a fetch and dropped after it.
///
/// Coordinates are explicit options: `None` means "not set" and fails
/// validation, while `Some(0.0)` is a real point on the equator or the prime
/// meridian.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,

    pub minutely_15: Vec<String>,
    pub hourly: Vec<String>,
    pub daily: Vec<String>,
    pub current: Vec<String>,

    pub temperature_unit: Option<TemperatureUnit>,
    pub windspeed_unit: Option<WindspeedUnit>,
    pub precipitation_unit: Option<PrecipitationUnit>,
    pub timeformat: Option<TimeFormat>,
    pub timezone: Option<String>,
    pub past_days: Option<u32>,
    pub forecast_days: Option<u32>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub end_date: Option<String>,
    pub api_key: Option<String>,
}

impl WeatherRequest {
    /// Request for the given coordinates with no variables selected yet.
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    pub fn with_variables<I, S>(mut self, granularity: Granularity, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables_mut(granularity)
            .extend(vars.into_iter().map(Into::into));
        self
    }

    pub fn with_current<I, S>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_variables(Granularity::Current, vars)
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn variables(&self, granularity: Granularity) -> &[String] {
        match granularity {
            Granularity::Minutely15 => &self.minutely_15,
            Granularity::Hourly => &self.hourly,
            Granularity::Daily => &self.daily,
            Granularity::Current => &self.current,
        }
    }

    fn variables_mut(&mut self, granularity: Granularity) -> &mut Vec<String> {
        match granularity {
            Granularity::Minutely15 => &mut self.minutely_15,
            Granularity::Hourly => &mut self.hourly,
            Granularity::Daily => &mut self.daily,
            Granularity::Current => &mut self.current,
        }
    }

    /// Collect every problem with this request. An empty list means valid.
    ///
    /// Errors come out in a fixed order: latitude, longitude, variable list
    /// presence, unsupported tokens per granularity (minutely_15, hourly,
    /// daily, current), then dates.
    pub fn validate(&self) -> Vec<InvalidInput> {
        let mut errs = Vec::new();

        check_coordinate(&mut errs, "Latitude", self.latitude, 90.0);
        check_coordinate(&mut errs, "Longitude", self.longitude, 180.0);

        if Granularity::ALL
            .iter()
            .all(|g| self.variables(*g).is_empty())
        {
            errs.push(InvalidInput::new(
                "Minutely15,Hourly,Daily,Current",
                None,
                "At least one of them must be set",
            ));
        }

        for granularity in Granularity::ALL {
            for token in self.variables(granularity) {
                if !granularity.supports(token) {
                    errs.push(InvalidInput::new(
                        granularity.argument(),
                        Some(token.clone()),
                        "Unsupported variable",
                    ));
                }
            }
        }

        check_date(&mut errs, "StartDate", self.start_date.as_deref());
        check_date(&mut errs, "EndDate", self.end_date.as_deref());

        errs
    }

    /// Encode the request as a URL query string, validating it first.
    ///
    /// Only provided fields are emitted. Numbers use the shortest decimal
    /// form that round-trips, so `52.52` stays `52.52` and `20.0` becomes `20`.
    pub fn to_query_string(&self) -> Result<String, ValidationErrors> {
        let errs = self.validate();
        if !errs.is_empty() {
            return Err(ValidationErrors(errs));
        }

        let mut query = form_urlencoded::Serializer::new(String::new());

        if let Some(latitude) = self.latitude {
            query.append_pair(param::LATITUDE, &latitude.to_string());
        }
        if let Some(longitude) = self.longitude {
            query.append_pair(param::LONGITUDE, &longitude.to_string());
        }
        if let Some(elevation) = self.elevation {
            query.append_pair(param::ELEVATION, &elevation.to_string());
        }

        for granularity in Granularity::ALL {
            let vars = self.variables(granularity);
            if !vars.is_empty() {
                query.append_pair(granularity.param(), &vars.join(","));
            }
        }

        if let Some(unit) = self.temperature_unit {
            query.append_pair(param::TEMPERATURE_UNIT, unit.as_str());
        }
        if let Some(unit) = self.windspeed_unit {
            query.append_pair(param::WINDSPEED_UNIT, unit.as_str());
        }
        if let Some(unit) = self.precipitation_unit {
            query.append_pair(param::PRECIPITATION_UNIT, unit.as_str());
        }
        if let Some(format) = self.timeformat {
            query.append_pair(param::TIMEFORMAT, format.as_str());
        }
        if let Some(timezone) = non_empty(&self.timezone) {
            query.append_pair(param::TIMEZONE, timezone);
        }
        if let Some(days) = self.past_days {
            query.append_pair(param::PAST_DAYS, &days.to_string());
        }
        if let Some(days) = self.forecast_days {
            query.append_pair(param::FORECAST_DAYS, &days.to_string());
        }
        if let Some(date) = non_empty(&self.start_date) {
            query.append_pair(param::START_DATE, date);
        }
        if let Some(date) = non_empty(&self.end_date) {
            query.append_pair(param::END_DATE, date);
        }
        if let Some(key) = non_empty(&self.api_key) {
            query.append_pair(param::APIKEY, key);
        }

        Ok(query.finish())
    }
}

fn check_coordinate(errs: &mut Vec<InvalidInput>, argument: &str, value: Option<f64>, bound: f64) {
    match value {
        None => errs.push(InvalidInput::new(argument, None, "Must be set")),
        Some(v) if !v.is_finite() || v.abs() > bound => errs.push(InvalidInput::new(
            argument,
            Some(v.to_string()),
            format!("Must be between -{bound} and {bound}"),
        )),
        Some(_) => {}
    }
}

fn check_date(errs: &mut Vec<InvalidInput>, argument: &str, value: Option<&str>) {
    let Some(date) = value.filter(|d| !d.is_empty()) else {
        return;
    };
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        errs.push(InvalidInput::new(
            argument,
            Some(date.to_string()),
            "Must be a date formatted as YYYY-MM-DD",
        ));
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
