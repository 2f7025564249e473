//! Tolerant decoding of Open-Meteo time series.
//!
//! The API sends arrays for forecast granularities but often bare scalars for
//! `current`. Every field is decoded the same way regardless of its name: an
//! array is taken as-is, a scalar becomes a one-element sequence, anything
//! else is an error naming the field. `null` readings are gaps in the data
//! and decode to `None`.

use std::fmt;

use indexmap::IndexMap;
use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, Visitor},
};
use serde_json::Value;
use thiserror::Error;

pub const TIME_FIELD: &str = "time";

/// Time-aligned readings for one granularity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSeries {
    pub time: Vec<String>,
    /// Variable name to readings, index-aligned with `time`, in wire order.
    /// `None` marks a gap.
    pub values: IndexMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' {reason}: {raw}")]
pub struct SeriesError {
    pub field: String,
    /// The JSON that could not be coerced.
    pub raw: String,
    pub reason: String,
}

impl SeriesError {
    fn new(field: &str, raw: &Value, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

impl WeatherSeries {
    /// Build a series from raw `(name, json)` entries.
    pub fn from_fields<I>(fields: I) -> Result<Self, SeriesError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut raw: IndexMap<String, Value> = fields.into_iter().collect();

        let time_raw = raw.shift_remove(TIME_FIELD).ok_or_else(|| {
            SeriesError::new(TIME_FIELD, &Value::Null, "is required")
        })?;
        let time = OneOrMany::<String>::deserialize(&time_raw)
            .map(OneOrMany::into_vec)
            .map_err(|_| {
                SeriesError::new(TIME_FIELD, &time_raw, "is neither a string nor an array of strings")
            })?;

        let mut values = IndexMap::with_capacity(raw.len());
        for (field, value) in raw {
            let readings = OneOrMany::<Option<f64>>::deserialize(&value)
                .map(OneOrMany::into_vec)
                .map_err(|_| {
                    SeriesError::new(&field, &value, "is neither a number nor an array of numbers")
                })?;

            if readings.len() != time.len() && readings.len() != 1 {
                return Err(SeriesError::new(
                    &field,
                    &value,
                    format!(
                        "has {} readings but the series has {} timestamps",
                        readings.len(),
                        time.len()
                    ),
                ));
            }
            values.insert(field, readings);
        }

        Ok(Self { time, values })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn get(&self, variable: &str) -> Option<&[Option<f64>]> {
        self.values.get(variable).map(Vec::as_slice)
    }

    /// The first reading of a variable, which for `current` is the only one.
    /// A gap reads as `None`.
    pub fn first(&self, variable: &str) -> Option<f64> {
        self.get(variable)
            .and_then(|readings| readings.first().copied())
            .flatten()
    }
}

impl<'de> Deserialize<'de> for WeatherSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(SeriesVisitor)
    }
}

struct SeriesVisitor;

impl<'de> Visitor<'de> for SeriesVisitor {
    type Value = WeatherSeries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of time and variable readings")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, Value>()? {
            fields.push(entry);
        }
        WeatherSeries::from_fields(fields).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<WeatherSeries, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn array_form() {
        let series = decode(r#"{"time": ["2024-01-01T00:00"], "temperature_2m": [21.5]}"#).unwrap();

        assert_eq!(series.time, vec!["2024-01-01T00:00"]);
        assert_eq!(series.get("temperature_2m"), Some(&[Some(21.5)][..]));
    }

    #[test]
    fn scalar_form_normalizes_to_array_form() {
        let scalar = decode(r#"{"time": "2024-01-01T00:00", "temperature_2m": 21.5}"#).unwrap();
        let array = decode(r#"{"time": ["2024-01-01T00:00"], "temperature_2m": [21.5]}"#).unwrap();

        assert_eq!(scalar, array);
        assert_eq!(scalar.len(), 1);
    }

    #[test]
    fn integers_decode_as_readings() {
        let series = decode(r#"{"time": "2024-01-01T00:00", "interval": 900, "is_day": 1}"#).unwrap();

        assert_eq!(series.first("interval"), Some(900.0));
        assert_eq!(series.first("is_day"), Some(1.0));
    }

    #[test]
    fn unknown_variables_decode_in_wire_order() {
        let series = decode(
            r#"{"zeta": [1, 2], "time": ["a", "b"], "alpha": [3, 4], "mid": 5}"#,
        )
        .unwrap();

        let keys: Vec<_> = series.values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(series.get("mid"), Some(&[Some(5.0)][..]));
    }

    #[test]
    fn null_readings_are_gaps() {
        let series = decode(r#"{"time": ["a", "b"], "snow_depth": [0.1, null]}"#).unwrap();

        assert_eq!(series.get("snow_depth"), Some(&[Some(0.1), None][..]));
        assert_eq!(series.first("snow_depth"), Some(0.1));
    }

    #[test]
    fn bare_null_is_a_single_gap() {
        let series = decode(r#"{"time": "a", "visibility": null, "temperature_2m": 3.5}"#).unwrap();

        assert_eq!(series.get("visibility"), Some(&[None][..]));
        assert_eq!(series.first("visibility"), None);
        assert_eq!(series.first("temperature_2m"), Some(3.5));
    }

    #[test]
    fn object_value_is_an_error_naming_the_field() {
        let err = decode(r#"{"time": ["a"], "temperature_2m": {"value": 1}}"#).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("'temperature_2m'"), "{msg}");
        assert!(msg.contains(r#"{"value":1}"#), "{msg}");
    }

    #[test]
    fn numeric_time_is_an_error() {
        let err = decode(r#"{"time": 1704067200, "temperature_2m": 1.0}"#).unwrap_err();
        assert!(err.to_string().contains("'time'"));
    }

    #[test]
    fn missing_time_is_an_error() {
        let err = decode(r#"{"temperature_2m": [1.0]}"#).unwrap_err();
        assert!(err.to_string().contains("'time' is required"));
    }

    #[test]
    fn misaligned_lengths_are_an_error() {
        let err = decode(r#"{"time": ["a", "b", "c"], "rain": [0.1, 0.2]}"#).unwrap_err();
        assert!(err.to_string().contains("has 2 readings but the series has 3 timestamps"));
    }

    #[test]
    fn from_fields_reports_structured_error() {
        let err = WeatherSeries::from_fields([
            ("time".to_string(), Value::from("2024-01-01T00:00")),
            ("rain".to_string(), Value::from("heavy")),
        ])
        .unwrap_err();

        assert_eq!(err.field, "rain");
        assert_eq!(err.raw, r#""heavy""#);
    }
}
