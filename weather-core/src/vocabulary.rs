//! Static lookup tables for the Open-Meteo forecast API.
//!
//! Each [`Granularity`] has a fixed vocabulary of variable tokens. The API
//! accepts both the older concatenated names (`windspeed_10m`) and the newer
//! underscored ones (`wind_speed_10m`), so both spellings are listed.

use std::fmt;

/// Query parameter names understood by the forecast endpoint.
pub mod param {
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const ELEVATION: &str = "elevation";
    pub const MINUTELY_15: &str = "minutely_15";
    pub const HOURLY: &str = "hourly";
    pub const DAILY: &str = "daily";
    pub const CURRENT: &str = "current";
    pub const TEMPERATURE_UNIT: &str = "temperature_unit";
    pub const WINDSPEED_UNIT: &str = "windspeed_unit";
    pub const PRECIPITATION_UNIT: &str = "precipitation_unit";
    pub const TIMEFORMAT: &str = "timeformat";
    pub const TIMEZONE: &str = "timezone";
    pub const PAST_DAYS: &str = "past_days";
    pub const FORECAST_DAYS: &str = "forecast_days";
    pub const START_DATE: &str = "start_date";
    pub const END_DATE: &str = "end_date";
    pub const APIKEY: &str = "apikey";
}

/// Variables requested by the report reconciler.
pub mod current {
    pub const TEMPERATURE_2M: &str = "temperature_2m";
    pub const APPARENT_TEMPERATURE: &str = "apparent_temperature";
    pub const RELATIVEHUMIDITY_2M: &str = "relativehumidity_2m";
    pub const WINDSPEED_10M: &str = "windspeed_10m";
    pub const WINDDIRECTION_10M: &str = "winddirection_10m";
}

const CURRENT_VARS: &[&str] = &[
    "temperature_2m",
    "relativehumidity_2m",
    "relative_humidity_2m",
    "apparent_temperature",
    "is_day",
    "precipitation",
    "rain",
    "showers",
    "snowfall",
    "weathercode",
    "weather_code",
    "cloudcover",
    "cloud_cover",
    "pressure_msl",
    "surface_pressure",
    "windspeed_10m",
    "wind_speed_10m",
    "winddirection_10m",
    "wind_direction_10m",
    "windgusts_10m",
    "wind_gusts_10m",
];

const HOURLY_VARS: &[&str] = &[
    "temperature_2m",
    "relativehumidity_2m",
    "relative_humidity_2m",
    "dewpoint_2m",
    "dew_point_2m",
    "apparent_temperature",
    "precipitation_probability",
    "precipitation",
    "rain",
    "showers",
    "snowfall",
    "snow_depth",
    "weathercode",
    "weather_code",
    "pressure_msl",
    "surface_pressure",
    "cloudcover",
    "cloud_cover",
    "cloudcover_low",
    "cloud_cover_low",
    "cloudcover_mid",
    "cloud_cover_mid",
    "cloudcover_high",
    "cloud_cover_high",
    "visibility",
    "evapotranspiration",
    "et0_fao_evapotranspiration",
    "vapor_pressure_deficit",
    "windspeed_10m",
    "wind_speed_10m",
    "windspeed_80m",
    "wind_speed_80m",
    "windspeed_120m",
    "wind_speed_120m",
    "windspeed_180m",
    "wind_speed_180m",
    "winddirection_10m",
    "wind_direction_10m",
    "winddirection_80m",
    "wind_direction_80m",
    "winddirection_120m",
    "wind_direction_120m",
    "winddirection_180m",
    "wind_direction_180m",
    "windgusts_10m",
    "wind_gusts_10m",
    "temperature_80m",
    "temperature_120m",
    "temperature_180m",
    "soil_temperature_0cm",
    "soil_temperature_6cm",
    "soil_temperature_18cm",
    "soil_temperature_54cm",
    "soil_moisture_0_1cm",
    "soil_moisture_1_3cm",
    "soil_moisture_3_9cm",
    "soil_moisture_9_27cm",
    "soil_moisture_27_81cm",
    "uv_index",
    "uv_index_clear_sky",
    "is_day",
    "cape",
    "freezinglevel_height",
    "freezing_level_height",
    "sunshine_duration",
    "shortwave_radiation",
    "direct_radiation",
    "diffuse_radiation",
    "direct_normal_irradiance",
    "terrestrial_radiation",
];

const DAILY_VARS: &[&str] = &[
    "weathercode",
    "weather_code",
    "temperature_2m_max",
    "temperature_2m_min",
    "apparent_temperature_max",
    "apparent_temperature_min",
    "sunrise",
    "sunset",
    "daylight_duration",
    "sunshine_duration",
    "uv_index_max",
    "uv_index_clear_sky_max",
    "precipitation_sum",
    "rain_sum",
    "showers_sum",
    "snowfall_sum",
    "precipitation_hours",
    "precipitation_probability_max",
    "windspeed_10m_max",
    "wind_speed_10m_max",
    "windgusts_10m_max",
    "wind_gusts_10m_max",
    "winddirection_10m_dominant",
    "wind_direction_10m_dominant",
    "shortwave_radiation_sum",
    "et0_fao_evapotranspiration",
];

const MINUTELY_15_VARS: &[&str] = &[
    "temperature_2m",
    "relativehumidity_2m",
    "relative_humidity_2m",
    "dewpoint_2m",
    "dew_point_2m",
    "apparent_temperature",
    "precipitation",
    "rain",
    "snowfall",
    "snowfall_height",
    "freezinglevel_height",
    "freezing_level_height",
    "weathercode",
    "weather_code",
    "windspeed_10m",
    "wind_speed_10m",
    "windspeed_80m",
    "wind_speed_80m",
    "winddirection_10m",
    "wind_direction_10m",
    "winddirection_80m",
    "wind_direction_80m",
    "windgusts_10m",
    "wind_gusts_10m",
    "visibility",
    "cape",
    "lightning_potential",
    "is_day",
    "sunshine_duration",
    "shortwave_radiation",
    "direct_radiation",
    "diffuse_radiation",
    "direct_normal_irradiance",
    "terrestrial_radiation",
];

/// Measurement granularity of a requested or returned series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Minutely15,
    Hourly,
    Daily,
    Current,
}

impl Granularity {
    /// Validation and encoding order.
    pub const ALL: [Granularity; 4] = [
        Granularity::Minutely15,
        Granularity::Hourly,
        Granularity::Daily,
        Granularity::Current,
    ];

    /// Query parameter (and response field) name.
    pub fn param(&self) -> &'static str {
        match self {
            Granularity::Minutely15 => param::MINUTELY_15,
            Granularity::Hourly => param::HOURLY,
            Granularity::Daily => param::DAILY,
            Granularity::Current => param::CURRENT,
        }
    }

    /// Argument name used in validation errors.
    pub fn argument(&self) -> &'static str {
        match self {
            Granularity::Minutely15 => "Minutely15",
            Granularity::Hourly => "Hourly",
            Granularity::Daily => "Daily",
            Granularity::Current => "Current",
        }
    }

    pub fn vocabulary(&self) -> &'static [&'static str] {
        match self {
            Granularity::Minutely15 => MINUTELY_15_VARS,
            Granularity::Hourly => HOURLY_VARS,
            Granularity::Daily => DAILY_VARS,
            Granularity::Current => CURRENT_VARS,
        }
    }

    pub fn supports(&self, token: &str) -> bool {
        self.vocabulary().contains(&token)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param())
    }
}
