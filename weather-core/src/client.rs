use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::{
    Config,
    error::WeatherError,
    model::{Coordinates, GeoLocationOutput, WeatherReport},
    query::WeatherRequest,
};

pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("weather-operator/", env!("CARGO_PKG_VERSION"));

/// Where the reconciler gets coordinates and observations from.
///
/// Each call performs exactly one outbound request and never retries.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Coordinates of the best-ranked place matching `name`.
    async fn resolve_location(&self, name: &str) -> Result<Coordinates, WeatherError>;

    async fn fetch_weather_report(
        &self,
        request: &WeatherRequest,
    ) -> Result<WeatherReport, WeatherError>;
}

/// HTTP client for the Open-Meteo geocoding and forecast endpoints.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    geocoding_url: Url,
    forecast_url: Url,
}

impl OpenMeteoClient {
    pub fn new(timeout: Duration) -> Result<Self, WeatherError> {
        Self::with_endpoints(GEOCODING_URL, FORECAST_URL, timeout)
    }

    pub fn with_endpoints(
        geocoding_url: &str,
        forecast_url: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let geocoding_url = parse_endpoint(geocoding_url)?;
        let forecast_url = parse_endpoint(forecast_url)?;

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            geocoding_url,
            forecast_url,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        Self::with_endpoints(
            &config.geocoding_url,
            &config.forecast_url,
            config.request_timeout(),
        )
    }

    /// Up to `count` ranked candidates for a place name.
    pub async fn search_locations(
        &self,
        name: &str,
        count: u32,
    ) -> Result<GeoLocationOutput, WeatherError> {
        let mut url = self.geocoding_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("name", name)
            .append_pair("count", &count.to_string());

        debug!(name, count, "Searching location");
        let body = self.get(url).await?;

        serde_json::from_str(&body).map_err(|source| WeatherError::Decode {
            context: "geocoding response",
            source,
        })
    }

    async fn get(&self, url: Url) -> Result<String, WeatherError> {
        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            debug!(%status, body = %truncate_body(&body), "Open-Meteo returned an error");
            return Err(WeatherError::Api {
                status,
                body: api_reason(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn resolve_location(&self, name: &str) -> Result<Coordinates, WeatherError> {
        let output = self.search_locations(name, 1).await?;

        let location = output
            .results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::NotFound(name.to_string()))?;

        info!(
            name,
            resolved = %location.name,
            country = %location.country,
            latitude = location.latitude,
            longitude = location.longitude,
            "Resolved location"
        );
        Ok(location.coordinates())
    }

    async fn fetch_weather_report(
        &self,
        request: &WeatherRequest,
    ) -> Result<WeatherReport, WeatherError> {
        let query = request.to_query_string()?;

        let mut url = self.forecast_url.clone();
        url.set_query(Some(&query));

        // The URL may carry the API key, so log the request fields instead.
        debug!(
            latitude = ?request.latitude,
            longitude = ?request.longitude,
            current = ?request.current,
            "Fetching weather report"
        );
        let body = self.get(url).await?;

        serde_json::from_str(&body).map_err(|source| WeatherError::Decode {
            context: "forecast response",
            source,
        })
    }
}

fn parse_endpoint(url: &str) -> Result<Url, WeatherError> {
    Url::parse(url).map_err(|source| WeatherError::Endpoint {
        url: url.to_string(),
        source,
    })
}

#[derive(Deserialize)]
struct ApiErrorBody {
    reason: String,
}

/// Open-Meteo reports failures as `{"error": true, "reason": "..."}`.
fn api_reason(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|err| err.reason)
        .unwrap_or_else(|_| truncate_body(body))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
