//! Mock Open-Meteo endpoints shared by the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use weather_core::{
    MemoryStore, ObjectKey, OpenMeteoClient, ReportResource, ReportSpec, ReportStore, StoreError,
    Units,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GEOCODING_PATH: &str = "/v1/search";
pub const FORECAST_PATH: &str = "/v1/forecast";

pub const BERLIN_CURRENT: &str =
    "relativehumidity_2m,winddirection_10m,windspeed_10m,temperature_2m,apparent_temperature";

pub fn client_for(server: &MockServer) -> OpenMeteoClient {
    client_with_timeout(server, Duration::from_secs(5))
}

pub fn client_with_timeout(server: &MockServer, timeout: Duration) -> OpenMeteoClient {
    OpenMeteoClient::with_endpoints(
        &format!("{}{GEOCODING_PATH}", server.uri()),
        &format!("{}{FORECAST_PATH}", server.uri()),
        timeout,
    )
    .unwrap()
}

/// Geocoding answers `name` with the given coordinates.
pub async fn mount_location(server: &MockServer, name: &str, latitude: f64, longitude: f64) {
    Mock::given(method("GET"))
        .and(path(GEOCODING_PATH))
        .and(query_param("name", name))
        .and(query_param("count", "1"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": 2950159,
                "name": name,
                "latitude": latitude,
                "longitude": longitude,
                "country": "Germany"
            }],
            "generationtime_ms": 0.81
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Geocoding finds nothing for `name`.
pub async fn mount_no_location(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(GEOCODING_PATH))
        .and(query_param("name", name))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "generationtime_ms": 0.42 })),
        )
        .mount(server)
        .await;
}

/// Forecast responds with `current` for any request.
pub async fn mount_current(server: &MockServer, current: Value) {
    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(current)))
        .mount(server)
        .await;
}

pub fn forecast_body(current: Value) -> Value {
    json!({
        "latitude": 52.52,
        "longitude": 13.419998,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "timezone_abbreviation": "GMT",
        "elevation": 38.0,
        "current_units": {
            "time": "iso8601",
            "interval": "seconds",
            "relativehumidity_2m": "%",
            "winddirection_10m": "°",
            "windspeed_10m": "km/h",
            "temperature_2m": "°C",
            "apparent_temperature": "°C"
        },
        "current": current
    })
}

pub fn berlin_current() -> Value {
    json!({
        "time": ["2024-01-01T12:00"],
        "relativehumidity_2m": [55],
        "winddirection_10m": [180],
        "windspeed_10m": [10],
        "temperature_2m": [20],
        "apparent_temperature": [19]
    })
}

pub async fn store_with_report(name: &str, location: &str) -> (MemoryStore, ObjectKey) {
    let store = MemoryStore::new();
    let key = ObjectKey::new("default", name);
    store
        .apply(
            key.clone(),
            ReportSpec {
                location: location.into(),
                units: Units::Metric,
            },
        )
        .await
        .unwrap();
    (store, key)
}

/// A store whose status writes always fail.
#[derive(Debug, Default)]
pub struct ReadOnlyStore(pub MemoryStore);

#[async_trait]
impl ReportStore for ReadOnlyStore {
    async fn get(&self, key: &ObjectKey) -> Result<ReportResource, StoreError> {
        self.0.get(key).await
    }

    async fn update_status(&self, _report: &ReportResource) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: "status".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    async fn list(&self) -> Result<Vec<ObjectKey>, StoreError> {
        self.0.list().await
    }

    async fn apply(&self, key: ObjectKey, spec: ReportSpec) -> Result<ReportResource, StoreError> {
        self.0.apply(key, spec).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        self.0.delete(key).await
    }
}
