//! Core library for the weather report operator.
//!
//! This crate defines:
//! - The Open-Meteo request model, query encoding and tolerant series decoding
//! - An HTTP client for geocoding and current weather
//! - Weather report resources, their storage and the reconciliation loop
//! - Configuration handling
//!
//! It is used by `weather-operator`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod query;
pub mod reconcile;
pub mod resource;
pub mod series;
pub mod store;
pub mod vocabulary;

pub use client::{OpenMeteoClient, WeatherSource};
pub use config::Config;
pub use controller::{Backoff, Controller};
pub use error::{InvalidInput, ValidationErrors, WeatherError};
pub use model::{Coordinates, GeoLocation, GeoLocationOutput, WeatherReport};
pub use query::WeatherRequest;
pub use reconcile::{ReconcileError, Reconciler};
pub use resource::{ObjectKey, ReportResource, ReportSpec, ReportState, ReportStatus, Units};
pub use series::{SeriesError, WeatherSeries};
pub use store::{FileStore, MemoryStore, ReportStore, StoreError};
pub use vocabulary::Granularity;
