//! One reconciliation attempt: resolve the location, fetch current weather,
//! write the outcome into the report status.
//!
//! ```text
//! Pending -> Resolving -> Fetching -> Success
//!                |            |
//!                +------------+-----> Failed
//! ```
//!
//! Both terminal states are persisted before the attempt returns. Attempts
//! keep no memory of each other.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
    client::WeatherSource,
    error::WeatherError,
    model::{Coordinates, WeatherReport},
    query::WeatherRequest,
    resource::{ObjectKey, ReportResource, ReportState, ReportStatus},
    store::{ReportStore, StoreError},
    vocabulary::current,
};

/// Current variables requested for every report, in request order.
pub const CURRENT_VARIABLES: [&str; 5] = [
    current::RELATIVEHUMIDITY_2M,
    current::WINDDIRECTION_10M,
    current::WINDSPEED_10M,
    current::TEMPERATURE_2M,
    current::APPARENT_TEMPERATURE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Resolving,
    Fetching,
    Success,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Pending => "pending",
            Phase::Resolving => "resolving",
            Phase::Fetching => "fetching",
            Phase::Success => "success",
            Phase::Failed => "failed",
        })
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The report could not be read; no status was written.
    #[error("Can't retrieve report '{key}': {source}")]
    Load {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    /// Resolution or fetch failed; the report was marked `Failed`.
    #[error(transparent)]
    Weather(#[from] WeatherError),

    /// Writing the status failed. On a failure path this replaces the
    /// weather error that caused it.
    #[error("Error updating status of '{key}': {source}")]
    Persist {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    /// Whether retrying without changing the report could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcileError::Weather(err) => err.is_transient(),
            ReconcileError::Load { source, .. } | ReconcileError::Persist { source, .. } => {
                !matches!(source, StoreError::NotFound(_))
            }
        }
    }
}

/// The five readings written into a successful status.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentObservation {
    pub temperature: f64,
    pub feels_like: f64,
    pub relative_humidity: f64,
    pub windspeed: f64,
    pub winddirection: f64,
    /// Unit of `temperature`, e.g. `°C`, when the response carried one.
    pub unit: Option<String>,
}

impl CurrentObservation {
    pub fn from_report(report: &WeatherReport) -> Result<Self, WeatherError> {
        Ok(Self {
            temperature: report.current_value(current::TEMPERATURE_2M)?,
            feels_like: report.current_value(current::APPARENT_TEMPERATURE)?,
            relative_humidity: report.current_value(current::RELATIVEHUMIDITY_2M)?,
            windspeed: report.current_value(current::WINDSPEED_10M)?,
            winddirection: report.current_value(current::WINDDIRECTION_10M)?,
            unit: report.current_units.get(current::TEMPERATURE_2M).cloned(),
        })
    }
}

impl ReportStatus {
    fn record_success(&mut self, observation: &CurrentObservation, at: DateTime<Utc>) {
        self.unit = observation.unit.clone().unwrap_or_default();
        self.temperature = observation.temperature.to_string();
        self.feels_like = observation.feels_like.to_string();
        self.relative_humidity = observation.relative_humidity.to_string();
        self.windspeed = observation.windspeed.to_string();
        self.winddirection = observation.winddirection.to_string();
        self.state = ReportState::Success;
        self.last_reconciled = Some(at);
    }

    fn record_failure(&mut self, at: DateTime<Utc>) {
        self.state = ReportState::Failed;
        self.last_reconciled = Some(at);
    }
}

/// Request for the current conditions the status reports on.
pub fn current_conditions_request(
    coordinates: Coordinates,
    api_key: Option<String>,
) -> WeatherRequest {
    WeatherRequest::at(coordinates.latitude, coordinates.longitude)
        .with_current(CURRENT_VARIABLES)
        .with_api_key(api_key)
}

#[derive(Debug)]
pub struct Reconciler<W, S> {
    source: W,
    store: S,
    api_key: Option<String>,
}

impl<W: WeatherSource, S: ReportStore> Reconciler<W, S> {
    pub fn new(source: W, store: S) -> Self {
        Self {
            source,
            store,
            api_key: None,
        }
    }

    /// API key passed along with every forecast request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one attempt for `key` and return the status that was written.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReportStatus, ReconcileError> {
        debug!(%key, phase = %Phase::Pending, "Reconciling report");

        let mut report = self.store.get(key).await.map_err(|source| {
            error!(%key, error = %source, "Can't retrieve report");
            ReconcileError::Load {
                key: key.clone(),
                source,
            }
        })?;

        debug!(%key, phase = %Phase::Resolving, location = %report.spec.location);
        let coordinates = match self.source.resolve_location(&report.spec.location).await {
            Ok(coordinates) => coordinates,
            Err(err) => {
                error!(%key, location = %report.spec.location, error = %err, "Can not find location");
                return Err(self.fail(&mut report, err).await);
            }
        };

        debug!(%key, phase = %Phase::Fetching, ?coordinates);
        let request = current_conditions_request(coordinates, self.api_key.clone());
        let observation = match self
            .source
            .fetch_weather_report(&request)
            .await
            .and_then(|weather| CurrentObservation::from_report(&weather))
        {
            Ok(observation) => observation,
            Err(err) => {
                error!(%key, error = %err, "Error getting report");
                return Err(self.fail(&mut report, err).await);
            }
        };

        report.status.record_success(&observation, Utc::now());
        self.persist(&report).await?;

        info!(
            %key,
            phase = %Phase::Success,
            temperature = %report.status.temperature,
            feels_like = %report.status.feels_like,
            relative_humidity = %report.status.relative_humidity,
            windspeed = %report.status.windspeed,
            winddirection = %report.status.winddirection,
            "Updated report"
        );
        Ok(report.status)
    }

    /// Mark the report `Failed` and persist it. Returns the error the caller
    /// sees: the weather error, or the persist error if the write failed too.
    async fn fail(&self, report: &mut ReportResource, err: WeatherError) -> ReconcileError {
        report.status.record_failure(Utc::now());

        match self.persist(report).await {
            Ok(()) => {
                info!(key = %report.metadata, phase = %Phase::Failed, "Marked report failed");
                ReconcileError::Weather(err)
            }
            Err(persist_err) => {
                // The caller only sees the persist error.
                error!(key = %report.metadata, error = %err, "Dropping weather error after failed status write");
                persist_err
            }
        }
    }

    async fn persist(&self, report: &ReportResource) -> Result<(), ReconcileError> {
        self.store.update_status(report).await.map_err(|source| {
            error!(key = %report.metadata, error = %source, "Error updating status");
            ReconcileError::Persist {
                key: report.metadata.clone(),
                source,
            }
        })
    }
}
