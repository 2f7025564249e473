//! The declared weather report resource and its observed status.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Identity of a report: `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Lowercase alphanumerics, `-` and `.`, starting and ending alphanumeric.
    pub fn is_valid(&self) -> bool {
        is_dns_label(&self.namespace) && is_dns_label(&self.name)
    }
}

fn is_dns_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 253
        && bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-' || *b == b'.')
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ObjectKey {
    type Err = String;

    /// Accepts `namespace/name` or a bare `name` in the default namespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.split_once('/') {
            Some((namespace, name)) => ObjectKey::new(namespace, name),
            None => ObjectKey::new(DEFAULT_NAMESPACE, s),
        };

        if key.is_valid() {
            Ok(key)
        } else {
            Err(format!(
                "Invalid report name '{s}'. Use lowercase letters, digits, '-' and '.'."
            ))
        }
    }
}

/// Unit system requested for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Standard,
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(format!(
                "Unknown units '{value}'. Supported units: standard, metric, imperial."
            )),
        }
    }
}

/// Desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSpec {
    /// Free-text place name, e.g. "Berlin".
    pub location: String,
    #[serde(default)]
    pub units: Units,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportState {
    /// Never reconciled.
    #[default]
    Pending,
    Success,
    Failed,
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportState::Pending => "Pending",
            ReportState::Success => "Success",
            ReportState::Failed => "Failed",
        })
    }
}

/// Observed state. Readings are decimal strings as written by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportStatus {
    pub unit: String,
    pub temperature: String,
    pub feels_like: String,
    pub relative_humidity: String,
    pub windspeed: String,
    pub winddirection: String,
    pub state: ReportState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<DateTime<Utc>>,
}

/// A weather report as stored: identity, spec and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResource {
    pub metadata: ObjectKey,
    pub spec: ReportSpec,
    #[serde(default)]
    pub status: ReportStatus,
}

impl ReportResource {
    pub fn new(metadata: ObjectKey, spec: ReportSpec) -> Self {
        Self {
            metadata,
            spec,
            status: ReportStatus::default(),
        }
    }
}
