use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// One rejected field of a weather request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidInput {
    pub argument: String,
    /// Offending value, `None` when the argument was absent.
    pub value: Option<String>,
    pub reason: String,
}

impl InvalidInput {
    pub fn new(
        argument: impl Into<String>,
        value: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            argument: argument.into(),
            value,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(
                f,
                "Argument '{}' invalid value '{}': {}",
                self.argument, value, self.reason
            ),
            None => write!(f, "Argument '{}' invalid value <unset>: {}", self.argument, self.reason),
        }
    }
}

/// Every violation found while validating a weather request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<InvalidInput>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &InvalidInput> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s) in weather request:", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n\t{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Failures of the Open-Meteo client.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("No location found for '{0}'")]
    NotFound(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Open-Meteo request failed with status {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Current weather is missing variable '{0}'")]
    MissingVariable(String),

    #[error("Invalid endpoint URL '{url}': {source}")]
    Endpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl WeatherError {
    /// Whether the same call could succeed later without changing the input.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
