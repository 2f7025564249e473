use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    client::{DEFAULT_TIMEOUT, FORECAST_URL, GEOCODING_URL},
    controller::{Backoff, DEFAULT_BACKOFF_MAX, DEFAULT_BACKOFF_MIN, DEFAULT_RESYNC_INTERVAL},
};

/// Operator configuration stored on disk as TOML.
///
/// Example:
/// ```toml
/// forecast_url = "https://customer-api.open-meteo.com/v1/forecast"
/// api_key = "..."
/// request_timeout_secs = 10
/// reports_dir = "/var/lib/weather-operator/reports"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geocoding_url: String,
    pub forecast_url: String,

    /// Only needed for the commercial Open-Meteo endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub request_timeout_secs: u64,

    /// Where report files live. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,

    pub resync_interval_secs: u64,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoding_url: GEOCODING_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
            api_key: None,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            reports_dir: None,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL.as_secs(),
            backoff_min_secs: DEFAULT_BACKOFF_MIN.as_secs(),
            backoff_max_secs: DEFAULT_BACKOFF_MAX.as_secs(),
        }
    }
}

impl Config {
    /// Load config from the default path, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.check()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(cfg)
    }

    /// Save config to the default path, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-operator", "weather-operator")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding report files.
    pub fn reports_dir(&self) -> Result<PathBuf> {
        match &self.reports_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("reports")),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_secs(self.backoff_min_secs),
            Duration::from_secs(self.backoff_max_secs),
        )
    }

    /// API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Replace the API key; an empty string clears it.
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key).filter(|k| !k.is_empty());
    }

    fn check(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be greater than zero"));
        }
        if self.resync_interval_secs == 0 {
            return Err(anyhow!("resync_interval_secs must be greater than zero"));
        }
        if self.backoff_min_secs == 0 || self.backoff_min_secs > self.backoff_max_secs {
            return Err(anyhow!(
                "backoff_min_secs ({}) must be between 1 and backoff_max_secs ({})",
                self.backoff_min_secs,
                self.backoff_max_secs
            ));
        }
        Ok(())
    }
}
