use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Text, validator::Validation};
use tracing::{error, info};
use weather_core::{
    Config, Controller, FileStore, ObjectKey, OpenMeteoClient, Reconciler, ReportSpec,
    ReportStore, Units, resource::DEFAULT_NAMESPACE,
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-operator",
    version,
    about = "Keeps weather report resources in sync with Open-Meteo"
)]
pub struct Cli {
    /// Path to the config file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "weather_core=trace". Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or update a weather report.
    Apply {
        /// Report name.
        name: String,

        /// Free-text location, e.g. "Berlin".
        #[arg(long)]
        location: String,

        #[arg(long, default_value_t = Units::Standard)]
        units: Units,

        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },

    /// Show a report's spec and status.
    Get {
        name: String,

        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },

    /// List all reports.
    List,

    /// Delete a report.
    Delete {
        name: String,

        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },

    /// Run a single reconciliation attempt for one report.
    Reconcile {
        name: String,

        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },

    /// Reconcile every report continuously until interrupted.
    Run,

    /// Interactively edit endpoints, timeout and API key.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;

        match self.command {
            Command::Apply {
                name,
                location,
                units,
                namespace,
            } => {
                let key = object_key(namespace, name)?;
                let report = open_store(&config)?
                    .apply(key.clone(), ReportSpec { location, units })
                    .await
                    .with_context(|| format!("Failed to apply report {key}"))?;
                info!(%key, location = %report.spec.location, "Report applied");
                println!("{key} applied");
            }
            Command::Get { name, namespace } => {
                let key = object_key(namespace, name)?;
                let report = open_store(&config)?.get(&key).await?;
                print!("{}", output::ReportDetails(&report));
            }
            Command::List => {
                let store = open_store(&config)?;
                let keys = store.list().await?;
                if keys.is_empty() {
                    println!("No reports found in {}", store.root().display());
                    return Ok(());
                }

                println!("{}", output::list_header());
                for key in keys {
                    let report = store.get(&key).await?;
                    println!("{}", output::report_row(&report));
                }
            }
            Command::Delete { name, namespace } => {
                let key = object_key(namespace, name)?;
                open_store(&config)?.delete(&key).await?;
                println!("{key} deleted");
            }
            Command::Reconcile { name, namespace } => {
                let key = object_key(namespace, name)?;
                let status = reconciler(&config)?
                    .reconcile(&key)
                    .await
                    .with_context(|| format!("Reconcile of {key} failed"))?;
                println!("{}", output::status_line(&status));
            }
            Command::Run => {
                let mut controller = Controller::new(
                    reconciler(&config)?,
                    config.backoff(),
                    config.resync_interval(),
                );
                controller
                    .run(async {
                        if let Err(err) = tokio::signal::ctrl_c().await {
                            error!(error = %err, "Failed to listen for ctrl-c");
                        }
                    })
                    .await;
            }
            Command::Configure => {
                let config = prompt_config(config)?;
                config.save_to(&config_path)?;
                println!("Configuration saved to {}", config_path.display());
            }
        }

        Ok(())
    }
}

fn object_key(namespace: String, name: String) -> Result<ObjectKey> {
    let key = ObjectKey::new(namespace, name);
    if !key.is_valid() {
        return Err(anyhow!(
            "Invalid report key '{key}'. Use lowercase letters, digits, '-' and '.'."
        ));
    }
    Ok(key)
}

fn open_store(config: &Config) -> Result<FileStore> {
    Ok(FileStore::new(config.reports_dir()?))
}

fn reconciler(config: &Config) -> Result<Reconciler<OpenMeteoClient, FileStore>> {
    let client =
        OpenMeteoClient::from_config(config).context("Failed to build Open-Meteo client")?;
    Ok(Reconciler::new(client, open_store(config)?)
        .with_api_key(config.api_key().map(str::to_owned)))
}

fn prompt_config(mut config: Config) -> Result<Config> {
    config.geocoding_url = Text::new("Geocoding endpoint:")
        .with_default(&config.geocoding_url)
        .prompt()?;

    config.forecast_url = Text::new("Forecast endpoint:")
        .with_default(&config.forecast_url)
        .prompt()?;

    config.request_timeout_secs = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.request_timeout_secs)
        .with_error_message("Please type a whole number of seconds")
        .with_validator(|secs: &u64| {
            Ok(if *secs == 0 {
                Validation::Invalid("Timeout must be at least one second".into())
            } else {
                Validation::Valid
            })
        })
        .prompt()?;

    let api_key = Password::new("API key (leave empty for the free API):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    config.set_api_key(api_key);

    Ok(config)
}
