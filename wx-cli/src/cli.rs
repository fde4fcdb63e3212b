use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::{
    io,
    path::{Path, PathBuf},
};
use wx_core::{Config, Coordinate, Endpoint, Signal, Url, WeatherClient};

use crate::configure::{self, ConfigureArgs};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wx", version, about = "Fetch weather JSON for a location")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the provider base URL, API key and units.
    Configure(ConfigureArgs),

    /// Current conditions at a location.
    Current(LocationArgs),

    /// Hourly forecast for a location.
    Hourly(LocationArgs),

    /// Daily forecast for a location.
    Daily(LocationArgs),

    /// GET any URL and print it as JSON.
    Fetch {
        url: Url,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees, -90..=90.
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in decimal degrees, -180..=180.
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

impl LocationArgs {
    fn coordinate(&self) -> anyhow::Result<Coordinate> {
        Coordinate::new(self.lat, self.lon).context("Invalid location")
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        let (signal, what) = match self.command {
            Command::Configure(args) => return configure::run(&config_path, args),
            Command::Current(loc) => {
                spawn_endpoint(&config_path, Endpoint::CurrentConditions, &loc)?
            }
            Command::Hourly(loc) => spawn_endpoint(&config_path, Endpoint::HourlyForecast, &loc)?,
            Command::Daily(loc) => spawn_endpoint(&config_path, Endpoint::DailyForecast, &loc)?,
            Command::Fetch { url } => {
                let client = load_client(&config_path)?;
                let what = url.to_string();
                (client.json_signal(url), what)
            }
        };

        let value = wait_or_interrupt(signal, tokio::signal::ctrl_c())
            .await
            .with_context(|| format!("Failed to fetch {what}"))?;

        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}

fn load_client(config_path: &Path) -> anyhow::Result<WeatherClient> {
    let config = Config::load_from(config_path)?.with_env_overrides();
    tracing::debug!(path = %config_path.display(), provider = ?config.provider, "loaded config");

    WeatherClient::from_config(&config).with_context(|| {
        format!(
            "Provider configuration in {} is invalid.\n\
             Hint: run `wx configure` to fix it.",
            config_path.display()
        )
    })
}

fn spawn_endpoint(
    config_path: &Path,
    endpoint: Endpoint,
    loc: &LocationArgs,
) -> anyhow::Result<(Signal<Value>, String)> {
    let coordinate = loc.coordinate()?;
    let client = load_client(config_path)?;

    let what = format!("{endpoint} weather for {coordinate}");
    Ok((client.endpoint_signal(endpoint, coordinate), what))
}

/// Wait for the request, cancelling it if `interrupt` fires first.
///
/// A listener that fails to register never counts as an interrupt.
async fn wait_or_interrupt<F>(mut signal: Signal<Value>, interrupt: F) -> anyhow::Result<Value>
where
    F: Future<Output = io::Result<()>>,
{
    let interrupted = async {
        if let Err(err) = interrupt.await {
            tracing::warn!(error = %err, "cannot listen for Ctrl-C; waiting for the request");
            std::future::pending::<()>().await;
        }
    };

    let outcome = tokio::select! {
        res = &mut signal => Some(res),
        () = interrupted => None,
    };

    match outcome {
        Some(res) => Ok(res?),
        None => {
            signal.cancel();
            bail!("Interrupted; request cancelled")
        }
    }
}
