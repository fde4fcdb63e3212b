use anyhow::{Context, Result, bail};
use clap::Args;
use inquire::{Password, PasswordDisplayMode, Select, Text};
use std::path::Path;
use wx_core::Config;

const UNIT_CHOICES: &[&str] = &["imperial", "metric", "standard"];

/// Values given on the command line skip the matching prompt.
#[derive(Debug, Args)]
pub struct ConfigureArgs {
    /// Provider base URL, e.g. https://api.openweathermap.org/data/2.5/
    #[arg(long)]
    pub base_url: Option<String>,

    /// API key sent with every request.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Units passed through to the provider.
    #[arg(long)]
    pub units: Option<String>,
}

pub fn run(config_path: &Path, args: ConfigureArgs) -> Result<()> {
    let mut config = Config::load_from(config_path)?;

    let base_url = match args.base_url {
        Some(url) => url,
        None => Text::new("Provider base URL:")
            .with_default(&config.provider.base_url)
            .prompt()
            .context("Failed to read base URL")?,
    };

    let api_key = match args.api_key {
        Some(key) => Some(key),
        None => {
            let entered = Password::new("API key (leave empty to keep the current one):")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()
                .context("Failed to read API key")?;
            Some(entered).filter(|k| !k.trim().is_empty())
        }
    };

    let units = match args.units {
        Some(units) => units,
        None => {
            let current = config.provider.units.as_str();
            let cursor = UNIT_CHOICES.iter().position(|u| *u == current).unwrap_or(0);
            Select::new("Units:", UNIT_CHOICES.to_vec())
                .with_starting_cursor(cursor)
                .prompt()
                .context("Failed to read units")?
                .to_string()
        }
    };

    apply(&mut config, base_url, api_key, units)?;

    config.save_to(config_path)?;
    println!("Configuration saved to {}", config_path.display());

    Ok(())
}

fn apply(
    config: &mut Config,
    base_url: String,
    api_key: Option<String>,
    units: String,
) -> Result<()> {
    config.provider.base_url = base_url.trim().to_string();
    if let Some(key) = api_key {
        config.set_api_key(key.trim().to_string());
    }
    config.provider.units = units.trim().to_string();

    config.provider.validate()?;
    if !config.has_api_key() {
        bail!("An API key is required.\nHint: pass --api-key or enter one at the prompt.");
    }

    Ok(())
}
