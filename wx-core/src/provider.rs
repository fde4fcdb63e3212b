use crate::model::Coordinate;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The location-based endpoints a provider exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CurrentConditions,
    HourlyForecast,
    DailyForecast,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::CurrentConditions => "current",
            Endpoint::HourlyForecast => "hourly",
            Endpoint::DailyForecast => "daily",
        }
    }

    pub const fn all() -> &'static [Endpoint] {
        &[Endpoint::CurrentConditions, Endpoint::HourlyForecast, Endpoint::DailyForecast]
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to reach the weather provider.
///
/// Example TOML:
/// ```toml
/// [provider]
/// base_url = "https://api.openweathermap.org/data/2.5/"
/// api_key = "..."
/// units = "metric"
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Query parameter that carries the API key.
    pub api_key_param: String,
    pub latitude_param: String,
    pub longitude_param: String,
    /// Forwarded verbatim as `units=`; nothing is converted locally. Empty omits it.
    pub units: String,
    pub current_path: String,
    pub hourly_path: String,
    pub daily_path: String,
    /// Number of hourly entries to request, sent as `cnt`. Zero omits it.
    pub hourly_count: u32,
    /// Number of daily entries to request, sent as `cnt`. Zero omits it.
    pub daily_count: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5/".to_string(),
            api_key: None,
            api_key_param: "appid".to_string(),
            latitude_param: "lat".to_string(),
            longitude_param: "lon".to_string(),
            units: "imperial".to_string(),
            current_path: "weather".to_string(),
            hourly_path: "forecast".to_string(),
            daily_path: "forecast/daily".to_string(),
            hourly_count: 12,
            daily_count: 7,
        }
    }
}

// Hand-written so the API key never lands in logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("units", &self.units)
            .field("current_path", &self.current_path)
            .field("hourly_path", &self.hourly_path)
            .field("daily_path", &self.daily_path)
            .field("hourly_count", &self.hourly_count)
            .field("daily_count", &self.daily_count)
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    pub fn path(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::CurrentConditions => &self.current_path,
            Endpoint::HourlyForecast => &self.hourly_path,
            Endpoint::DailyForecast => &self.daily_path,
        }
    }

    fn count(&self, endpoint: Endpoint) -> u32 {
        match endpoint {
            Endpoint::CurrentConditions => 0,
            Endpoint::HourlyForecast => self.hourly_count,
            Endpoint::DailyForecast => self.daily_count,
        }
    }

    /// Parsed base URL, always ending in `/` so paths join beneath it.
    pub fn base(&self) -> Result<Url, url::ParseError> {
        let mut base = Url::parse(&self.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base)
    }

    /// Endpoint URL without any query parameters.
    fn endpoint_url(&self, base: &Url, endpoint: Endpoint) -> Result<Url, url::ParseError> {
        base.join(self.path(endpoint).trim_start_matches('/'))
    }

    /// Build the request URL for `endpoint` at `coordinate`.
    pub fn url_for(
        &self,
        endpoint: Endpoint,
        coordinate: Coordinate,
    ) -> Result<Url, url::ParseError> {
        let mut url = self.endpoint_url(&self.base()?, endpoint)?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair(&self.latitude_param, &coordinate.latitude().to_string());
            query.append_pair(&self.longitude_param, &coordinate.longitude().to_string());

            if !self.units.is_empty() {
                query.append_pair("units", &self.units);
            }
            let count = self.count(endpoint);
            if count > 0 {
                query.append_pair("cnt", &count.to_string());
            }
            if let Some(key) = &self.api_key {
                query.append_pair(&self.api_key_param, key);
            }
        }

        Ok(url)
    }

    /// Check that the configuration can produce three distinct, well-formed URLs.
    pub fn validate(&self) -> anyhow::Result<()> {
        let base = self
            .base()
            .with_context(|| format!("Invalid provider base URL '{}'", self.base_url))?;

        if !matches!(base.scheme(), "http" | "https") {
            bail!("Provider base URL must use http or https, got '{}'", base.scheme());
        }

        for param in [&self.latitude_param, &self.longitude_param, &self.api_key_param] {
            if param.trim().is_empty() {
                bail!("Provider query parameter names must not be empty");
            }
        }

        // Compare resolved paths so `./forecast` and `forecast` count as the same endpoint.
        let mut resolved: Vec<(Endpoint, String)> = Vec::with_capacity(Endpoint::all().len());
        for endpoint in Endpoint::all() {
            let url = self.endpoint_url(&base, *endpoint).with_context(|| {
                format!("Invalid path '{}' for endpoint '{endpoint}'", self.path(*endpoint))
            })?;
            let path = url.path().trim_end_matches('/').to_string();

            if let Some((other, _)) = resolved.iter().find(|(_, p)| *p == path) {
                bail!(
                    "Endpoints '{other}' and '{endpoint}' share the path '{path}'; \
                     each endpoint needs its own path"
                );
            }
            resolved.push((*endpoint, path));
        }

        Ok(())
    }
}
