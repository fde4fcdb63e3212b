//! Core library for the `wx` weather client.
//!
//! This crate defines:
//! - [`WeatherClient`]: current conditions, hourly and daily forecasts for a
//!   coordinate, plus a generic URL-to-JSON fetch
//! - Provider endpoint configuration and on-disk settings
//! - The [`Transport`] seam the client sends requests through
//!
//! Payloads are returned as untyped `serde_json::Value`; interpreting them is
//! up to the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod signal;
pub mod transport;

pub use client::WeatherClient;
pub use config::Config;
pub use error::FetchError;
pub use model::{Coordinate, CoordinateError};
pub use provider::{Endpoint, ProviderConfig};
pub use signal::Signal;
pub use transport::{HttpResponse, HttpTransport, Transport};

pub use url::Url;
