//! Upstream measurement sources
//!
//! Each client wraps one provider and normalizes its proprietary response
//! into the shared reading types, or reports [`Unavailable`] with an explicit
//! reason. Unavailability is an input to the fallback chain, never an error
//! surfaced to callers, so every failure path stays visible to tests.

pub mod airnow;
pub mod openweather;
pub mod purpleair;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AirQualityReading, SensorObservation, WeatherReading};

pub use airnow::AirNowClient;
pub use openweather::{OpenWeatherClient, SimulatedSource, WeatherTier};
pub use purpleair::PurpleAirClient;

/// Why an individual source could not produce a reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    #[error("no credential configured")]
    MissingCredential,
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("no usable data for this location")]
    NoData,
}

/// Result of one source attempt. `Err` feeds the next fallback tier.
pub type SourceResult<T> = Result<T, Unavailable>;

impl From<reqwest::Error> for Unavailable {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Unavailable::Timeout
        } else if err.is_decode() {
            Unavailable::Malformed(err.to_string())
        } else {
            Unavailable::Network(err.to_string())
        }
    }
}

/// A provider that reports a standardized index for a coordinate.
#[async_trait]
pub trait AqiSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_reading(&self, lat: f64, lon: f64) -> SourceResult<AirQualityReading>;
}

/// A provider that lists raw sensor observations around a coordinate.
#[async_trait]
pub trait SensorSource: Send + Sync {
    async fn sensors_in_area(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> SourceResult<Vec<SensorObservation>>;
}

/// A general-purpose provider for weather plus pollutant readings.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_weather(&self, lat: f64, lon: f64) -> SourceResult<WeatherReading>;

    async fn air_quality(&self, lat: f64, lon: f64) -> SourceResult<AirQualityReading>;
}
