//! AirNow client (official-grade monitoring network)
//!
//! AirNow reports the standardized index per pollutant rather than raw
//! concentrations, so the PM2.5 concentration is back-estimated through the
//! breakpoint table. Provenance stays `AirNow` either way; the estimate only
//! fills the concentration field.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{AqiSource, SourceResult, Unavailable};
use crate::aqi;
use crate::models::{AirQualityReading, Provenance};

const BASE_URL: &str = "https://www.airnowapi.org/aq";

/// Observations within this many miles of the coordinate are considered.
const SEARCH_DISTANCE_MILES: u32 = 25;

pub struct AirNowClient {
    client: Client,
    api_key: String,
}

/// One pollutant entry from the observation endpoint. AirNow returns an
/// array of these, one per monitored parameter.
#[derive(Debug, Deserialize)]
struct Observation {
    #[serde(rename = "ParameterName")]
    parameter: String,
    #[serde(rename = "AQI")]
    aqi: i32,
}

impl AirNowClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("airsense/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build AirNow HTTP client")?;

        Ok(Self { client, api_key })
    }

    fn reading_from_observations(observations: &[Observation]) -> SourceResult<AirQualityReading> {
        let pm25 = observations
            .iter()
            .find(|obs| obs.parameter == "PM2.5")
            .ok_or(Unavailable::NoData)?;

        // AirNow reports a negative index when the monitor has no valid data.
        if pm25.aqi < 0 {
            return Err(Unavailable::NoData);
        }

        let aqi_value = pm25.aqi.min(500) as u16;
        let pm25_estimate = (aqi::pm25_from_aqi(aqi_value) * 10.0).round() / 10.0;

        Ok(AirQualityReading {
            aqi: aqi_value,
            pm25: pm25_estimate as f32,
            pm10: None,
            ozone: None,
            observed_at: Utc::now(),
            source: Provenance::AirNow,
        })
    }
}

#[async_trait]
impl AqiSource for AirNowClient {
    fn name(&self) -> &'static str {
        "airnow"
    }

    #[instrument(skip(self))]
    async fn fetch_reading(&self, lat: f64, lon: f64) -> SourceResult<AirQualityReading> {
        let url = format!("{BASE_URL}/observation/latLong/current/");
        let response = self
            .client
            .get(&url)
            .query(&[("format", "application/json")])
            .query(&[("latitude", lat), ("longitude", lon)])
            .query(&[("distance", SEARCH_DISTANCE_MILES)])
            .query(&[("API_KEY", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let observations: Vec<Observation> = response
            .json()
            .await
            .map_err(|e| Unavailable::Malformed(e.to_string()))?;

        debug!(count = observations.len(), "AirNow observations received");
        Self::reading_from_observations(&observations)
    }
}
