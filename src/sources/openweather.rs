//! OpenWeather client plus the simulated fallback generator
//!
//! The live client and the simulated generator are two implementations of
//! [`WeatherSource`]; which one serves a request is decided once at
//! construction from credential presence, not re-checked per call.
//! Simulated readings carry `Provenance::Simulated` so they can never be
//! mistaken for live measurements, which keeps the system demo-capable
//! offline.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{SourceResult, Unavailable, WeatherSource};
use crate::aqi;
use crate::models::{
    round_tenth, AirQualityReading, PollutantValue, Provenance, WeatherReading,
};

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Visibility assumed when the current-weather payload omits it.
const DEFAULT_VISIBILITY_KM: f32 = 10.0;

pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
}

/// OpenWeather API response structures
mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct CurrentWeather {
        pub main: MainBlock,
        pub wind: WindBlock,
        /// Meters
        pub visibility: Option<f64>,
        pub dt: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct MainBlock {
        pub temp: f32,
        pub humidity: f32,
    }

    #[derive(Debug, Deserialize)]
    pub struct WindBlock {
        pub speed: f32,
        #[serde(default)]
        pub deg: u16,
    }

    #[derive(Debug, Deserialize)]
    pub struct AirPollution {
        pub list: Vec<AirSample>,
    }

    #[derive(Debug, Deserialize)]
    pub struct AirSample {
        pub components: Components,
        pub dt: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Components {
        #[serde(rename = "pm2_5")]
        pub pm25: f32,
        pub pm10: f32,
        pub o3: f32,
    }
}

impl OpenWeatherClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("airsense/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build OpenWeather HTTP client")?;

        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn current_weather(&self, lat: f64, lon: f64) -> SourceResult<WeatherReading> {
        let response = self
            .client
            .get(format!("{BASE_URL}/weather"))
            .query(&[("lat", lat), ("lon", lon)])
            .query(&[("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let data: wire::CurrentWeather = response
            .json()
            .await
            .map_err(|e| Unavailable::Malformed(e.to_string()))?;

        Ok(WeatherReading {
            temperature: data.main.temp.round(),
            humidity: data.main.humidity,
            wind_speed: round_tenth(data.wind.speed),
            wind_direction: data.wind.deg,
            visibility_km: data
                .visibility
                .map_or(DEFAULT_VISIBILITY_KM, |m| (m / 1000.0) as f32),
            observed_at: DateTime::from_timestamp(data.dt, 0).unwrap_or_else(Utc::now),
        })
    }

    #[instrument(skip(self))]
    async fn air_quality(&self, lat: f64, lon: f64) -> SourceResult<AirQualityReading> {
        let response = self
            .client
            .get(format!("{BASE_URL}/air_pollution"))
            .query(&[("lat", lat), ("lon", lon)])
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let data: wire::AirPollution = response
            .json()
            .await
            .map_err(|e| Unavailable::Malformed(e.to_string()))?;

        let sample = data.list.first().ok_or(Unavailable::NoData)?;
        let pm25 = round_tenth(sample.components.pm25);

        // OpenWeather's own index uses a 1-5 scale; recompute the
        // standardized 0-500 index from the raw concentration instead.
        Ok(AirQualityReading {
            aqi: aqi::aqi_from_pm25(f64::from(pm25)),
            pm25,
            pm10: Some(PollutantValue::measured(round_tenth(sample.components.pm10))),
            ozone: Some(PollutantValue::measured(round_tenth(sample.components.o3))),
            observed_at: DateTime::from_timestamp(sample.dt, 0).unwrap_or_else(Utc::now),
            source: Provenance::OpenWeather,
        })
    }
}

/// Deterministic offline generator. Readings are seeded from the hour of
/// day, so repeated calls within the same hour agree and the diurnal shape
/// is stable across runs.
#[derive(Debug, Default)]
pub struct SimulatedSource;

impl SimulatedSource {
    fn rng_for_hour(hour: u32) -> StdRng {
        StdRng::seed_from_u64(u64::from(hour))
    }

    #[must_use]
    pub fn weather_at_hour(&self, hour: u32) -> WeatherReading {
        let mut rng = Self::rng_for_hour(hour);
        // Warmest mid-afternoon, coolest before dawn.
        let diurnal = ((f64::from(hour) - 14.0) * std::f64::consts::PI / 12.0).sin() * 5.0;

        WeatherReading {
            temperature: (22.0 + diurnal).round() as f32,
            humidity: (45.0_f64 + rng.gen_range(0.0..20.0)).round() as f32,
            wind_speed: round_tenth((3.0 + rng.gen_range(0.0..4.0)) as f32),
            wind_direction: rng.gen_range(0..360),
            visibility_km: round_tenth((8.0 + rng.gen_range(0.0..4.0)) as f32),
            observed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn air_quality_at_hour(&self, hour: u32) -> AirQualityReading {
        let mut rng = Self::rng_for_hour(hour);
        // Rush-hour profile: elevated mornings and evenings, low overnight.
        let base_aqi: f64 = match hour {
            7..=9 => 120.0,
            17..=19 => 130.0,
            23 | 0..=4 => 60.0,
            _ => 85.0,
        };

        let aqi = (base_aqi + rng.gen_range(-10.0..10.0)).round().max(0.0) as u16;
        let pm25 = round_tenth((f64::from(aqi) / 500.0 * 200.0) as f32);

        AirQualityReading {
            aqi,
            pm25,
            pm10: Some(PollutantValue::estimated(round_tenth(pm25 * 1.2))),
            ozone: Some(PollutantValue::estimated(
                (30.0_f64 + rng.gen_range(0.0..15.0)).round() as f32,
            )),
            observed_at: Utc::now(),
            source: Provenance::Simulated,
        }
    }
}

#[async_trait]
impl WeatherSource for SimulatedSource {
    async fn current_weather(&self, _lat: f64, _lon: f64) -> SourceResult<WeatherReading> {
        Ok(self.weather_at_hour(Utc::now().hour()))
    }

    async fn air_quality(&self, _lat: f64, _lon: f64) -> SourceResult<AirQualityReading> {
        Ok(self.air_quality_at_hour(Utc::now().hour()))
    }
}

/// Final tier of the fallback chain. Prefers the live client when one was
/// constructed and serves simulated data otherwise, or when the live call
/// fails. This tier never reports `Unavailable`.
pub struct WeatherTier {
    live: Option<Box<dyn WeatherSource>>,
    simulated: SimulatedSource,
}

impl WeatherTier {
    #[must_use]
    pub fn live(client: Box<dyn WeatherSource>) -> Self {
        Self {
            live: Some(client),
            simulated: SimulatedSource,
        }
    }

    #[must_use]
    pub fn simulated_only() -> Self {
        Self {
            live: None,
            simulated: SimulatedSource,
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub async fn current_weather(&self, lat: f64, lon: f64) -> WeatherReading {
        if let Some(live) = &self.live {
            match live.current_weather(lat, lon).await {
                Ok(reading) => return reading,
                Err(reason) => {
                    warn!(%reason, "live weather unavailable, serving simulated reading");
                }
            }
        }
        debug!("serving simulated weather");
        self.simulated.weather_at_hour(Utc::now().hour())
    }

    pub async fn air_quality(&self, lat: f64, lon: f64) -> AirQualityReading {
        if let Some(live) = &self.live {
            match live.air_quality(lat, lon).await {
                Ok(reading) => return reading,
                Err(reason) => {
                    warn!(%reason, "live air quality unavailable, serving simulated reading");
                }
            }
        }
        debug!("serving simulated air quality");
        self.simulated.air_quality_at_hour(Utc::now().hour())
    }
}
