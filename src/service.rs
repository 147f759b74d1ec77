//! Data service: fallback chain, reconciliation and risk orchestration
//!
//! The service owns one client per upstream tier and a shared TTL cache.
//! Which tiers exist is decided once at construction from credential
//! presence; requests walk the chain strictly in trust order and the final
//! tier can always answer, so the aggregate operations never fail. Only a
//! malformed profile id is a caller error, and that is rejected before any
//! tier is consulted.

use anyhow::Result;
use chrono::{Timelike, Utc};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::aqi;
use crate::cache::{coord_key, TtlCache};
use crate::config::AirSenseConfig;
use crate::models::{
    round_tenth, AirQualityReading, BestAvailable, Confidence, CurrentConditions, FusedEstimate,
    HealthProfile, PollutantValue, Provenance, RiskAssessment,
};
use crate::reconcile;
use crate::risk;
use crate::sources::{
    AirNowClient, AqiSource, OpenWeatherClient, PurpleAirClient, SensorSource, WeatherTier,
};

/// Fused estimates backed by at least this many sensors grade as high
/// confidence; fewer grade as medium.
pub const HIGH_CONFIDENCE_SENSOR_COUNT: usize = 4;

/// Ozone assumed when no tier reports one, in ppb. Always flagged estimated.
pub const DEFAULT_OZONE_PPB: f32 = 30.0;

/// PM10 is scaled from PM2.5 by this factor when not reported directly.
const PM10_FROM_PM25_FACTOR: f32 = 1.2;

pub struct DataService {
    aqi_source: Option<Box<dyn AqiSource>>,
    sensor_source: Option<Box<dyn SensorSource>>,
    weather: WeatherTier,
    cache: TtlCache,
    sensor_radius_km: f64,
}

impl DataService {
    /// Build the service from configuration. A tier without a credential is
    /// simply absent and the chain routes around it.
    pub fn from_config(config: &AirSenseConfig) -> Result<Self> {
        let timeout = Duration::from_secs(u64::from(config.sources.timeout_seconds));

        let aqi_source: Option<Box<dyn AqiSource>> = match &config.sources.airnow_api_key {
            Some(key) if config.sources.airnow_enabled => {
                Some(Box::new(AirNowClient::new(key.clone(), timeout)?))
            }
            _ => None,
        };

        let sensor_source: Option<Box<dyn SensorSource>> = match &config.sources.purpleair_api_key
        {
            Some(key) => Some(Box::new(PurpleAirClient::new(key.clone(), timeout)?)),
            None => None,
        };

        let weather = match &config.sources.openweather_api_key {
            Some(key) => WeatherTier::live(Box::new(OpenWeatherClient::new(key.clone(), timeout)?)),
            None => WeatherTier::simulated_only(),
        };

        info!(
            airnow = aqi_source.is_some(),
            purpleair = sensor_source.is_some(),
            openweather = weather.is_live(),
            "data service tiers configured"
        );

        Ok(Self {
            aqi_source,
            sensor_source,
            weather,
            cache: TtlCache::new(Duration::from_secs(u64::from(config.cache.ttl_seconds))),
            sensor_radius_km: config.defaults.sensor_radius_km,
        })
    }

    /// Build the service from explicit tiers. The seam for tests and for
    /// embedding with non-default clients.
    #[must_use]
    pub fn with_sources(
        aqi_source: Option<Box<dyn AqiSource>>,
        sensor_source: Option<Box<dyn SensorSource>>,
        weather: WeatherTier,
        cache_ttl: Duration,
        sensor_radius_km: f64,
    ) -> Self {
        Self {
            aqi_source,
            sensor_source,
            weather,
            cache: TtlCache::new(cache_ttl),
            sensor_radius_km,
        }
    }

    /// Fuse nearby crowd-sourced sensors into one PM2.5 estimate.
    ///
    /// Returns `None` when the sensor tier is absent, unavailable, or no
    /// sensor in range reported recently enough.
    #[instrument(skip(self))]
    pub async fn hyperlocal_pm25(&self, lat: f64, lon: f64) -> Option<FusedEstimate> {
        let key = coord_key("hyperlocal", lat, lon);
        if let Some(hit) = self.cache.get::<FusedEstimate>(&key) {
            return Some(hit);
        }

        let source = self.sensor_source.as_ref()?;
        match source.sensors_in_area(lat, lon, self.sensor_radius_km).await {
            Ok(observations) => {
                let fused = reconcile::fuse_observations(lat, lon, observations, Utc::now());
                if let Some(estimate) = &fused {
                    self.cache.put(&key, estimate);
                }
                fused
            }
            Err(reason) => {
                warn!(%reason, "sensor network unavailable");
                None
            }
        }
    }

    /// Walk the fallback chain and return the most trustworthy index
    /// available right now. Never fails; the final tier always answers.
    #[instrument(skip(self))]
    pub async fn best_available_aqi(&self, lat: f64, lon: f64) -> BestAvailable {
        let key = coord_key("best-aqi", lat, lon);
        if let Some(hit) = self.cache.get::<BestAvailable>(&key) {
            return hit;
        }

        // Tier 1: official-grade monitors.
        if let Some(source) = &self.aqi_source {
            match source.fetch_reading(lat, lon).await {
                Ok(reading) => {
                    let best = BestAvailable {
                        aqi: reading.aqi,
                        pm25: reading.pm25,
                        source: reading.source,
                        confidence: Confidence::High,
                        sensor_count: None,
                    };
                    self.cache.put(&key, &best);
                    return best;
                }
                Err(reason) => {
                    warn!(source = source.name(), %reason, "official tier unavailable, falling back");
                }
            }
        }

        // Tier 2: fused crowd-sourced sensors.
        if let Some(fused) = self.hyperlocal_pm25(lat, lon).await {
            let best = BestAvailable {
                aqi: aqi::aqi_from_pm25(f64::from(fused.pm25)),
                pm25: fused.pm25,
                source: Provenance::PurpleAir,
                confidence: sensor_confidence(fused.sensor_count),
                sensor_count: Some(fused.sensor_count),
            };
            self.cache.put(&key, &best);
            return best;
        }

        // Tier 3: general weather provider or simulated data.
        let reading = self.weather.air_quality(lat, lon).await;
        let best = BestAvailable {
            aqi: reading.aqi,
            pm25: reading.pm25,
            source: reading.source,
            confidence: Confidence::Low,
            sensor_count: None,
        };
        self.cache.put(&key, &best);
        best
    }

    /// Current weather and air quality, fetched concurrently: weather from
    /// the weather tier, air quality through the fallback chain. Missing
    /// pollutant fields are filled with flagged estimates so callers always
    /// see a complete reading.
    #[instrument(skip(self))]
    pub async fn current_conditions(&self, lat: f64, lon: f64) -> CurrentConditions {
        let key = coord_key("conditions", lat, lon);
        if let Some(hit) = self.cache.get::<CurrentConditions>(&key) {
            return hit;
        }

        // Weather from the weather tier, air quality from the fallback
        // chain so the most trustworthy index and its provenance carry
        // through to the caller.
        let (weather, best) = tokio::join!(
            self.weather.current_weather(lat, lon),
            self.best_available_aqi(lat, lon),
        );

        let mut air_quality = AirQualityReading {
            aqi: best.aqi,
            pm25: best.pm25,
            pm10: None,
            ozone: None,
            observed_at: Utc::now(),
            source: best.source,
        };
        fill_missing_pollutants(&mut air_quality);

        let conditions = CurrentConditions {
            weather,
            air_quality,
        };
        self.cache.put(&key, &conditions);
        conditions
    }

    /// Personalized risk for one profile: score, 12-hour projection and
    /// guidance. Scored from the reconciled conditions, which already carry
    /// the chain's most trustworthy index.
    #[instrument(skip(self))]
    pub async fn risk_assessment(
        &self,
        profile: HealthProfile,
        lat: f64,
        lon: f64,
    ) -> RiskAssessment {
        let key = coord_key(&format!("risk:{profile}"), lat, lon);
        if let Some(hit) = self.cache.get::<RiskAssessment>(&key) {
            return hit;
        }

        let conditions = self.current_conditions(lat, lon).await;
        let aqi = conditions.air_quality.aqi;

        let score = risk::calculate_risk_score(profile, &conditions.air_quality, &conditions.weather);
        let forecast = risk::generate_forecast(profile, aqi, Utc::now().hour());
        let recommendations = risk::recommendations(profile, score.score, aqi);

        let assessment = RiskAssessment {
            score,
            forecast,
            recommendations,
        };
        self.cache.put(&key, &assessment);
        assessment
    }

    /// String-id variant of [`risk_assessment`](Self::risk_assessment) for
    /// callers that receive the profile as text. Rejects unknown ids before
    /// any tier is consulted.
    pub async fn risk_assessment_for(
        &self,
        profile_id: &str,
        lat: f64,
        lon: f64,
    ) -> crate::Result<RiskAssessment> {
        let profile: HealthProfile = profile_id.parse()?;
        Ok(self.risk_assessment(profile, lat, lon).await)
    }
}

/// Grade a fused estimate by how many sensors contributed.
#[must_use]
pub fn sensor_confidence(sensor_count: usize) -> Confidence {
    if sensor_count >= HIGH_CONFIDENCE_SENSOR_COUNT {
        Confidence::High
    } else {
        Confidence::Medium
    }
}

fn fill_missing_pollutants(reading: &mut AirQualityReading) {
    if reading.pm10.is_none() {
        reading.pm10 = Some(PollutantValue::estimated(round_tenth(
            reading.pm25 * PM10_FROM_PM25_FACTOR,
        )));
    }
    if reading.ozone.is_none() {
        reading.ozone = Some(PollutantValue::estimated(DEFAULT_OZONE_PPB));
    }
}
