//! Shared data types for atmospheric readings, risk scores and guidance
//!
//! Every type here is immutable once constructed: readings are produced by a
//! source client (or re-served from cache) and discarded when their cache
//! entry expires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AirSenseError;

/// Which upstream produced a reading. `Simulated` marks offline pseudo-data
/// and must never be presented as a live measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    AirNow,
    PurpleAir,
    OpenWeather,
    Simulated,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::AirNow => write!(f, "airnow"),
            Provenance::PurpleAir => write!(f, "purpleair"),
            Provenance::OpenWeather => write!(f, "openweather"),
            Provenance::Simulated => write!(f, "simulated"),
        }
    }
}

/// Qualitative trust tier for a reconciled reading. Derived from which tier
/// of the fallback chain answered and how many sensors contributed; callers
/// must not re-derive it from the source name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Current weather at a coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Temperature in Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
    /// Wind speed in m/s
    pub wind_speed: f32,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    pub wind_direction: u16,
    /// Visibility in kilometers
    pub visibility_km: f32,
    /// When this was observed
    pub observed_at: DateTime<Utc>,
}

/// A pollutant concentration that may be estimated rather than measured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantValue {
    pub value: f32,
    /// True when the value was derived (e.g. PM10 scaled from PM2.5) instead
    /// of reported by the upstream source.
    pub estimated: bool,
}

impl PollutantValue {
    #[must_use]
    pub fn measured(value: f32) -> Self {
        Self {
            value,
            estimated: false,
        }
    }

    #[must_use]
    pub fn estimated(value: f32) -> Self {
        Self {
            value,
            estimated: true,
        }
    }
}

/// Air quality at a coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    /// Standardized index, 0-500
    pub aqi: u16,
    /// PM2.5 concentration in µg/m³
    pub pm25: f32,
    /// PM10 concentration in µg/m³, when available
    pub pm10: Option<PollutantValue>,
    /// Ozone concentration in ppb, when available
    pub ozone: Option<PollutantValue>,
    /// When this was observed
    pub observed_at: DateTime<Utc>,
    /// Which upstream produced the reading
    pub source: Provenance,
}

/// One crowd-sourced sensor observation. Used only inside the spatial
/// reconciler; exposed outward solely as a diagnostic list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorObservation {
    pub id: u64,
    pub name: String,
    /// PM2.5 estimate in µg/m³
    pub pm25: f32,
    pub latitude: f64,
    pub longitude: f64,
    /// When the sensor last reported
    pub last_seen: DateTime<Utc>,
}

/// PM2.5 estimate fused from nearby sensors via inverse-distance weighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEstimate {
    /// Fused PM2.5 in µg/m³, rounded to one decimal
    pub pm25: f32,
    /// How many fresh sensors contributed; doubles as a confidence signal
    pub sensor_count: usize,
    /// Contributing sensors, for diagnostics
    pub sensors: Vec<SensorObservation>,
}

/// The fallback chain's answer: the most trustworthy index available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestAvailable {
    pub aqi: u16,
    pub pm25: f32,
    pub source: Provenance,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_count: Option<usize>,
}

/// Vulnerable-population category with its own scoring multiplier and
/// recommendation ladder. Unknown ids are rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthProfile {
    RespiratorySensitive,
    Elderly,
    Infant,
}

impl HealthProfile {
    /// Fixed physiological vulnerability multiplier applied to the raw score.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            HealthProfile::RespiratorySensitive => 1.4,
            HealthProfile::Elderly => 1.2,
            HealthProfile::Infant => 1.6,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HealthProfile::RespiratorySensitive => "respiratory-sensitive",
            HealthProfile::Elderly => "elderly",
            HealthProfile::Infant => "infant",
        }
    }
}

impl fmt::Display for HealthProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthProfile {
    type Err = AirSenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "respiratory-sensitive" => Ok(HealthProfile::RespiratorySensitive),
            "elderly" => Ok(HealthProfile::Elderly),
            "infant" => Ok(HealthProfile::Infant),
            other => Err(AirSenseError::invalid_profile(other)),
        }
    }
}

/// Discrete risk band. Always a pure function of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=30 => RiskBand::Low,
            31..=60 => RiskBand::Moderate,
            _ => RiskBand::High,
        }
    }
}

/// Normalized factor contributions to a risk score, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributingFactors {
    pub particulate: u8,
    pub heat: u8,
    pub humidity: u8,
    pub wind: u8,
}

/// Personalized risk score for one profile at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub profile: HealthProfile,
    /// 0-100
    pub score: u8,
    pub band: RiskBand,
    /// The index the score was computed from
    pub aqi: u16,
    pub factors: ContributingFactors,
    pub computed_at: DateTime<Utc>,
}

/// One step of the 13-point projection (now + 12 hourly steps)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Relative hour label: "Now", "1h", "2h", ...
    pub hour: String,
    /// Projected physiological strain, 0-100
    pub strain: u8,
    /// Projected index value
    pub aqi: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Safe,
    Warn,
    Hazard,
}

/// Generated guidance. At most four per request; general index guidance
/// always precedes profile-specific guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub text: String,
    pub severity: Severity,
}

impl Recommendation {
    pub fn new(id: &str, text: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.to_string(),
            text: text.into(),
            severity,
        }
    }
}

/// Answer to the "current conditions" operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub weather: WeatherReading,
    pub air_quality: AirQualityReading,
}

/// Answer to the "risk score for profile" operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(flatten)]
    pub score: RiskScore,
    pub forecast: Vec<ForecastPoint>,
    pub recommendations: Vec<Recommendation>,
}

/// Round to one decimal, matching how upstream concentrations are reported.
#[must_use]
pub fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
