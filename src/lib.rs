//! `AirSense` - Atmospheric data aggregation and personalized health-risk scoring
//!
//! This library fuses official monitors, crowd-sourced sensors and general
//! weather providers into one best-available air quality answer, then scores
//! the health risk it poses to vulnerable population profiles.

pub mod aqi;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod risk;
pub mod service;
pub mod sources;

// Re-export core types for public API
pub use cache::TtlCache;
pub use config::AirSenseConfig;
pub use error::AirSenseError;
pub use models::{
    AirQualityReading, BestAvailable, Confidence, CurrentConditions, FusedEstimate, HealthProfile,
    Provenance, Recommendation, RiskAssessment, RiskBand, RiskScore, WeatherReading,
};
pub use service::DataService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AirSenseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
