//! Configuration management for `AirSense`
//!
//! Handles loading configuration from files and environment variables,
//! and validates all settings before a service is built from them.

use crate::AirSenseError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `AirSense` engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AirSenseConfig {
    /// Upstream source credentials and toggles
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default query settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Upstream source settings. Each credential is optional; a missing one
/// disables that source and the fallback chain routes around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// AirNow API key
    pub airnow_api_key: Option<String>,
    /// Whether the AirNow tier participates at all
    #[serde(default = "default_airnow_enabled")]
    pub airnow_enabled: bool,
    /// PurpleAir API key
    pub purpleair_api_key: Option<String>,
    /// OpenWeatherMap API key
    pub openweather_api_key: Option<String>,
    /// Request timeout in seconds, shared by all clients
    #[serde(default = "default_source_timeout")]
    pub timeout_seconds: u32,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Latitude used when the caller supplies no coordinate
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    /// Longitude used when the caller supplies no coordinate
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    /// Sensor search radius in kilometers
    #[serde(default = "default_sensor_radius")]
    pub sensor_radius_km: f64,
}

// Default value functions
fn default_airnow_enabled() -> bool {
    true
}

fn default_source_timeout() -> u32 {
    5
}

fn default_cache_ttl() -> u32 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_sensor_radius() -> f64 {
    5.0
}

// New York, matching the served region when nothing else is configured.
fn default_latitude() -> f64 {
    40.7128
}

fn default_longitude() -> f64 {
    -74.0060
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            airnow_api_key: None,
            airnow_enabled: default_airnow_enabled(),
            purpleair_api_key: None,
            openweather_api_key: None,
            timeout_seconds: default_source_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            sensor_radius_km: default_sensor_radius(),
        }
    }
}

impl AirSenseConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides with AIRSENSE_ prefix, e.g.
        // AIRSENSE_SOURCES__AIRNOW_API_KEY.
        builder = builder.add_source(
            Environment::with_prefix("AIRSENSE")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: AirSenseConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("airsense").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        for (name, key) in [
            ("AirNow", &self.sources.airnow_api_key),
            ("PurpleAir", &self.sources.purpleair_api_key),
            ("OpenWeatherMap", &self.sources.openweather_api_key),
        ] {
            if let Some(key) = key {
                if key.is_empty() {
                    return Err(AirSenseError::config(format!(
                        "{name} API key cannot be empty if provided. Either remove it or provide a valid key."
                    ))
                    .into());
                }
                if key.len() < 8 {
                    return Err(AirSenseError::config(format!(
                        "{name} API key appears to be invalid (too short). Please check your API key."
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.sources.timeout_seconds == 0 || self.sources.timeout_seconds > 120 {
            return Err(
                AirSenseError::config("Source timeout must be between 1 and 120 seconds").into(),
            );
        }

        if self.cache.ttl_seconds == 0 || self.cache.ttl_seconds > 3600 {
            return Err(
                AirSenseError::config("Cache TTL must be between 1 and 3600 seconds").into(),
            );
        }

        if !(0.1..=100.0).contains(&self.defaults.sensor_radius_km) {
            return Err(
                AirSenseError::config("Sensor radius must be between 0.1 and 100 km").into(),
            );
        }

        if !(-90.0..=90.0).contains(&self.defaults.latitude)
            || !(-180.0..=180.0).contains(&self.defaults.longitude)
        {
            return Err(AirSenseError::config(
                "Default coordinates must be a valid latitude/longitude pair",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AirSenseError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AirSenseError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AirSenseConfig::default();
        assert!(config.sources.airnow_api_key.is_none());
        assert!(config.sources.airnow_enabled);
        assert_eq!(config.sources.timeout_seconds, 5);
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.logging.level, "info");
        assert!((config.defaults.sensor_radius_km - 5.0).abs() < f64::EPSILON);
        assert!((config.defaults.latitude - 40.7128).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_are_valid() {
        // No key just disables the tier.
        let config = AirSenseConfig::default();
        assert!(config.validate_api_keys().is_ok());
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let mut config = AirSenseConfig::default();
        config.sources.purpleair_api_key = Some(String::new());
        let result = config.validate_api_keys();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_short_api_key_is_rejected() {
        let mut config = AirSenseConfig::default();
        config.sources.airnow_api_key = Some("abc".to_string());
        assert!(config.validate_api_keys().is_err());
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut config = AirSenseConfig::default();
        config.logging.level = "verbose".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_numeric_range_validation() {
        let mut config = AirSenseConfig::default();
        config.cache.ttl_seconds = 100_000;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Cache TTL"));
    }

    #[test]
    fn test_config_path_generation() {
        let path = AirSenseConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("airsense"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
