//! Error types for the `AirSense` engine
//!
//! Upstream flakiness is not an error here: individual source failures are
//! absorbed by the fallback chain (see `sources::Unavailable`). The only
//! failure surfaced to callers of the risk operation is a malformed profile
//! id; everything else degrades confidence instead of failing.

use thiserror::Error;

/// Main error type for the `AirSense` library
#[derive(Error, Debug)]
pub enum AirSenseError {
    /// The caller asked for a profile outside the closed set
    #[error("unknown health profile: {profile}")]
    InvalidProfile { profile: String },

    /// Configuration-related errors
    #[error("configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AirSenseError {
    /// Create a new invalid-profile error
    pub fn invalid_profile<S: Into<String>>(profile: S) -> Self {
        Self::InvalidProfile {
            profile: profile.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let profile_err = AirSenseError::invalid_profile("athlete");
        assert!(matches!(profile_err, AirSenseError::InvalidProfile { .. }));
        assert_eq!(
            profile_err.to_string(),
            "unknown health profile: athlete"
        );

        let config_err = AirSenseError::config("missing section");
        assert!(matches!(config_err, AirSenseError::Config { .. }));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AirSenseError = io_err.into();
        assert!(matches!(err, AirSenseError::Io { .. }));
    }
}
