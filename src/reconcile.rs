//! Spatial reconciliation of crowd-sourced sensor readings
//!
//! Fuses nearby PM2.5 observations into a single estimate using
//! inverse-distance weighting, the standard low-complexity interpolator when
//! sensor density and quality vary. Only sensors that reported within the
//! last hour participate; the contributing count is surfaced so the caller
//! can grade its confidence in the result.

use chrono::{DateTime, Duration, Utc};
use haversine::{distance, Location, Units};
use tracing::debug;

use crate::models::{FusedEstimate, SensorObservation};

/// Observations older than this are discarded before fusion.
pub const FRESHNESS_WINDOW_SECS: i64 = 3600;

/// Floor added to each distance so a sensor sitting on the target coordinate
/// cannot dominate the average with an unbounded weight.
const DISTANCE_FLOOR_KM: f64 = 0.1;

/// Fuse sensor observations around `(lat, lon)` into one PM2.5 estimate.
///
/// Returns `None` when no observation is fresh enough to trust.
#[must_use]
pub fn fuse_observations(
    lat: f64,
    lon: f64,
    observations: Vec<SensorObservation>,
    now: DateTime<Utc>,
) -> Option<FusedEstimate> {
    let cutoff = now - Duration::seconds(FRESHNESS_WINDOW_SECS);
    let fresh: Vec<SensorObservation> = observations
        .into_iter()
        .filter(|obs| obs.last_seen >= cutoff)
        .collect();

    if fresh.is_empty() {
        debug!("no fresh sensor observations to fuse");
        return None;
    }

    let mut total_weight = 0.0;
    let mut weighted_pm25 = 0.0;
    for obs in &fresh {
        let km = distance(
            Location {
                latitude: lat,
                longitude: lon,
            },
            Location {
                latitude: obs.latitude,
                longitude: obs.longitude,
            },
            Units::Kilometers,
        );
        let weight = 1.0 / (km + DISTANCE_FLOOR_KM);
        total_weight += weight;
        weighted_pm25 += f64::from(obs.pm25) * weight;
    }

    let pm25 = ((weighted_pm25 / total_weight) * 10.0).round() / 10.0;
    debug!(sensor_count = fresh.len(), pm25, "fused sensor observations");

    Some(FusedEstimate {
        pm25: pm25 as f32,
        sensor_count: fresh.len(),
        sensors: fresh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(id: u64, pm25: f32, lat: f64, lon: f64, age_minutes: i64) -> SensorObservation {
        SensorObservation {
            id,
            name: format!("sensor-{id}"),
            pm25,
            latitude: lat,
            longitude: lon,
            last_seen: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_stale_sensors_are_excluded() {
        // One fresh sensor plus one two-hour-old sensor must yield the fresh
        // sensor's exact value, not an average.
        let observations = vec![
            sensor(1, 14.0, 40.01, -74.0, 5),
            sensor(2, 80.0, 40.02, -74.0, 120),
        ];
        let fused = fuse_observations(40.0, -74.0, observations, Utc::now()).unwrap();
        assert_eq!(fused.sensor_count, 1);
        assert_eq!(fused.pm25, 14.0);
    }

    #[test]
    fn test_all_stale_yields_no_estimate() {
        let observations = vec![
            sensor(1, 14.0, 40.01, -74.0, 61),
            sensor(2, 20.0, 40.02, -74.0, 180),
        ];
        assert!(fuse_observations(40.0, -74.0, observations, Utc::now()).is_none());
    }

    #[test]
    fn test_no_observations_yields_no_estimate() {
        assert!(fuse_observations(40.0, -74.0, Vec::new(), Utc::now()).is_none());
    }

    #[test]
    fn test_equidistant_sensors_average_evenly() {
        let observations = vec![
            sensor(1, 10.0, 40.01, -74.0, 5),
            sensor(2, 30.0, 39.99, -74.0, 5),
        ];
        let fused = fuse_observations(40.0, -74.0, observations, Utc::now()).unwrap();
        assert_eq!(fused.sensor_count, 2);
        assert!((fused.pm25 - 20.0).abs() < 0.2);
    }

    #[test]
    fn test_nearer_sensor_dominates() {
        // ~1 km away vs ~10 km away: the close sensor should pull the fused
        // value strongly toward itself without fully suppressing the other.
        let observations = vec![
            sensor(1, 10.0, 40.009, -74.0, 5),
            sensor(2, 50.0, 40.09, -74.0, 5),
        ];
        let fused = fuse_observations(40.0, -74.0, observations, Utc::now()).unwrap();
        assert!(fused.pm25 > 10.0 && fused.pm25 < 20.0, "pm25 = {}", fused.pm25);
    }

    #[test]
    fn test_contributing_sensors_are_reported() {
        let observations = vec![
            sensor(1, 12.0, 40.0, -74.0, 1),
            sensor(2, 16.0, 40.01, -74.01, 2),
            sensor(3, 18.0, 39.99, -73.99, 3),
        ];
        let fused = fuse_observations(40.0, -74.0, observations, Utc::now()).unwrap();
        assert_eq!(fused.sensors.len(), 3);
        assert_eq!(fused.sensor_count, fused.sensors.len());
    }
}
