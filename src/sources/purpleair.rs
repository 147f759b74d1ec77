//! PurpleAir client (crowd-sourced sensor network)
//!
//! Lists sensors inside a bounding box around the target coordinate and
//! normalizes the positional row format into [`SensorObservation`]s. The
//! spatial reconciler decides which of those to trust.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{SensorSource, SourceResult, Unavailable};
use crate::models::SensorObservation;

const BASE_URL: &str = "https://api.purpleair.com/v1";

/// Requested sensor fields. The API echoes rows positionally in this order,
/// preceded by the sensor index.
const SENSOR_FIELDS: &str = "name,last_seen,pm2.5_atm,pm2.5_cf_1,latitude,longitude";

/// One degree of latitude in kilometers.
const KM_PER_DEGREE_LAT: f64 = 111.0;

pub struct PurpleAirClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SensorsResponse {
    data: Vec<Vec<Value>>,
}

impl PurpleAirClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("airsense/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build PurpleAir HTTP client")?;

        Ok(Self { client, api_key })
    }

    /// Rows arrive as positional arrays: sensor index first, then the
    /// requested fields in order. Rows missing a required field are skipped.
    fn parse_row(row: &[Value]) -> Option<SensorObservation> {
        let id = row.first()?.as_u64()?;
        let name = row.get(1)?.as_str()?.to_string();
        let last_seen = row.get(2)?.as_i64()?;
        let pm25_atm = row.get(3).and_then(Value::as_f64);
        let pm25_cf1 = row.get(4).and_then(Value::as_f64);
        let latitude = row.get(5)?.as_f64()?;
        let longitude = row.get(6)?.as_f64()?;

        // Prefer the atmospheric-corrected channel, fall back to raw CF=1.
        let pm25 = pm25_atm.or(pm25_cf1)?;

        Some(SensorObservation {
            id,
            name,
            pm25: pm25 as f32,
            latitude,
            longitude,
            last_seen: DateTime::<Utc>::from_timestamp(last_seen, 0)?,
        })
    }
}

#[async_trait]
impl SensorSource for PurpleAirClient {
    #[instrument(skip(self))]
    async fn sensors_in_area(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> SourceResult<Vec<SensorObservation>> {
        // Bounding box around the target; longitude degrees shrink with
        // latitude.
        let dlat = radius_km / KM_PER_DEGREE_LAT;
        let dlon = radius_km / (KM_PER_DEGREE_LAT * lat.to_radians().cos());

        let response = self
            .client
            .get(format!("{BASE_URL}/sensors"))
            .header("X-API-Key", &self.api_key)
            .query(&[("fields", SENSOR_FIELDS)])
            .query(&[("location_type", 0)])
            .query(&[
                ("nwlat", lat + dlat),
                ("nwlng", lon - dlon),
                ("selat", lat - dlat),
                ("selng", lon + dlon),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let body: SensorsResponse = response
            .json()
            .await
            .map_err(|e| Unavailable::Malformed(e.to_string()))?;

        let total = body.data.len();
        let sensors: Vec<SensorObservation> = body
            .data
            .iter()
            .filter_map(|row| Self::parse_row(row))
            .collect();

        if sensors.len() < total {
            debug!(
                dropped = total - sensors.len(),
                "skipped sensor rows with missing fields"
            );
        }
        debug!(count = sensors.len(), "PurpleAir sensors received");

        Ok(sensors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_row_with_all_fields() {
        let row = vec![
            json!(131_075),
            json!("Maple St rooftop"),
            json!(1_756_500_000_i64),
            json!(12.4),
            json!(13.1),
            json!(40.7128),
            json!(-74.006),
        ];
        let obs = PurpleAirClient::parse_row(&row).unwrap();
        assert_eq!(obs.id, 131_075);
        assert_eq!(obs.name, "Maple St rooftop");
        assert_eq!(obs.pm25, 12.4);
        assert_eq!(obs.latitude, 40.7128);
    }

    #[test]
    fn test_parse_row_falls_back_to_cf1_channel() {
        let row = vec![
            json!(7),
            json!("backyard"),
            json!(1_756_500_000_i64),
            Value::Null,
            json!(9.8),
            json!(40.0),
            json!(-74.0),
        ];
        let obs = PurpleAirClient::parse_row(&row).unwrap();
        assert!((obs.pm25 - 9.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_short_row_is_skipped() {
        let row = vec![json!(7), json!("truncated")];
        assert!(PurpleAirClient::parse_row(&row).is_none());
    }

    #[test]
    fn test_wire_format_deserializes() {
        let body = r#"{
            "fields": ["sensor_index","name","last_seen","pm2.5_atm","pm2.5_cf_1","latitude","longitude"],
            "data": [
                [11, "one", 1756500000, 5.5, 5.9, 40.71, -74.0],
                [12, "two", 1756500100, null, null, 40.72, -74.01]
            ]
        }"#;
        let parsed: SensorsResponse = serde_json::from_str(body).unwrap();
        let sensors: Vec<SensorObservation> = parsed
            .data
            .iter()
            .filter_map(|row| PurpleAirClient::parse_row(row))
            .collect();
        // The second row has no PM2.5 on either channel and is dropped.
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].id, 11);
    }
}
