//! Personalized health-risk scoring
//!
//! Pure functions over immutable inputs: a weighted factor score, a diurnal
//! forecast projection, and threshold-laddered recommendations. The forecast
//! is a deterministic heuristic that swings the current index along a
//! day-shaped sine curve; it is not a dispersion model and must not be
//! presented as measured data.

use chrono::Utc;

use crate::models::{
    AirQualityReading, ContributingFactors, ForecastPoint, HealthProfile, Recommendation,
    RiskBand, RiskScore, Severity, WeatherReading,
};

/// Factor weights. Particulate load dominates; the weather factors capture
/// how strongly the atmosphere traps or disperses it. Must sum to 1.0.
const PM25_WEIGHT: f64 = 0.6;
const HEAT_WEIGHT: f64 = 0.2;
const HUMIDITY_WEIGHT: f64 = 0.1;
const WIND_WEIGHT: f64 = 0.1;

/// Points in a forecast: now plus 12 hourly steps.
pub const FORECAST_POINTS: usize = 13;

/// Peak amplitude of the modeled diurnal index swing.
const DIURNAL_AQI_AMPLITUDE: f64 = 30.0;

/// At most this many recommendations are retained per request.
pub const MAX_RECOMMENDATIONS: usize = 4;

/// Compute the risk score for one profile from reconciled conditions.
///
/// Each factor is normalized to 0-100 before weighting; the profile
/// multiplier is applied last and the result capped at 100. Band follows
/// from the score alone.
#[must_use]
pub fn calculate_risk_score(
    profile: HealthProfile,
    air: &AirQualityReading,
    weather: &WeatherReading,
) -> RiskScore {
    // PM2.5 on a 0-100 scale; 250 µg/m³ and above counts as saturated.
    let pm25_normalized = (f64::from(air.pm25) / 250.0 * 100.0).min(100.0);

    // Heat adds risk above 30°C.
    let heat_factor = ((f64::from(weather.temperature) - 30.0) / 20.0).max(0.0);

    // Very dry or very humid air both add risk.
    let humidity = f64::from(weather.humidity);
    let humidity_factor = if humidity < 30.0 {
        (30.0 - humidity) / 30.0
    } else if humidity > 70.0 {
        (humidity - 70.0) / 30.0
    } else {
        0.0
    };

    // Still air means less dispersion.
    let wind_factor = ((5.0 - f64::from(weather.wind_speed)) / 5.0).max(0.0);

    let raw_score = pm25_normalized * PM25_WEIGHT
        + heat_factor * 100.0 * HEAT_WEIGHT
        + humidity_factor * 100.0 * HUMIDITY_WEIGHT
        + wind_factor * 100.0 * WIND_WEIGHT;

    let score = (raw_score * profile.multiplier()).round().min(100.0) as u8;

    RiskScore {
        profile,
        score,
        band: RiskBand::from_score(score),
        aqi: air.aqi,
        factors: ContributingFactors {
            particulate: pm25_normalized.round() as u8,
            heat: (heat_factor * 100.0).round().min(100.0) as u8,
            humidity: (humidity_factor * 100.0).round().min(100.0) as u8,
            wind: (wind_factor * 100.0).round().min(100.0) as u8,
        },
        computed_at: Utc::now(),
    }
}

/// Project the index forward from `now_hour` (0-23) over the next 12 hours.
///
/// The index is assumed to peak near midday and trough near midnight;
/// strain follows the projected index scaled by the profile multiplier.
/// Always returns exactly [`FORECAST_POINTS`] points in chronological order.
#[must_use]
pub fn generate_forecast(
    profile: HealthProfile,
    current_aqi: u16,
    now_hour: u32,
) -> Vec<ForecastPoint> {
    (0..FORECAST_POINTS)
        .map(|step| {
            let hour = if step == 0 {
                "Now".to_string()
            } else {
                format!("{step}h")
            };

            let hour_of_day = (now_hour as usize + step) % 24;
            let time_factor =
                ((hour_of_day as f64 - 6.0) * std::f64::consts::PI / 12.0).sin();
            let variation = (DIURNAL_AQI_AMPLITUDE * time_factor).round();

            let aqi = (f64::from(current_aqi) + variation).clamp(0.0, 500.0) as u16;
            let strain = ((f64::from(aqi) / 500.0 * 100.0) * profile.multiplier())
                .round()
                .min(100.0) as u8;

            ForecastPoint { hour, strain, aqi }
        })
        .collect()
}

/// Generate guidance for a profile: one general index-tier message first,
/// then one profile-specific message from that profile's threshold ladder.
/// Ordering and the 4-entry cap are part of the contract.
#[must_use]
pub fn recommendations(
    profile: HealthProfile,
    risk_score: u8,
    aqi: u16,
) -> Vec<Recommendation> {
    let mut recs = vec![general_recommendation(aqi)];
    recs.push(profile_recommendation(profile, risk_score));
    recs.truncate(MAX_RECOMMENDATIONS);
    recs
}

fn general_recommendation(aqi: u16) -> Recommendation {
    if aqi > 150 {
        Recommendation::new(
            "aqi-hazard",
            format!("Current AQI ({aqi}) is in the hazardous range. Avoid all outdoor activity."),
            Severity::Hazard,
        )
    } else if aqi > 100 {
        Recommendation::new(
            "aqi-elevated",
            format!("AQI is elevated ({aqi}). Limit outdoor exposure and wear a mask outdoors."),
            Severity::Warn,
        )
    } else if aqi <= 50 {
        Recommendation::new(
            "aqi-good",
            "Air quality is good. Normal activities are fine.",
            Severity::Safe,
        )
    } else {
        Recommendation::new(
            "aqi-moderate",
            "Air quality is moderate. Sensitive individuals should limit prolonged outdoor exertion.",
            Severity::Safe,
        )
    }
}

fn profile_recommendation(profile: HealthProfile, risk_score: u8) -> Recommendation {
    match profile {
        HealthProfile::RespiratorySensitive => {
            if risk_score > 60 {
                Recommendation::new(
                    "respiratory-hazard",
                    "High risk of bronchospasm. Keep a rescue inhaler accessible and use preventive medication as prescribed.",
                    Severity::Hazard,
                )
            } else if risk_score > 30 {
                Recommendation::new(
                    "respiratory-caution",
                    "Moderate risk. Consider pre-treatment before any outdoor activity.",
                    Severity::Warn,
                )
            } else {
                Recommendation::new(
                    "respiratory-ok",
                    "Low risk today. Continue normal respiratory management.",
                    Severity::Safe,
                )
            }
        }
        HealthProfile::Elderly => {
            if risk_score > 50 {
                Recommendation::new(
                    "elderly-caution",
                    "Monitor blood pressure more often while air quality is poor. Stay in air-conditioned spaces.",
                    Severity::Warn,
                )
            } else {
                Recommendation::new(
                    "elderly-ok",
                    "Monitor health closely. Stay hydrated and avoid strenuous activity.",
                    Severity::Safe,
                )
            }
        }
        HealthProfile::Infant => {
            if risk_score > 40 {
                Recommendation::new(
                    "infant-hazard",
                    "Keep the infant indoors with HEPA filtration running. Monitor breathing rate.",
                    Severity::Hazard,
                )
            } else {
                Recommendation::new(
                    "infant-caution",
                    "Limit outdoor time. Ensure the nursery has good air filtration.",
                    Severity::Warn,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;
    use chrono::Utc;

    fn air(aqi: u16, pm25: f32) -> AirQualityReading {
        AirQualityReading {
            aqi,
            pm25,
            pm10: None,
            ozone: None,
            observed_at: Utc::now(),
            source: Provenance::OpenWeather,
        }
    }

    fn weather(temperature: f32, humidity: f32, wind_speed: f32) -> WeatherReading {
        WeatherReading {
            temperature,
            humidity,
            wind_speed,
            wind_direction: 180,
            visibility_km: 10.0,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_factor_weights_sum_to_one() {
        assert!(
            (PM25_WEIGHT + HEAT_WEIGHT + HUMIDITY_WEIGHT + WIND_WEIGHT - 1.0).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn test_severe_conditions_put_infant_in_high_band() {
        // Heavy particulates, hot, dry, still air.
        let score = calculate_risk_score(
            HealthProfile::Infant,
            &air(250, 200.0),
            &weather(36.0, 22.0, 0.5),
        );
        assert_eq!(score.band, RiskBand::High);
        assert!(score.score > 60);
        assert!(score.score <= 100);
    }

    #[test]
    fn test_moderate_conditions_put_elderly_in_moderate_band() {
        let score = calculate_risk_score(
            HealthProfile::Elderly,
            &air(174, 100.0),
            &weather(31.0, 35.0, 1.0),
        );
        assert_eq!(score.band, RiskBand::Moderate);
    }

    #[test]
    fn test_clean_conditions_score_low() {
        let score = calculate_risk_score(
            HealthProfile::RespiratorySensitive,
            &air(33, 8.0),
            &weather(20.0, 50.0, 6.0),
        );
        assert_eq!(score.band, RiskBand::Low);
        assert_eq!(score.factors.heat, 0);
        assert_eq!(score.factors.humidity, 0);
        assert_eq!(score.factors.wind, 0);
    }

    #[test]
    fn test_multiplier_orders_profiles() {
        let air = air(150, 55.0);
        let weather = weather(32.0, 25.0, 2.0);
        let infant = calculate_risk_score(HealthProfile::Infant, &air, &weather);
        let respiratory =
            calculate_risk_score(HealthProfile::RespiratorySensitive, &air, &weather);
        let elderly = calculate_risk_score(HealthProfile::Elderly, &air, &weather);
        assert!(infant.score > respiratory.score);
        assert!(respiratory.score > elderly.score);
    }

    #[test]
    fn test_band_always_matches_score() {
        for pm25 in [0.0_f32, 40.0, 90.0, 180.0, 400.0] {
            let score = calculate_risk_score(
                HealthProfile::Infant,
                &air(100, pm25),
                &weather(34.0, 20.0, 1.0),
            );
            assert_eq!(score.band, RiskBand::from_score(score.score));
        }
    }

    #[test]
    fn test_forecast_has_thirteen_chronological_points() {
        let forecast = generate_forecast(HealthProfile::Elderly, 120, 9);
        assert_eq!(forecast.len(), FORECAST_POINTS);
        assert_eq!(forecast[0].hour, "Now");
        assert_eq!(forecast[1].hour, "1h");
        assert_eq!(forecast[12].hour, "12h");
    }

    #[test]
    fn test_forecast_strain_stays_in_bounds() {
        for hour in 0..24 {
            for &aqi in &[0_u16, 50, 205, 500] {
                let forecast = generate_forecast(HealthProfile::Infant, aqi, hour);
                for point in &forecast {
                    assert!(point.strain <= 100);
                    assert!(point.aqi <= 500);
                }
            }
        }
    }

    #[test]
    fn test_forecast_index_never_goes_negative() {
        // At midnight the sine trough subtracts the full amplitude; a small
        // current index must clamp to zero instead of wrapping.
        let forecast = generate_forecast(HealthProfile::Elderly, 5, 0);
        assert_eq!(forecast[0].aqi, 0);
    }

    #[test]
    fn test_forecast_peaks_near_midday() {
        let forecast = generate_forecast(HealthProfile::Elderly, 100, 6);
        // Step 6 lands on hour 12, the sine peak.
        assert_eq!(forecast[6].aqi, 130);
        assert_eq!(forecast[0].aqi, 100);
    }

    #[test]
    fn test_hazardous_aqi_leads_recommendations() {
        let recs = recommendations(HealthProfile::Elderly, 45, 168);
        assert_eq!(recs[0].severity, Severity::Hazard);
        assert_eq!(recs[0].id, "aqi-hazard");
        assert!(recs.len() <= MAX_RECOMMENDATIONS);
    }

    #[test]
    fn test_general_guidance_precedes_profile_guidance() {
        let recs = recommendations(HealthProfile::Infant, 70, 168);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].id.starts_with("aqi-"));
        assert!(recs[1].id.starts_with("infant-"));
        assert_eq!(recs[1].severity, Severity::Hazard);
    }

    #[test]
    fn test_general_guidance_tiers() {
        assert_eq!(recommendations(HealthProfile::Elderly, 10, 40)[0].id, "aqi-good");
        assert_eq!(
            recommendations(HealthProfile::Elderly, 10, 80)[0].id,
            "aqi-moderate"
        );
        assert_eq!(
            recommendations(HealthProfile::Elderly, 10, 120)[0].id,
            "aqi-elevated"
        );
        assert_eq!(
            recommendations(HealthProfile::Elderly, 10, 151)[0].id,
            "aqi-hazard"
        );
    }

    #[test]
    fn test_respiratory_ladder_has_three_tiers() {
        assert_eq!(
            recommendations(HealthProfile::RespiratorySensitive, 65, 40)[1].severity,
            Severity::Hazard
        );
        assert_eq!(
            recommendations(HealthProfile::RespiratorySensitive, 45, 40)[1].severity,
            Severity::Warn
        );
        assert_eq!(
            recommendations(HealthProfile::RespiratorySensitive, 20, 40)[1].severity,
            Severity::Safe
        );
    }
}
