use airsense::{AirSenseConfig, DataService, HealthProfile};
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AirSenseConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AirSenseConfig::load()?;
    init_logging(&config);

    // airsense [lat] [lon] [profile]
    let args: Vec<String> = std::env::args().collect();
    let lat: f64 = args
        .get(1)
        .map_or(Ok(config.defaults.latitude), |s| s.parse())
        .context("latitude must be a number")?;
    let lon: f64 = args
        .get(2)
        .map_or(Ok(config.defaults.longitude), |s| s.parse())
        .context("longitude must be a number")?;
    let profile: HealthProfile = args
        .get(3)
        .map_or("respiratory-sensitive", String::as_str)
        .parse()?;

    let service = DataService::from_config(&config)?;
    info!(lat, lon, %profile, "running assessment");

    let conditions = service.current_conditions(lat, lon).await;
    let best = service.best_available_aqi(lat, lon).await;
    let assessment = service.risk_assessment(profile, lat, lon).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "conditions": conditions,
            "best_available": best,
            "assessment": assessment,
        }))?
    );

    Ok(())
}
