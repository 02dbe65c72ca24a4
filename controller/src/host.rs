use anyhow::Context;
use tracing::{debug, info, warn};

use tempcontrol_common::{Config, DecisionEngine};
use tempcontrol_sensor::SensorConfig;

use crate::{honeywell::HoneywellClient, pipeline, store::LogStore};

pub async fn run() -> anyhow::Result<()> {
    // Loaded before the subscriber so RUST_LOG may come from .env.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("failed to load .env: {err}"),
    }

    let config = Config::from_env().context("invalid configuration")?;
    let sensor_config = SensorConfig::from_env().context("invalid sensor configuration")?;
    debug!(?config, ?sensor_config, "configuration loaded");

    let mut api = HoneywellClient::new(&config.honeywell)?;
    let sensor = open_sensor(&sensor_config)?;
    let store = LogStore::new(&config.store_dir);
    let engine = DecisionEngine::new(config.thresholds);

    let outcome = pipeline::run_once(&mut api, sensor, &store, &engine).await?;

    info!(
        record_id = outcome.record_id,
        change = %outcome.record.thermostat_change,
        updates = outcome.updates_sent,
        "run complete"
    );
    Ok(())
}

#[cfg(target_os = "linux")]
fn open_sensor(config: &SensorConfig) -> anyhow::Result<tempcontrol_sensor::LinuxSht4x> {
    tempcontrol_sensor::open_linux(config)
}

#[cfg(not(target_os = "linux"))]
fn open_sensor(_config: &SensorConfig) -> anyhow::Result<NoSensor> {
    anyhow::bail!("the SHT4x sensor needs a Linux i2c character device")
}

#[cfg(not(target_os = "linux"))]
enum NoSensor {}

#[cfg(not(target_os = "linux"))]
impl tempcontrol_sensor::RoomSensor for NoSensor {
    type Error = std::convert::Infallible;

    fn read(&mut self) -> Result<tempcontrol_common::SensorReading, Self::Error> {
        match *self {}
    }
}
