use anyhow::Context;
use tracing::{debug, info, warn};

use tempcontrol_sensor::{open_linux, RoomSensor, SensorConfig};

pub fn run() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("failed to load .env: {err}"),
    }

    let config = SensorConfig::from_env().context("invalid sensor configuration")?;
    info!(
        bus = %config.i2c_bus.display(),
        address = %format!("{:#04x}", config.address),
        mode = %config.mode,
        "opening SHT4x"
    );

    let mut sensor = open_linux(&config)?;
    sensor.soft_reset().context("SHT4x soft reset failed")?;

    match sensor.serial_number() {
        Ok(serial) => info!("SHT4x serial number {serial:#010x}"),
        Err(err) => warn!("could not read SHT4x serial number: {err}"),
    }

    let reading = sensor.read().context("SHT4x measurement failed")?;
    info!(
        temperature_f = reading.temperature_f,
        relative_humidity = reading.relative_humidity,
        "room reading"
    );

    println!("{}", serde_json::to_string(&reading)?);
    Ok(())
}
