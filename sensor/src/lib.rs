pub mod device;

use std::path::PathBuf;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use tempcontrol_common::config::{invalid, parse_optional};
use tempcontrol_common::{ConfigError, SensorReading};

pub use device::{device_address, Measurement, Mode, Sht4xError, Sht4xSensor, DEFAULT_ADDRESS};

pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";

pub const ENV_SENSOR_I2C_BUS: &str = "SENSOR_I2C_BUS";
pub const ENV_SENSOR_I2C_ADDRESS: &str = "SENSOR_I2C_ADDRESS";
pub const ENV_SENSOR_MODE: &str = "SENSOR_MODE";

pub trait RoomSensor {
    type Error: std::error::Error + Send + Sync + 'static;

    fn read(&mut self) -> Result<SensorReading, Self::Error>;
}

impl<I2C, D> RoomSensor for Sht4xSensor<I2C, D>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
{
    type Error = Sht4xError<I2C::Error>;

    fn read(&mut self) -> Result<SensorReading, Self::Error> {
        let Measurement {
            temperature_c,
            relative_humidity,
        } = self.measure()?;
        Ok(SensorReading::from_celsius(temperature_c, relative_humidity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfig {
    pub i2c_bus: PathBuf,
    pub address: u8,
    pub mode: Mode,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: PathBuf::from(DEFAULT_I2C_BUS),
            address: DEFAULT_ADDRESS,
            mode: Mode::default(),
        }
    }
}

impl SensorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let address = match lookup(ENV_SENSOR_I2C_ADDRESS).filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_address(&raw)?,
            None => defaults.address,
        };

        Ok(Self {
            i2c_bus: parse_optional::<PathBuf>(&lookup, ENV_SENSOR_I2C_BUS)?
                .unwrap_or(defaults.i2c_bus),
            address,
            mode: parse_optional::<Mode>(&lookup, ENV_SENSOR_MODE)?.unwrap_or(defaults.mode),
        })
    }
}

fn parse_address(raw: &str) -> Result<u8, ConfigError> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => trimmed.parse::<u8>(),
    }
    .map_err(|err| invalid(ENV_SENSOR_I2C_ADDRESS, raw, &err.to_string()))?;

    if device_address(parsed).is_none() {
        return Err(invalid(
            ENV_SENSOR_I2C_ADDRESS,
            raw,
            "SHT4x answers on 0x44 or 0x45",
        ));
    }
    Ok(parsed)
}

#[cfg(target_os = "linux")]
pub type LinuxSht4x = Sht4xSensor<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay>;

#[cfg(target_os = "linux")]
pub fn open_linux(config: &SensorConfig) -> anyhow::Result<LinuxSht4x> {
    use anyhow::Context;

    let address = device_address(config.address)
        .with_context(|| format!("no SHT4x address {:#04x}", config.address))?;
    let bus = linux_embedded_hal::I2cdev::new(&config.i2c_bus)
        .with_context(|| format!("failed to open i2c bus {}", config.i2c_bus.display()))?;
    Ok(Sht4xSensor::new(
        bus,
        linux_embedded_hal::Delay,
        address,
        config.mode,
    ))
}
