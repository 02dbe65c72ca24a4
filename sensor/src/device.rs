use std::fmt;
use std::str::FromStr;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use ::sht4x::{Address, HeatingDuration, HeatingPower, Precision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    HighPrecision,
    MediumPrecision,
    LowPrecision,
    HighHeat1s,
    HighHeat100ms,
    MediumHeat1s,
    MediumHeat100ms,
    LowHeat1s,
    LowHeat100ms,
}

// Heater modes warm the die before sampling to drive off condensation.
enum Command {
    Measure(Precision),
    HeatAndMeasure(HeatingPower, HeatingDuration),
}

impl Mode {
    pub const ALL: [Mode; 9] = [
        Self::HighPrecision,
        Self::MediumPrecision,
        Self::LowPrecision,
        Self::HighHeat1s,
        Self::HighHeat100ms,
        Self::MediumHeat1s,
        Self::MediumHeat100ms,
        Self::LowHeat1s,
        Self::LowHeat100ms,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighPrecision => "high",
            Self::MediumPrecision => "medium",
            Self::LowPrecision => "low",
            Self::HighHeat1s => "high-heat-1s",
            Self::HighHeat100ms => "high-heat-100ms",
            Self::MediumHeat1s => "medium-heat-1s",
            Self::MediumHeat100ms => "medium-heat-100ms",
            Self::LowHeat1s => "low-heat-1s",
            Self::LowHeat100ms => "low-heat-100ms",
        }
    }

    fn command(self) -> Command {
        use HeatingDuration::{Long, Short};
        match self {
            Self::HighPrecision => Command::Measure(Precision::High),
            Self::MediumPrecision => Command::Measure(Precision::Medium),
            Self::LowPrecision => Command::Measure(Precision::Low),
            Self::HighHeat1s => Command::HeatAndMeasure(HeatingPower::High, Long),
            Self::HighHeat100ms => Command::HeatAndMeasure(HeatingPower::High, Short),
            Self::MediumHeat1s => Command::HeatAndMeasure(HeatingPower::Medium, Long),
            Self::MediumHeat100ms => Command::HeatAndMeasure(HeatingPower::Medium, Short),
            Self::LowHeat1s => Command::HeatAndMeasure(HeatingPower::Low, Long),
            Self::LowHeat100ms => Command::HeatAndMeasure(HeatingPower::Low, Short),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown SHT4x mode {0:?}")]
pub struct UnknownMode(String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == lower)
            .ok_or_else(|| UnknownMode(value.to_string()))
    }
}

pub const DEFAULT_ADDRESS: u8 = 0x44;
pub const ALTERNATE_ADDRESS: u8 = 0x45;

pub fn device_address(raw: u8) -> Option<Address> {
    match raw {
        DEFAULT_ADDRESS => Some(Address::Address0x44),
        ALTERNATE_ADDRESS => Some(Address::Address0x45),
        _ => None,
    }
}

// The driver's error type has no std::error::Error impl.
#[derive(Debug, thiserror::Error)]
#[error("SHT4x transfer failed: {0:?}")]
pub struct Sht4xError<E: fmt::Debug>(pub ::sht4x::Error<E>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature_c: f64,
    pub relative_humidity: f64,
}

impl From<::sht4x::Measurement> for Measurement {
    fn from(raw: ::sht4x::Measurement) -> Self {
        Self {
            temperature_c: f64::from(raw.temperature_milli_celsius()) / 1000.0,
            // The conversion formula overshoots [0, 100] at the ends of the range.
            relative_humidity: (f64::from(raw.humidity_milli_percent()) / 1000.0)
                .clamp(0.0, 100.0),
        }
    }
}

pub struct Sht4xSensor<I2C, D> {
    device: ::sht4x::Sht4x<I2C, D>,
    delay: D,
    mode: Mode,
}

impl<I2C, D> Sht4xSensor<I2C, D>
where
    I2C: I2c,
    I2C::Error: fmt::Debug,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D, address: Address, mode: Mode) -> Self {
        Self {
            device: ::sht4x::Sht4x::new_with_address(i2c, address),
            delay,
            mode,
        }
    }

    pub fn soft_reset(&mut self) -> Result<(), Sht4xError<I2C::Error>> {
        self.device.soft_reset(&mut self.delay).map_err(Sht4xError)
    }

    pub fn serial_number(&mut self) -> Result<u32, Sht4xError<I2C::Error>> {
        self.device.serial_number(&mut self.delay).map_err(Sht4xError)
    }

    pub fn measure(&mut self) -> Result<Measurement, Sht4xError<I2C::Error>> {
        let raw = match self.mode.command() {
            Command::Measure(precision) => self.device.measure(precision, &mut self.delay),
            Command::HeatAndMeasure(power, duration) => {
                self.device
                    .heat_and_measure(power, duration, &mut self.delay)
            }
        }
        .map_err(Sht4xError)?;
        Ok(raw.into())
    }
}
