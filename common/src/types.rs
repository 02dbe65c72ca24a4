use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermostatMode {
    Heat,
    Cool,
    Auto,
    Off,
    EmergencyHeat,
}

impl ThermostatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heat => "Heat",
            Self::Cool => "Cool",
            Self::Auto => "Auto",
            Self::Off => "Off",
            Self::EmergencyHeat => "EmergencyHeat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetpointStatus {
    NoHold,
    TemporaryHold,
    HoldUntil,
    PermanentHold,
    VacationHold,
}

impl SetpointStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoHold => "NoHold",
            Self::TemporaryHold => "TemporaryHold",
            Self::HoldUntil => "HoldUntil",
            Self::PermanentHold => "PermanentHold",
            Self::VacationHold => "VacationHold",
        }
    }
}

/// Vendor `changeableValues`. Unmodelled fields round-trip through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeableValues {
    pub mode: ThermostatMode,
    #[serde(rename = "heatSetpoint")]
    pub heat_setpoint: f64,
    #[serde(rename = "coolSetpoint")]
    pub cool_setpoint: f64,
    #[serde(rename = "thermostatSetpointStatus")]
    pub thermostat_setpoint_status: SetpointStatus,
    #[serde(rename = "emergencyHeatActive")]
    pub emergency_heat_active: bool,
    #[serde(
        rename = "nextPeriodTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_period_time: Option<NaiveTime>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermostatUpdate {
    pub mode: Option<ThermostatMode>,
    pub heat_setpoint: Option<f64>,
    pub thermostat_setpoint_status: Option<SetpointStatus>,
    pub emergency_heat_active: Option<bool>,
}

impl ThermostatUpdate {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.heat_setpoint.is_none()
            && self.thermostat_setpoint_status.is_none()
            && self.emergency_heat_active.is_none()
    }

    pub fn apply_to(&self, current: &ChangeableValues) -> ChangeableValues {
        let mut merged = current.clone();
        if let Some(mode) = self.mode {
            merged.mode = mode;
        }
        if let Some(heat_setpoint) = self.heat_setpoint {
            merged.heat_setpoint = heat_setpoint;
        }
        if let Some(status) = self.thermostat_setpoint_status {
            merged.thermostat_setpoint_status = status;
        }
        if let Some(active) = self.emergency_heat_active {
            merged.emergency_heat_active = active;
        }
        merged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "temperatureF")]
    pub temperature_f: f64,
    #[serde(rename = "relativeHumidity")]
    pub relative_humidity: f64,
}

impl SensorReading {
    pub fn from_celsius(temperature_c: f64, relative_humidity: f64) -> Self {
        Self {
            temperature_f: celsius_to_fahrenheit(temperature_c),
            relative_humidity,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.temperature_f.is_finite()
            && self.relative_humidity.is_finite()
            && (0.0..=100.0).contains(&self.relative_humidity)
    }
}

pub fn celsius_to_fahrenheit(temp_c: f64) -> f64 {
    temp_c * 9.0 / 5.0 + 32.0
}
