pub mod config;
pub mod decision;
pub mod record;
pub mod types;

pub use config::{Config, ConfigError, HomeLocation, HoneywellConfig, Thresholds};
pub use decision::{Decision, DecisionEngine, PlannedUpdate, ThermostatChange, ROOM_HEAT_SETPOINT_F};
pub use record::LogRecord;
pub use types::{
    celsius_to_fahrenheit, ChangeableValues, SensorReading, SetpointStatus, ThermostatMode,
    ThermostatUpdate,
};
