use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    config::Thresholds,
    types::{ChangeableValues, SetpointStatus, ThermostatMode, ThermostatUpdate},
};

pub const ROOM_HEAT_SETPOINT_F: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ThermostatChange {
    None,
    RoomHeatBegin,
    RoomHeatEnd,
    ToggleEHeat(bool),
}

impl fmt::Display for ThermostatChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::RoomHeatBegin => f.write_str("RoomHeatBegin"),
            Self::RoomHeatEnd => f.write_str("RoomHeatEnd"),
            Self::ToggleEHeat(true) => f.write_str("ToggleEHeat: True"),
            Self::ToggleEHeat(false) => f.write_str("ToggleEHeat: False"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown thermostat change label {0:?}")]
pub struct UnknownChange(pub String);

impl FromStr for ThermostatChange {
    type Err = UnknownChange;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "None" => Ok(Self::None),
            "RoomHeatBegin" => Ok(Self::RoomHeatBegin),
            "RoomHeatEnd" => Ok(Self::RoomHeatEnd),
            "ToggleEHeat: True" => Ok(Self::ToggleEHeat(true)),
            "ToggleEHeat: False" => Ok(Self::ToggleEHeat(false)),
            other => Err(UnknownChange(other.to_string())),
        }
    }
}

impl From<ThermostatChange> for String {
    fn from(change: ThermostatChange) -> Self {
        change.to_string()
    }
}

impl TryFrom<String> for ThermostatChange {
    type Error = UnknownChange;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub change: ThermostatChange,
    pub update: ThermostatUpdate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    pub updates: Vec<PlannedUpdate>,
}

impl Decision {
    // Last update issued wins.
    pub fn change(&self) -> ThermostatChange {
        self.updates
            .last()
            .map(|planned| planned.change)
            .unwrap_or(ThermostatChange::None)
    }

    pub fn is_noop(&self) -> bool {
        self.updates.is_empty()
    }

    fn push(&mut self, change: ThermostatChange, update: ThermostatUpdate) {
        self.updates.push(PlannedUpdate { change, update });
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    pub thresholds: Thresholds,
}

impl DecisionEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(
        &self,
        room_temp_f: f64,
        outdoor_temp_f: f64,
        current: &ChangeableValues,
    ) -> Decision {
        let mut decision = Decision::default();

        if room_temp_f < self.thresholds.room_temp_minimum_f {
            decision.push(
                ThermostatChange::RoomHeatBegin,
                ThermostatUpdate {
                    mode: Some(ThermostatMode::EmergencyHeat),
                    heat_setpoint: Some(ROOM_HEAT_SETPOINT_F),
                    thermostat_setpoint_status: Some(SetpointStatus::PermanentHold),
                    ..ThermostatUpdate::default()
                },
            );
            return decision;
        }

        if current.thermostat_setpoint_status == SetpointStatus::PermanentHold {
            decision.push(
                ThermostatChange::RoomHeatEnd,
                ThermostatUpdate {
                    thermostat_setpoint_status: Some(SetpointStatus::NoHold),
                    ..ThermostatUpdate::default()
                },
            );
        }

        let eheat_wanted = outdoor_temp_f < self.thresholds.eheat_outdoor_threshold_f;
        if eheat_wanted != current.emergency_heat_active {
            let mode = if eheat_wanted {
                ThermostatMode::EmergencyHeat
            } else {
                ThermostatMode::Heat
            };
            decision.push(
                ThermostatChange::ToggleEHeat(eheat_wanted),
                ThermostatUpdate {
                    mode: Some(mode),
                    emergency_heat_active: Some(eheat_wanted),
                    ..ThermostatUpdate::default()
                },
            );
        }

        decision
    }
}
