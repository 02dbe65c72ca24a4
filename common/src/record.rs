use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{decision::ThermostatChange, types::ChangeableValues, types::SensorReading};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "thermostatChange")]
    pub thermostat_change: ThermostatChange,
    #[serde(rename = "outdoorTemperature")]
    pub outdoor_temperature: f64,
    #[serde(rename = "roomTemperature")]
    pub room_temperature: f64,
    #[serde(rename = "roomHumidity")]
    pub room_humidity: f64,
    #[serde(rename = "thermostatStatus")]
    pub thermostat_status: ChangeableValues,
    #[serde(rename = "createdAt", with = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(
        change: ThermostatChange,
        outdoor_temperature: f64,
        reading: &SensorReading,
        thermostat_status: ChangeableValues,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            thermostat_change: change,
            outdoor_temperature,
            room_temperature: reading.temperature_f,
            room_humidity: reading.relative_humidity,
            thermostat_status,
            created_at,
        }
    }
}

mod created_at {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SetpointStatus, ThermostatMode};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(change: ThermostatChange) -> LogRecord {
        LogRecord::new(
            change,
            30.0,
            &SensorReading {
                temperature_f: 71.6,
                relative_humidity: 38.2,
            },
            ChangeableValues {
                mode: ThermostatMode::Heat,
                heat_setpoint: 68.0,
                cool_setpoint: 76.0,
                thermostat_setpoint_status: SetpointStatus::NoHold,
                emergency_heat_active: false,
                next_period_time: None,
                extra: serde_json::Map::new(),
            },
            Utc.with_ymd_and_hms(2026, 1, 12, 6, 30, 5).unwrap(),
        )
    }

    #[test]
    fn serializes_with_log_field_names() {
        let encoded = serde_json::to_value(record(ThermostatChange::ToggleEHeat(true))).unwrap();

        assert_eq!(
            encoded,
            json!({
                "thermostatChange": "ToggleEHeat: True",
                "outdoorTemperature": 30.0,
                "roomTemperature": 71.6,
                "roomHumidity": 38.2,
                "thermostatStatus": {
                    "mode": "Heat",
                    "heatSetpoint": 68.0,
                    "coolSetpoint": 76.0,
                    "thermostatSetpointStatus": "NoHold",
                    "emergencyHeatActive": false
                },
                "createdAt": "2026-01-12T06:30:05Z"
            })
        );
    }

    #[test]
    fn reads_back_written_record() {
        let original = record(ThermostatChange::None);
        let encoded = serde_json::to_string(&original).unwrap();

        let decoded: LogRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, original);
    }
}
