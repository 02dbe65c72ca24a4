use anyhow::{ensure, Context};
use chrono::Utc;
use tracing::info;

use tempcontrol_common::{DecisionEngine, LogRecord};
use tempcontrol_sensor::RoomSensor;

use crate::{
    honeywell::{ChangeRequest, DeviceTarget, ThermostatApi},
    store::LogStore,
};

#[derive(Debug)]
pub struct RunOutcome {
    pub record_id: u64,
    pub record: LogRecord,
    pub updates_sent: usize,
}

pub async fn run_once<A, S>(
    api: &mut A,
    mut sensor: S,
    store: &LogStore,
    engine: &DecisionEngine,
) -> anyhow::Result<RunOutcome>
where
    A: ThermostatApi + ?Sized,
    S: RoomSensor + Send + 'static,
{
    api.authenticate()
        .await
        .context("failed to authenticate with Honeywell")?;

    let locations = api.locations().await.context("failed to list locations")?;
    let target = DeviceTarget::first(&locations)?;
    info!(
        location_id = target.location_id,
        device_id = %target.device_id,
        "selected thermostat"
    );

    let thermostat = api
        .thermostat(&target)
        .await
        .context("failed to read thermostat")?;
    let outdoor = thermostat.outdoor_temperature;
    ensure!(
        outdoor.is_finite(),
        "thermostat reported a non-finite outdoor temperature"
    );
    let snapshot = thermostat.changeable_values;
    info!(
        outdoor_temperature = outdoor,
        mode = snapshot.mode.as_str(),
        hold = snapshot.thermostat_setpoint_status.as_str(),
        emergency_heat = snapshot.emergency_heat_active,
        "thermostat state"
    );

    // Heater modes sleep for over a second inside the driver.
    let reading = tokio::task::spawn_blocking(move || sensor.read())
        .await
        .context("sensor task panicked")?
        .context("failed to read room sensor")?;
    info!(
        room_temperature = reading.temperature_f,
        room_humidity = reading.relative_humidity,
        "room reading"
    );

    let decision = engine.evaluate(reading.temperature_f, outdoor, &snapshot);

    let mut known = snapshot.clone();
    for planned in &decision.updates {
        let merged = planned.update.apply_to(&known);
        api.update_thermostat(&target, &ChangeRequest::from(&merged))
            .await
            .with_context(|| format!("failed to apply {}", planned.change))?;
        info!(change = %planned.change, "thermostat updated");
        known = merged;
    }

    let record = LogRecord::new(decision.change(), outdoor, &reading, snapshot, Utc::now());
    let record_id = store
        .insert(&record)
        .await
        .with_context(|| format!("failed to append to {}", store.path().display()))?;

    Ok(RunOutcome {
        record_id,
        record,
        updates_sent: decision.updates.len(),
    })
}
