use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HONEYWELL_BASE_URL: &str = "https://api.honeywell.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const ENV_HONEYWELL_KEY: &str = "HONEYWELL_KEY";
pub const ENV_HONEYWELL_SECRET: &str = "HONEYWELL_SECRET";
pub const ENV_HONEYWELL_REFRESH: &str = "HONEYWELL_REFRESH";
pub const ENV_HONEYWELL_BASE_URL: &str = "HONEYWELL_BASE_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
pub const ENV_TINYDB_DIR: &str = "TINYDB_DIR";
pub const ENV_HOME_LATITUDE: &str = "HOME_LATITUDE";
pub const ENV_HOME_LONGITUDE: &str = "HOME_LONGITUDE";
pub const ENV_OPENWEATHER_KEY: &str = "OPENWEATHER_KEY";
pub const ENV_ROOM_TEMP_MINIMUM: &str = "ROOM_TEMP_MINIMUM";
pub const ENV_EHEAT_SETPOINT: &str = "EHEAT_SETPOINT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

// Both in °F.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub room_temp_minimum_f: f64,
    pub eheat_outdoor_threshold_f: f64,
}

#[derive(Clone)]
pub struct HoneywellConfig {
    pub api_key: String,
    pub api_secret: String,
    pub refresh_token: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for HoneywellConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoneywellConfig")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomeLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone)]
pub struct Config {
    pub honeywell: HoneywellConfig,
    pub store_dir: PathBuf,
    pub home: HomeLocation,
    // Unused; outdoor temperature comes from the thermostat.
    pub openweather_key: String,
    pub thresholds: Thresholds,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("honeywell", &self.honeywell)
            .field("store_dir", &self.store_dir)
            .field("home", &self.home)
            .field("openweather_key", &"<redacted>")
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout_secs: u64 =
            parse_optional(&lookup, ENV_HTTP_TIMEOUT_SECS)?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(invalid(ENV_HTTP_TIMEOUT_SECS, "0", "timeout must be positive"));
        }

        let base_url = lookup(ENV_HONEYWELL_BASE_URL)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HONEYWELL_BASE_URL.to_string());

        let honeywell = HoneywellConfig {
            api_key: required(&lookup, ENV_HONEYWELL_KEY)?,
            api_secret: required(&lookup, ENV_HONEYWELL_SECRET)?,
            refresh_token: required(&lookup, ENV_HONEYWELL_REFRESH)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        };

        let latitude = parse_finite(&lookup, ENV_HOME_LATITUDE)?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(invalid(
                ENV_HOME_LATITUDE,
                &latitude.to_string(),
                "latitude must be within [-90, 90]",
            ));
        }
        let longitude = parse_finite(&lookup, ENV_HOME_LONGITUDE)?;
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(invalid(
                ENV_HOME_LONGITUDE,
                &longitude.to_string(),
                "longitude must be within [-180, 180]",
            ));
        }

        Ok(Self {
            honeywell,
            store_dir: PathBuf::from(required(&lookup, ENV_TINYDB_DIR)?),
            home: HomeLocation {
                latitude,
                longitude,
            },
            openweather_key: required(&lookup, ENV_OPENWEATHER_KEY)?,
            thresholds: Thresholds {
                room_temp_minimum_f: parse_finite(&lookup, ENV_ROOM_TEMP_MINIMUM)?,
                eheat_outdoor_threshold_f: parse_finite(&lookup, ENV_EHEAT_SETPOINT)?,
            },
        })
    }
}

pub fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

pub fn parse_optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(raw) = lookup(key).filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|err| invalid(key, &raw, &err.to_string()))
}

fn parse_finite(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<f64, ConfigError> {
    let raw = required(lookup, key)?;
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|err| invalid(key, &raw, &err.to_string()))?;
    if !value.is_finite() {
        return Err(invalid(key, &raw, "value must be finite"));
    }
    Ok(value)
}

pub fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
