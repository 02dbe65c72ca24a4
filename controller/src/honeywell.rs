//! Client for the Honeywell Home REST API.
//!
//! Only the calls one control run needs: a refresh-token grant, the location
//! list, and reading/writing a single thermostat.

use async_trait::async_trait;
use chrono::NaiveTime;
use reqwest::{
    header::{HeaderMap, HeaderValue, CACHE_CONTROL},
    Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tempcontrol_common::{ChangeableValues, HoneywellConfig, SetpointStatus, ThermostatMode};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),

    #[error("{endpoint} request failed")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} rejected the credentials ({status})")]
    Unauthorized {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("malformed {endpoint} response")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("no access token; authenticate first")]
    NotAuthenticated,

    #[error("account has no thermostat devices")]
    NoDevice,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInfo {
    #[serde(rename = "locationID")]
    pub location_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "deviceID")]
    pub device_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThermostatInfo {
    #[serde(rename = "outdoorTemperature")]
    pub outdoor_temperature: f64,
    #[serde(rename = "changeableValues")]
    pub changeable_values: ChangeableValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub location_id: i64,
    pub device_id: String,
}

impl DeviceTarget {
    pub fn first(locations: &[LocationInfo]) -> Result<Self, ApiError> {
        let location = locations.first().ok_or(ApiError::NoDevice)?;
        let device = location.devices.first().ok_or(ApiError::NoDevice)?;
        Ok(Self {
            location_id: location.location_id,
            device_id: device.device_id.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRequest {
    pub mode: ThermostatMode,
    #[serde(rename = "heatSetpoint")]
    pub heat_setpoint: f64,
    #[serde(rename = "coolSetpoint")]
    pub cool_setpoint: f64,
    #[serde(rename = "thermostatSetpointStatus")]
    pub thermostat_setpoint_status: SetpointStatus,
    #[serde(rename = "nextPeriodTime", skip_serializing_if = "Option::is_none")]
    pub next_period_time: Option<NaiveTime>,
}

impl From<&ChangeableValues> for ChangeRequest {
    fn from(values: &ChangeableValues) -> Self {
        Self {
            mode: values.mode,
            heat_setpoint: values.heat_setpoint,
            cool_setpoint: values.cool_setpoint,
            thermostat_setpoint_status: values.thermostat_setpoint_status,
            next_period_time: values.next_period_time,
        }
    }
}

#[async_trait]
pub trait ThermostatApi: Send + Sync {
    async fn authenticate(&mut self) -> Result<(), ApiError>;

    async fn locations(&self) -> Result<Vec<LocationInfo>, ApiError>;

    async fn thermostat(&self, target: &DeviceTarget) -> Result<ThermostatInfo, ApiError>;

    async fn update_thermostat(
        &self,
        target: &DeviceTarget,
        request: &ChangeRequest,
    ) -> Result<(), ApiError>;
}

pub struct HoneywellClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    refresh_token: String,
    access_token: Option<String>,
}

impl HoneywellClient {
    pub fn new(config: &HoneywellConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            access_token: None,
        })
    }

    fn bearer(&self) -> Result<&str, ApiError> {
        self.access_token
            .as_deref()
            .ok_or(ApiError::NotAuthenticated)
    }

    fn thermostat_url(&self, target: &DeviceTarget) -> String {
        format!(
            "{}/v2/devices/thermostats/{}",
            self.base_url, target.device_id
        )
    }

    fn device_query(&self, target: &DeviceTarget) -> [(&'static str, String); 2] {
        [
            ("apikey", self.api_key.clone()),
            ("locationId", target.location_id.to_string()),
        ]
    }
}

#[async_trait]
impl ThermostatApi for HoneywellClient {
    async fn authenticate(&mut self) -> Result<(), ApiError> {
        const ENDPOINT: &str = "token";

        debug!("requesting access token");
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.base_url))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        let token: TokenResponse = decode(ENDPOINT, response).await?;
        if let Some(rotated) = token.refresh_token.as_deref() {
            if rotated != self.refresh_token {
                warn!("token grant returned a new refresh token; update HONEYWELL_REFRESH before the old one expires");
            }
        }
        self.access_token = Some(token.access_token);
        Ok(())
    }

    async fn locations(&self) -> Result<Vec<LocationInfo>, ApiError> {
        const ENDPOINT: &str = "locations";

        debug!("fetching locations");
        let response = self
            .http
            .get(format!("{}/v2/locations", self.base_url))
            .bearer_auth(self.bearer()?)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        decode(ENDPOINT, response).await
    }

    async fn thermostat(&self, target: &DeviceTarget) -> Result<ThermostatInfo, ApiError> {
        const ENDPOINT: &str = "thermostat";

        debug!(device_id = %target.device_id, "fetching thermostat");
        let response = self
            .http
            .get(self.thermostat_url(target))
            .bearer_auth(self.bearer()?)
            .query(&self.device_query(target))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        decode(ENDPOINT, response).await
    }

    async fn update_thermostat(
        &self,
        target: &DeviceTarget,
        request: &ChangeRequest,
    ) -> Result<(), ApiError> {
        const ENDPOINT: &str = "thermostat update";

        debug!(device_id = %target.device_id, ?request, "posting thermostat change");
        let response = self
            .http
            .post(self.thermostat_url(target))
            .bearer_auth(self.bearer()?)
            .query(&self.device_query(target))
            .json(request)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        check_response_status(ENDPOINT, response).await?;
        Ok(())
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    check_response_status(endpoint, response)
        .await?
        .json::<T>()
        .await
        .map_err(|source| ApiError::Decode { endpoint, source })
}

async fn check_response_status(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ApiError::Unauthorized { endpoint, status })
        }
        s if !s.is_success() => {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                endpoint,
                status,
                body,
            })
        }
        _ => Ok(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    const BASIC_KEY_SECRET: &str = "Basic a2V5OnNlY3JldA==";

    fn config(base_url: String) -> HoneywellConfig {
        HoneywellConfig {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
        }
    }

    fn authenticated(base_url: String) -> HoneywellClient {
        let mut client = HoneywellClient::new(&config(base_url)).unwrap();
        client.access_token = Some("access".to_string());
        client
    }

    fn target() -> DeviceTarget {
        DeviceTarget {
            location_id: 123456,
            device_id: "LCC-00D02DB89E33".to_string(),
        }
    }

    fn device_query() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("apikey".into(), "key".into()),
            Matcher::UrlEncoded("locationId".into(), "123456".into()),
        ])
    }

    #[tokio::test]
    async fn authenticate_exchanges_refresh_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_header("authorization", BASIC_KEY_SECRET)
            .match_header("cache-control", "no-cache")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "refresh".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh", "refresh_token": "refresh", "expires_in": "1799"}"#)
            .create_async()
            .await;

        let mut client = HoneywellClient::new(&config(server.url())).unwrap();
        client.authenticate().await.unwrap();

        mock.assert_async().await;
        assert_eq!(client.access_token.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn rejected_refresh_token_is_an_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(401)
            .with_body(r#"{"fault": "invalid refresh token"}"#)
            .create_async()
            .await;

        let mut client = HoneywellClient::new(&config(server.url())).unwrap();
        let err = client.authenticate().await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized { endpoint: "token", .. }));
        assert!(client.access_token.is_none());
    }

    #[tokio::test]
    async fn calls_before_authenticate_fail() {
        let client = HoneywellClient::new(&config("http://127.0.0.1:9".to_string())).unwrap();

        assert!(matches!(
            client.locations().await,
            Err(ApiError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn fetches_locations_and_picks_first_device() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/locations")
            .match_query(Matcher::UrlEncoded("apikey".into(), "key".into()))
            .match_header("authorization", "Bearer access")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {
                        "locationID": 123456,
                        "name": "Home",
                        "devices": [
                            {"deviceID": "LCC-00D02DB89E33", "deviceClass": "Thermostat"},
                            {"deviceID": "LCC-SECOND"}
                        ]
                    },
                    {"locationID": 777, "devices": [{"deviceID": "LCC-CABIN"}]}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = authenticated(server.url());
        let locations = client.locations().await.unwrap();

        assert_eq!(locations.len(), 2);
        assert_eq!(DeviceTarget::first(&locations).unwrap(), target());
    }

    #[test]
    fn empty_account_has_no_target() {
        assert!(matches!(DeviceTarget::first(&[]), Err(ApiError::NoDevice)));

        let no_devices = vec![LocationInfo {
            location_id: 1,
            name: None,
            devices: Vec::new(),
        }];
        assert!(matches!(
            DeviceTarget::first(&no_devices),
            Err(ApiError::NoDevice)
        ));
    }

    #[tokio::test]
    async fn reads_thermostat_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/devices/thermostats/LCC-00D02DB89E33")
            .match_query(device_query())
            .match_header("authorization", "Bearer access")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "deviceID": "LCC-00D02DB89E33",
                    "indoorTemperature": 70.0,
                    "outdoorTemperature": 28.0,
                    "changeableValues": {
                        "mode": "Heat",
                        "heatSetpoint": 68.0,
                        "coolSetpoint": 78.0,
                        "thermostatSetpointStatus": "PermanentHold",
                        "emergencyHeatActive": false,
                        "nextPeriodTime": "06:00:00",
                        "heatCoolMode": "Heat"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let info = authenticated(server.url()).thermostat(&target()).await.unwrap();

        assert_eq!(info.outdoor_temperature, 28.0);
        assert_eq!(
            info.changeable_values.thermostat_setpoint_status,
            SetpointStatus::PermanentHold
        );
        assert_eq!(info.changeable_values.extra.get("heatCoolMode"), Some(&json!("Heat")));
    }

    #[tokio::test]
    async fn thermostat_without_emergency_flag_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/devices/thermostats/LCC-00D02DB89E33")
            .match_query(device_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "outdoorTemperature": 28.0,
                    "changeableValues": {
                        "mode": "Heat",
                        "heatSetpoint": 68.0,
                        "coolSetpoint": 78.0,
                        "thermostatSetpointStatus": "NoHold"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = authenticated(server.url())
            .thermostat(&target())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Decode { endpoint: "thermostat", .. }));
    }

    #[tokio::test]
    async fn posts_writable_fields_only() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/devices/thermostats/LCC-00D02DB89E33")
            .match_query(device_query())
            .match_header("authorization", "Bearer access")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "mode": "EmergencyHeat",
                "heatSetpoint": 80.0,
                "coolSetpoint": 78.0,
                "thermostatSetpointStatus": "PermanentHold",
                "nextPeriodTime": "06:00:00"
            })))
            .with_status(200)
            .create_async()
            .await;

        let request = ChangeRequest {
            mode: ThermostatMode::EmergencyHeat,
            heat_setpoint: 80.0,
            cool_setpoint: 78.0,
            thermostat_setpoint_status: SetpointStatus::PermanentHold,
            next_period_time: NaiveTime::from_hms_opt(6, 0, 0),
        };
        authenticated(server.url())
            .update_thermostat(&target(), &request)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_keeps_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2/devices/thermostats/LCC-00D02DB89E33")
            .match_query(device_query())
            .with_status(500)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let request = ChangeRequest {
            mode: ThermostatMode::Heat,
            heat_setpoint: 68.0,
            cool_setpoint: 78.0,
            thermostat_setpoint_status: SetpointStatus::NoHold,
            next_period_time: None,
        };
        let err = authenticated(server.url())
            .update_thermostat(&target(), &request)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream unavailable"));
    }
}
