//! Nest cloud API client.
//!
//! One bearer-token client covers the three ways the bridge talks to the
//! cloud: the full-account fetch (startup directory and fallback poll),
//! single-field thermostat writes, and the push event stream. Push frames
//! and poll results carry the same account payload, so both feed the same
//! extraction functions below.

use reqwest::header;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use nestlink_core::config::NestConfig;
use nestlink_core::device::DeviceDescriptor;

use crate::command::DeviceWrite;
use crate::error::{BridgeError, BridgeResult};
use crate::status::StatusSnapshot;

/// Bearer-token client for the device API.
#[derive(Clone)]
pub struct NestClient {
    client: Client,
    api_url: String,
    access_token: String,
}

impl NestClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: &NestConfig) -> Self {
        let client = Client::builder().build().unwrap_or_default();

        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    /// Fetch the full account payload (directory plus current status).
    pub async fn fetch_all(&self) -> BridgeResult<Value> {
        let url = format!("{}/", self.api_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BridgeError::ApiStatus {
                status: response.status(),
                url,
            });
        }

        Ok(response.json().await?)
    }

    /// Write a single field to a thermostat. Completion is reported to the
    /// caller; a failed write is never retried here.
    pub async fn write_field(
        &self,
        device: &DeviceDescriptor,
        write: &DeviceWrite,
    ) -> BridgeResult<()> {
        let url = format!("{}/devices/thermostats/{}", self.api_url, device.device_id);

        let mut body = serde_json::Map::new();
        body.insert(write.field.to_string(), write.value.to_json());

        debug!(device = %device.name, field = write.field, "sending device write");
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BridgeError::ApiStatus {
                status: response.status(),
                url,
            });
        }

        Ok(())
    }

    /// Consume the API's push stream, forwarding each `put` payload.
    ///
    /// Runs until the stream or the receiver goes away; reconnection is
    /// left to process restart.
    pub async fn stream_events(&self, tx: mpsc::Sender<Value>) -> BridgeResult<()> {
        use futures::StreamExt;

        let url = format!("{}/", self.api_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BridgeError::ApiStatus {
                status: response.status(),
                url,
            });
        }

        info!("Cloud event stream connected");

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Frames are separated by a blank line.
            while let Some(end) = buffer.find("\n\n") {
                let frame = buffer[..end].to_string();
                buffer.drain(..end + 2);

                let Some((event, data)) = parse_sse_frame(&frame) else {
                    continue;
                };
                if event != "put" {
                    debug!(event = %event, "ignoring stream event");
                    continue;
                }

                // A put frame wraps the account payload in {"path","data"}.
                let payload = match serde_json::from_str::<Value>(&data) {
                    Ok(frame) => frame.get("data").cloned(),
                    Err(e) => {
                        debug!("unparsable put frame: {}", e);
                        None
                    }
                };

                if let Some(payload) = payload {
                    if tx.send(payload).await.is_err() {
                        // Bridge loop is gone.
                        return Ok(());
                    }
                }
            }
        }

        info!("Cloud event stream ended");
        Ok(())
    }
}

/// Split one server-sent-event frame into its event name and data line.
pub(crate) fn parse_sse_frame(frame: &str) -> Option<(String, String)> {
    let mut event = None;
    let mut data = None;

    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data = Some(rest.trim().to_string());
        }
    }

    Some((event?, data?))
}

/// Pull the tracked thermostat fields out of a full account payload.
///
/// Returns `None` when the payload has no entry for the device; missing
/// individual fields simply stay unset in the snapshot.
pub fn thermostat_snapshot(payload: &Value, device_id: &str) -> Option<StatusSnapshot> {
    let device = payload.get("devices")?.get("thermostats")?.get(device_id)?;

    Some(StatusSnapshot {
        ambient_temperature_f: device.get("ambient_temperature_f").and_then(Value::as_f64),
        target_temperature_f: device.get("target_temperature_f").and_then(Value::as_f64),
        humidity: device.get("humidity").and_then(Value::as_f64),
        hvac_mode: device
            .get("hvac_mode")
            .and_then(Value::as_str)
            .map(str::to_string),
        is_online: device.get("is_online").and_then(Value::as_bool),
        hvac_state: device
            .get("hvac_state")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Smoke/CO alarm fields surfaced by the log-only handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmStatus {
    pub smoke_alarm_state: Option<String>,
    pub co_alarm_state: Option<String>,
    pub battery_health: Option<String>,
    pub is_online: Option<bool>,
}

/// Pull a smoke/CO alarm's status out of a full account payload.
pub fn alarm_status(payload: &Value, device_id: &str) -> Option<AlarmStatus> {
    let device = payload
        .get("devices")?
        .get("smoke_co_alarms")?
        .get(device_id)?;

    Some(AlarmStatus {
        smoke_alarm_state: device
            .get("smoke_alarm_state")
            .and_then(Value::as_str)
            .map(str::to_string),
        co_alarm_state: device
            .get("co_alarm_state")
            .and_then(Value::as_str)
            .map(str::to_string),
        battery_health: device
            .get("battery_health")
            .and_then(Value::as_str)
            .map(str::to_string),
        is_online: device.get("is_online").and_then(Value::as_bool),
    })
}

/// Structure fields surfaced by the home handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeStatus {
    pub name: Option<String>,
    pub away: Option<String>,
}

/// Pull the home structure's status out of a full account payload.
pub fn home_status(payload: &Value, structure_id: &str) -> Option<HomeStatus> {
    let structure = payload.get("structures")?.get(structure_id)?;

    Some(HomeStatus {
        name: structure
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        away: structure
            .get("away")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}
