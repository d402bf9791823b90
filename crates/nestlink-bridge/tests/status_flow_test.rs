//! Status and command flow tests against a recording publisher.
//!
//! Exercises the handler layer the way the bridge loop drives it: full
//! account payloads in, topic/value pairs out.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use nestlink_bridge::error::BridgeResult;
use nestlink_bridge::handler::DeviceHandler;
use nestlink_bridge::mqtt::StatePublisher;
use nestlink_bridge::nest::NestClient;
use nestlink_core::config::NestConfig;
use nestlink_core::device::DeviceDescriptor;

/// Broker stand-in that records every publish.
#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    fn take(&self) -> Vec<(String, String)> {
        std::mem::take(&mut self.published.lock().unwrap())
    }
}

#[async_trait]
impl StatePublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> BridgeResult<()> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

fn payload(ambient_f: f64, hvac_state: &str, is_online: bool) -> Value {
    json!({
        "devices": {
            "thermostats": {
                "t1": {
                    "name": "Living Room",
                    "ambient_temperature_f": ambient_f,
                    "target_temperature_f": 70,
                    "humidity": 45,
                    "hvac_mode": "heat",
                    "is_online": is_online,
                    "hvac_state": hvac_state
                }
            }
        },
        "structures": {
            "s1": { "structure_id": "s1" }
        }
    })
}

fn thermostat_handler() -> DeviceHandler {
    DeviceHandler::for_descriptor(&DeviceDescriptor::thermostat("Living Room", "t1"))
}

#[tokio::test]
async fn first_status_publishes_every_field_once() {
    let mut handler = thermostat_handler();
    let publisher = RecordingPublisher::default();

    handler
        .on_status(&payload(72.0, "heating", true), &publisher)
        .await;

    let mut published = publisher.take();
    published.sort();
    assert_eq!(
        published,
        vec![
            (
                "smartthings/Living Room/heatingSetpoint/set_state".to_string(),
                "70".to_string()
            ),
            (
                "smartthings/Living Room/humidity/set_state".to_string(),
                "45".to_string()
            ),
            (
                "smartthings/Living Room/temperature/set_state".to_string(),
                "72".to_string()
            ),
            (
                "smartthings/Living Room/thermostatMode/set_state".to_string(),
                "heat".to_string()
            ),
            (
                "smartthings/Living Room/thermostatOperatingState/set_state".to_string(),
                "heating".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn repeated_status_publishes_nothing() {
    let mut handler = thermostat_handler();
    let publisher = RecordingPublisher::default();

    handler
        .on_status(&payload(72.0, "heating", true), &publisher)
        .await;
    publisher.take();

    handler
        .on_status(&payload(72.0, "heating", true), &publisher)
        .await;
    assert!(publisher.take().is_empty());
}

#[tokio::test]
async fn temperature_change_publishes_one_update() {
    let mut handler = thermostat_handler();
    let publisher = RecordingPublisher::default();

    handler
        .on_status(&payload(72.0, "heating", true), &publisher)
        .await;
    publisher.take();

    handler
        .on_status(&payload(73.0, "heating", true), &publisher)
        .await;
    assert_eq!(
        publisher.take(),
        vec![(
            "smartthings/Living Room/temperature/set_state".to_string(),
            "73".to_string()
        )]
    );
}

#[tokio::test]
async fn going_offline_overrides_the_operating_state() {
    let mut handler = thermostat_handler();
    let publisher = RecordingPublisher::default();

    handler
        .on_status(&payload(72.0, "heating", true), &publisher)
        .await;
    publisher.take();

    handler
        .on_status(&payload(72.0, "heating", false), &publisher)
        .await;
    assert_eq!(
        publisher.take(),
        vec![(
            "smartthings/Living Room/thermostatOperatingState/set_state".to_string(),
            "offline".to_string()
        )]
    );
}

#[tokio::test]
async fn payload_without_the_device_publishes_nothing() {
    let mut handler = thermostat_handler();
    let publisher = RecordingPublisher::default();

    handler
        .on_status(&json!({ "devices": { "thermostats": {} } }), &publisher)
        .await;
    assert!(publisher.take().is_empty());
}

#[tokio::test]
async fn unknown_command_capability_produces_no_write() {
    let mut handler = thermostat_handler();

    // The translator rejects the capability before any network I/O, so an
    // unreachable endpoint proves no write was attempted.
    let nest = NestClient::new(&NestConfig {
        access_token: "c.token".to_string(),
        api_url: "http://127.0.0.1:1".to_string(),
    });

    handler.on_command("unknownCap", "x", &nest).await;
}

#[tokio::test]
async fn smoke_alarm_and_home_handlers_stay_silent_on_the_broker() {
    let alarm = DeviceDescriptor::smoke_alarm("Hallway", "p1");
    let home = DeviceDescriptor::home("s1");
    let publisher = RecordingPublisher::default();

    let full = json!({
        "devices": {
            "smoke_co_alarms": {
                "p1": { "name": "Hallway", "smoke_alarm_state": "ok", "is_online": true }
            }
        },
        "structures": {
            "s1": { "structure_id": "s1", "name": "Home", "away": "home" }
        }
    });

    let mut alarm_handler = DeviceHandler::for_descriptor(&alarm);
    let mut home_handler = DeviceHandler::for_descriptor(&home);
    alarm_handler.on_status(&full, &publisher).await;
    home_handler.on_status(&full, &publisher).await;

    assert!(publisher.take().is_empty());
    assert!(!alarm_handler.accepts_commands());
    assert!(!home_handler.accepts_commands());
}
