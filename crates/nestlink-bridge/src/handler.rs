//! Per-device handlers.
//!
//! One handler exists per directory entry, chosen by device kind at
//! startup and dispatched with a `match` — there is no runtime handler
//! table. Thermostats publish state changes and accept commands; alarms
//! and the home structure are log-only.

use serde_json::Value;
use tracing::{debug, info, warn};

use nestlink_core::device::{DeviceDescriptor, DeviceKind};

use crate::command::translate_command;
use crate::mqtt::StatePublisher;
use crate::nest::{self, AlarmStatus, HomeStatus, NestClient};
use crate::status::{format_value, StatusTranslator};
use crate::topics;

/// Handler state for one directory entry.
pub enum DeviceHandler {
    Thermostat(ThermostatHandler),
    SmokeAlarm(SmokeAlarmHandler),
    Home(HomeHandler),
}

impl DeviceHandler {
    /// Build the handler matching a descriptor's kind.
    pub fn for_descriptor(descriptor: &DeviceDescriptor) -> Self {
        match descriptor.kind {
            DeviceKind::Thermostat => Self::Thermostat(ThermostatHandler::new(descriptor.clone())),
            DeviceKind::SmokeAlarm => Self::SmokeAlarm(SmokeAlarmHandler::new(descriptor.clone())),
            DeviceKind::Home => Self::Home(HomeHandler::new(descriptor.clone())),
        }
    }

    /// The directory entry this handler serves.
    pub fn descriptor(&self) -> &DeviceDescriptor {
        match self {
            Self::Thermostat(h) => &h.descriptor,
            Self::SmokeAlarm(h) => &h.descriptor,
            Self::Home(h) => &h.descriptor,
        }
    }

    /// Whether this device listens on inbound command topics.
    pub fn accepts_commands(&self) -> bool {
        matches!(self, Self::Thermostat(_))
    }

    /// Feed one full account payload to this device.
    pub async fn on_status(&mut self, payload: &Value, publisher: &dyn StatePublisher) {
        match self {
            Self::Thermostat(h) => h.on_status(payload, publisher).await,
            Self::SmokeAlarm(h) => h.on_status(payload),
            Self::Home(h) => h.on_status(payload),
        }
    }

    /// Handle one inbound command addressed to this device.
    pub async fn on_command(&mut self, capability: &str, value: &str, nest: &NestClient) {
        match self {
            Self::Thermostat(h) => h.on_command(capability, value, nest).await,
            Self::SmokeAlarm(h) => {
                warn!("Smoke alarm {} does not accept commands", h.descriptor.name);
            }
            Self::Home(h) => {
                warn!("Home {} does not accept commands", h.descriptor.name);
            }
        }
    }
}

/// Thermostat: change-only state publication plus command writes.
pub struct ThermostatHandler {
    descriptor: DeviceDescriptor,
    translator: StatusTranslator,
}

impl ThermostatHandler {
    fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            translator: StatusTranslator::new(),
        }
    }

    async fn on_status(&mut self, payload: &Value, publisher: &dyn StatePublisher) {
        let Some(snapshot) = nest::thermostat_snapshot(payload, &self.descriptor.device_id) else {
            debug!("No status for thermostat {} in payload", self.descriptor.name);
            return;
        };

        if let Some(ambient) = snapshot.ambient_temperature_f {
            info!(
                "Ambient temperature for {}: {}F",
                self.descriptor.name,
                format_value(ambient)
            );
        }

        for notification in self.translator.translate(&snapshot) {
            debug!(
                "{} {} -> {}{}",
                self.descriptor.name, notification.capability, notification.value, notification.unit
            );
            let topic = topics::state_topic(&self.descriptor.name, notification.capability);
            if let Err(e) = publisher.publish(&topic, &notification.value).await {
                warn!(
                    "Failed to publish {} for {}: {}",
                    notification.capability, self.descriptor.name, e
                );
            }
        }
    }

    async fn on_command(&mut self, capability: &str, value: &str, nest: &NestClient) {
        let write = match translate_command(capability, value) {
            Ok(write) => write,
            Err(e) => {
                warn!(
                    "Rejected command for {} ({} = {:?}): {}",
                    self.descriptor.name, capability, value, e
                );
                return;
            }
        };

        info!(
            "Writing {} = {} to {}",
            write.field, write.value, self.descriptor.name
        );
        match nest.write_field(&self.descriptor, &write).await {
            Ok(()) => info!("Write to {} completed", self.descriptor.name),
            // No retry: the next command or poll re-converges state.
            Err(e) => warn!("Write to {} failed: {}", self.descriptor.name, e),
        }
    }
}

/// Smoke/CO alarm: status is logged, never published or commanded.
pub struct SmokeAlarmHandler {
    descriptor: DeviceDescriptor,
    last: AlarmStatus,
}

impl SmokeAlarmHandler {
    fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            last: AlarmStatus::default(),
        }
    }

    fn on_status(&mut self, payload: &Value) {
        let Some(status) = nest::alarm_status(payload, &self.descriptor.device_id) else {
            return;
        };

        if status != self.last {
            info!(
                "Protect status for {}: smoke={} co={} battery={} online={}",
                self.descriptor.name,
                status.smoke_alarm_state.as_deref().unwrap_or("-"),
                status.co_alarm_state.as_deref().unwrap_or("-"),
                status.battery_health.as_deref().unwrap_or("-"),
                status.is_online.map_or("-".to_string(), |v| v.to_string()),
            );
            self.last = status;
        }
    }
}

/// Home structure: at-a-glance logging only.
pub struct HomeHandler {
    descriptor: DeviceDescriptor,
    last: HomeStatus,
}

impl HomeHandler {
    fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            last: HomeStatus::default(),
        }
    }

    fn on_status(&mut self, payload: &Value) {
        let structure_id = self
            .descriptor
            .structure_id
            .as_deref()
            .unwrap_or(&self.descriptor.device_id);
        let Some(status) = nest::home_status(payload, structure_id) else {
            return;
        };

        if status != self.last {
            info!(
                "The home at a glance: name={} away={}",
                status.name.as_deref().unwrap_or("-"),
                status.away.as_deref().unwrap_or("-"),
            );
            self.last = status;
        }
    }
}
