//! Inbound command translation.
//!
//! Inbound MQTT commands carry a capability name and a string payload; the
//! table below maps each known capability to the cloud API field it writes
//! and the coercion its value needs. An unrecognized capability never
//! produces a device write.

use crate::error::{BridgeError, BridgeResult};

/// Inbound capabilities with a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCapability {
    /// `thermostatMode` -> `hvac_mode`, value passed through as a string
    ThermostatMode,
    /// `heatingSetpoint` -> `target_temperature_f`, value parsed as a number
    HeatingSetpoint,
}

impl CommandCapability {
    /// Parse a topic capability segment. Unknown names fail closed.
    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "thermostatMode" => Some(Self::ThermostatMode),
            "heatingSetpoint" => Some(Self::HeatingSetpoint),
            _ => None,
        }
    }

    /// Cloud API field written by this capability.
    pub fn field(self) -> &'static str {
        match self {
            Self::ThermostatMode => "hvac_mode",
            Self::HeatingSetpoint => "target_temperature_f",
        }
    }
}

/// Typed value carried by a device write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    /// Mode strings pass through unchanged
    Mode(String),
    /// Setpoints are numeric
    Setpoint(f64),
}

impl WriteValue {
    /// JSON representation for the write request body. Whole-number
    /// setpoints serialize without a decimal point.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Mode(mode) => serde_json::Value::String(mode.clone()),
            Self::Setpoint(v) if v.fract() == 0.0 => serde_json::json!(*v as i64),
            Self::Setpoint(v) => serde_json::json!(v),
        }
    }
}

impl std::fmt::Display for WriteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mode(mode) => write!(f, "{}", mode),
            Self::Setpoint(v) => write!(f, "{}", v),
        }
    }
}

/// A single outbound device write.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceWrite {
    /// Cloud API field name
    pub field: &'static str,
    /// Coerced value
    pub value: WriteValue,
}

/// Translate an inbound `(capability, value)` pair into a device write.
///
/// Errors here are non-fatal: the caller logs them and drops the command.
pub fn translate_command(capability: &str, value: &str) -> BridgeResult<DeviceWrite> {
    let cap = CommandCapability::parse(capability).ok_or_else(|| BridgeError::UnknownCommand {
        capability: capability.to_string(),
    })?;

    let value = match cap {
        CommandCapability::ThermostatMode => WriteValue::Mode(value.trim().to_string()),
        CommandCapability::HeatingSetpoint => {
            let parsed =
                value
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| BridgeError::InvalidCommandValue {
                        capability: capability.to_string(),
                        value: value.to_string(),
                    })?;
            WriteValue::Setpoint(parsed)
        }
    };

    Ok(DeviceWrite {
        field: cap.field(),
        value,
    })
}
