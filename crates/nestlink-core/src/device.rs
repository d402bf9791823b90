//! Device model for the bridged account.
//!
//! Descriptors are built once from the directory listing at startup and
//! never mutated afterwards. Behavior is selected by matching on
//! [`DeviceKind`], not by looking up handler names at runtime.

use serde::{Deserialize, Serialize};

/// Device classification, fixed at directory-build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Thermostat (status and commands)
    Thermostat,
    /// Smoke/CO alarm (status only)
    SmokeAlarm,
    /// The home structure itself (status only)
    Home,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thermostat => write!(f, "thermostat"),
            Self::SmokeAlarm => write!(f, "smoke_alarm"),
            Self::Home => write!(f, "home"),
        }
    }
}

/// One entry of the device directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Display name, unique within the home
    pub name: String,
    /// Device classification
    pub kind: DeviceKind,
    /// Cloud-side identifier (device id, or structure id for the home)
    pub device_id: String,
    /// Structure identifier, set for the home entry only
    pub structure_id: Option<String>,
}

impl DeviceDescriptor {
    /// Descriptor for a thermostat.
    pub fn thermostat(name: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DeviceKind::Thermostat,
            device_id: device_id.into(),
            structure_id: None,
        }
    }

    /// Descriptor for a smoke/CO alarm.
    pub fn smoke_alarm(name: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DeviceKind::SmokeAlarm,
            device_id: device_id.into(),
            structure_id: None,
        }
    }

    /// Descriptor for the home structure. The directory always contains
    /// exactly one of these, named `home`.
    pub fn home(structure_id: impl Into<String>) -> Self {
        let structure_id = structure_id.into();
        Self {
            name: "home".to_string(),
            kind: DeviceKind::Home,
            device_id: structure_id.clone(),
            structure_id: Some(structure_id),
        }
    }
}
