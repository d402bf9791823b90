//! Device directory builder.
//!
//! Turns the raw device-listing payload into a flat name-keyed map of
//! descriptors. Built once at startup; a payload without a `devices`
//! object is fatal and aborts startup with the raw response attached.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use nestlink_core::device::DeviceDescriptor;

use crate::error::{BridgeError, BridgeResult};

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    devices: Option<DirectoryDevices>,
    #[serde(default)]
    structures: BTreeMap<String, Structure>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryDevices {
    #[serde(default)]
    thermostats: BTreeMap<String, NamedDevice>,
    #[serde(default)]
    smoke_co_alarms: BTreeMap<String, NamedDevice>,
}

#[derive(Debug, Deserialize)]
struct NamedDevice {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Structure {
    structure_id: String,
}

/// Build the device directory from a full account payload.
///
/// Every thermostat and smoke/CO alarm becomes one descriptor, and the
/// first structure found becomes the single `home` entry. There is no
/// partial result: any failure here means no directory at all.
pub fn build_directory(payload: &Value) -> BridgeResult<BTreeMap<String, DeviceDescriptor>> {
    let parsed = DirectoryResponse::deserialize(payload)
        .map_err(|_| BridgeError::EmptyDirectory(payload.to_string()))?;

    let Some(devices) = parsed.devices else {
        return Err(BridgeError::EmptyDirectory(payload.to_string()));
    };

    let mut directory = BTreeMap::new();

    for (device_id, device) in &devices.thermostats {
        directory.insert(
            device.name.clone(),
            DeviceDescriptor::thermostat(&device.name, device_id),
        );
    }

    for (device_id, device) in &devices.smoke_co_alarms {
        directory.insert(
            device.name.clone(),
            DeviceDescriptor::smoke_alarm(&device.name, device_id),
        );
    }

    let structure = parsed
        .structures
        .values()
        .next()
        .ok_or(BridgeError::MissingStructure)?;
    let home = DeviceDescriptor::home(&structure.structure_id);
    directory.insert(home.name.clone(), home);

    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestlink_core::device::DeviceKind;
    use serde_json::json;

    #[test]
    fn two_thermostats_and_a_structure_yield_three_entries() {
        let payload = json!({
            "devices": {
                "thermostats": {
                    "t1": { "name": "Living Room" },
                    "t2": { "name": "Bedroom" }
                }
            },
            "structures": {
                "s1": { "structure_id": "s1" }
            }
        });

        let directory = build_directory(&payload).unwrap();
        assert_eq!(directory.len(), 3);
        assert_eq!(directory["Living Room"].kind, DeviceKind::Thermostat);
        assert_eq!(directory["Living Room"].device_id, "t1");
        assert_eq!(directory["Bedroom"].kind, DeviceKind::Thermostat);
        assert_eq!(directory["home"].kind, DeviceKind::Home);
        assert_eq!(directory["home"].structure_id.as_deref(), Some("s1"));
    }

    #[test]
    fn alarms_become_smoke_alarm_descriptors() {
        let payload = json!({
            "devices": {
                "smoke_co_alarms": {
                    "p1": { "name": "Hallway" }
                }
            },
            "structures": {
                "s1": { "structure_id": "s1" }
            }
        });

        let directory = build_directory(&payload).unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory["Hallway"].kind, DeviceKind::SmokeAlarm);
    }

    #[test]
    fn empty_devices_object_still_yields_the_home_entry() {
        let payload = json!({
            "devices": {},
            "structures": {
                "s1": { "structure_id": "s1" }
            }
        });

        let directory = build_directory(&payload).unwrap();
        assert_eq!(directory.len(), 1);
        assert!(directory.contains_key("home"));
    }

    #[test]
    fn missing_devices_key_is_fatal() {
        let payload = json!({ "error": "unauthorized" });

        let result = build_directory(&payload);
        assert!(matches!(result, Err(BridgeError::EmptyDirectory(raw)) if raw.contains("unauthorized")));
    }

    #[test]
    fn missing_structure_is_fatal() {
        let payload = json!({
            "devices": {
                "thermostats": {
                    "t1": { "name": "Living Room" }
                }
            }
        });

        let result = build_directory(&payload);
        assert!(matches!(result, Err(BridgeError::MissingStructure)));
    }
}
