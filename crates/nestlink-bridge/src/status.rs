//! Status snapshots and the change-only state translator.
//!
//! The translator owns the previously observed snapshot for one device and
//! emits a notification only for fields whose value actually changed, so
//! the broker never sees repeats of unchanged state. The online flag and
//! the operating state are evaluated jointly: `"offline"` must override a
//! stale operating-state string.

/// Value published on the operating-state topic while a device is not
/// online.
pub const OFFLINE_STATE: &str = "offline";

/// Outbound capability segment names.
pub mod capabilities {
    pub const TEMPERATURE: &str = "temperature";
    pub const HEATING_SETPOINT: &str = "heatingSetpoint";
    pub const HUMIDITY: &str = "humidity";
    pub const THERMOSTAT_MODE: &str = "thermostatMode";
    pub const OPERATING_STATE: &str = "thermostatOperatingState";
}

/// Last-observed status record for one thermostat.
///
/// Only fields with a topic mapping exist here, so a snapshot can never
/// carry an untracked field. `None` means "not present in this update";
/// partial updates leave the other fields untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub ambient_temperature_f: Option<f64>,
    pub target_temperature_f: Option<f64>,
    pub humidity: Option<f64>,
    pub hvac_mode: Option<String>,
    pub is_online: Option<bool>,
    pub hvac_state: Option<String>,
}

/// One outbound topic update produced by the translator.
#[derive(Debug, Clone, PartialEq)]
pub struct StateNotification {
    /// Capability segment of the target topic
    pub capability: &'static str,
    /// Stringified value
    pub value: String,
    /// Unit suffix for log lines ("F", "%", or empty)
    pub unit: &'static str,
}

impl StateNotification {
    fn new(capability: &'static str, value: String, unit: &'static str) -> Self {
        Self {
            capability,
            value,
            unit,
        }
    }
}

/// Change detector for one device's status.
#[derive(Debug, Default)]
pub struct StatusTranslator {
    previous: StatusSnapshot,
}

impl StatusTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The previously observed snapshot.
    pub fn previous(&self) -> &StatusSnapshot {
        &self.previous
    }

    /// Compare `current` against the stored snapshot, return notifications
    /// for changed fields only, then store the compared values.
    ///
    /// A first-ever observation counts as a change. Re-submitting an
    /// identical snapshot emits nothing.
    pub fn translate(&mut self, current: &StatusSnapshot) -> Vec<StateNotification> {
        let mut out = Vec::new();

        if changed(&self.previous.ambient_temperature_f, &current.ambient_temperature_f) {
            if let Some(v) = current.ambient_temperature_f {
                out.push(StateNotification::new(
                    capabilities::TEMPERATURE,
                    format_value(v),
                    "F",
                ));
                self.previous.ambient_temperature_f = Some(v);
            }
        }

        if changed(&self.previous.target_temperature_f, &current.target_temperature_f) {
            if let Some(v) = current.target_temperature_f {
                out.push(StateNotification::new(
                    capabilities::HEATING_SETPOINT,
                    format_value(v),
                    "F",
                ));
                self.previous.target_temperature_f = Some(v);
            }
        }

        if changed(&self.previous.humidity, &current.humidity) {
            if let Some(v) = current.humidity {
                out.push(StateNotification::new(
                    capabilities::HUMIDITY,
                    format_value(v),
                    "%",
                ));
                self.previous.humidity = Some(v);
            }
        }

        if changed(&self.previous.hvac_mode, &current.hvac_mode) {
            if let Some(mode) = &current.hvac_mode {
                out.push(StateNotification::new(
                    capabilities::THERMOSTAT_MODE,
                    mode.clone(),
                    "",
                ));
                self.previous.hvac_mode = Some(mode.clone());
            }
        }

        // The online flag and the operating state are one logical field on
        // the broker side: a change in either re-derives the published
        // value, and "offline" wins over whatever state string is present.
        let online_changed = changed(&self.previous.is_online, &current.is_online);
        let state_changed = changed(&self.previous.hvac_state, &current.hvac_state);
        if online_changed || state_changed {
            let online = current.is_online.or(self.previous.is_online);
            let state = current
                .hvac_state
                .clone()
                .or_else(|| self.previous.hvac_state.clone());

            let value = match online {
                Some(false) => Some(OFFLINE_STATE.to_string()),
                _ => state,
            };

            if let Some(value) = value {
                out.push(StateNotification::new(
                    capabilities::OPERATING_STATE,
                    value,
                    "",
                ));
            }

            if current.is_online.is_some() {
                self.previous.is_online = current.is_online;
            }
            if current.hvac_state.is_some() {
                self.previous.hvac_state = current.hvac_state.clone();
            }
        }

        out
    }
}

fn changed<T: PartialEq>(previous: &Option<T>, current: &Option<T>) -> bool {
    current.is_some() && previous != current
}

/// Render a numeric value without a trailing `.0` for whole numbers.
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_snapshot() -> StatusSnapshot {
        StatusSnapshot {
            ambient_temperature_f: Some(72.0),
            target_temperature_f: Some(70.0),
            humidity: Some(45.0),
            hvac_mode: Some("heat".to_string()),
            is_online: Some(true),
            hvac_state: Some("heating".to_string()),
        }
    }

    fn values_for(notifications: &[StateNotification], capability: &str) -> Vec<String> {
        notifications
            .iter()
            .filter(|n| n.capability == capability)
            .map(|n| n.value.clone())
            .collect()
    }

    #[test]
    fn first_observation_emits_every_present_field() {
        let mut translator = StatusTranslator::new();
        let notifications = translator.translate(&full_snapshot());

        assert_eq!(notifications.len(), 5);
        assert_eq!(values_for(&notifications, capabilities::TEMPERATURE), ["72"]);
        assert_eq!(
            values_for(&notifications, capabilities::HEATING_SETPOINT),
            ["70"]
        );
        assert_eq!(values_for(&notifications, capabilities::HUMIDITY), ["45"]);
        assert_eq!(
            values_for(&notifications, capabilities::THERMOSTAT_MODE),
            ["heat"]
        );
        assert_eq!(
            values_for(&notifications, capabilities::OPERATING_STATE),
            ["heating"]
        );
    }

    #[test]
    fn identical_resubmission_emits_nothing() {
        let mut translator = StatusTranslator::new();
        translator.translate(&full_snapshot());

        let notifications = translator.translate(&full_snapshot());
        assert!(notifications.is_empty());
    }

    #[test]
    fn single_field_change_emits_exactly_one_notification() {
        let mut translator = StatusTranslator::new();
        translator.translate(&full_snapshot());

        let mut current = full_snapshot();
        current.ambient_temperature_f = Some(73.5);
        let notifications = translator.translate(&current);

        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].capability, capabilities::TEMPERATURE);
        assert_eq!(notifications[0].value, "73.5");
        assert_eq!(notifications[0].unit, "F");
    }

    #[test]
    fn offline_overrides_stale_operating_state() {
        let mut translator = StatusTranslator::new();
        translator.translate(&full_snapshot());

        let mut current = full_snapshot();
        current.is_online = Some(false);
        let notifications = translator.translate(&current);

        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].capability, capabilities::OPERATING_STATE);
        assert_eq!(notifications[0].value, OFFLINE_STATE);
    }

    #[test]
    fn coming_back_online_republishes_the_operating_state() {
        let mut translator = StatusTranslator::new();
        translator.translate(&full_snapshot());

        let mut offline = full_snapshot();
        offline.is_online = Some(false);
        translator.translate(&offline);

        let notifications = translator.translate(&full_snapshot());
        assert_eq!(
            values_for(&notifications, capabilities::OPERATING_STATE),
            ["heating"]
        );
    }

    #[test]
    fn operating_state_change_alone_fires_once() {
        let mut translator = StatusTranslator::new();
        translator.translate(&full_snapshot());

        let mut current = full_snapshot();
        current.hvac_state = Some("off".to_string());
        let notifications = translator.translate(&current);

        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].value, "off");
    }

    #[test]
    fn partial_update_leaves_other_fields_untouched() {
        let mut translator = StatusTranslator::new();
        translator.translate(&full_snapshot());

        let partial = StatusSnapshot {
            humidity: Some(50.0),
            ..Default::default()
        };
        let notifications = translator.translate(&partial);

        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].capability, capabilities::HUMIDITY);
        // The stored snapshot still remembers the rest.
        assert_eq!(translator.previous().ambient_temperature_f, Some(72.0));
        assert_eq!(translator.previous().hvac_state.as_deref(), Some("heating"));
    }

    #[test]
    fn format_value_drops_trailing_zero() {
        assert_eq!(format_value(72.0), "72");
        assert_eq!(format_value(72.5), "72.5");
    }
}
