//! MQTT topic layout.
//!
//! The `smartthings/...` shapes are kept byte-compatible with the
//! deployment this bridge replaces, so existing subscribers keep working:
//!
//! Outbound status: `smartthings/{device}/{capability}/set_state`
//! Inbound commands: `smartthings/{device}/{capability}/state`

/// Leading topic segment shared by every bridge topic.
pub const TOPIC_PREFIX: &str = "smartthings";

/// Subscription pattern covering every inbound command topic.
pub const COMMAND_SUBSCRIPTION: &str = "smartthings/+/+/state";

/// Outbound status topic for a device capability.
pub fn state_topic(device: &str, capability: &str) -> String {
    format!("{}/{}/{}/set_state", TOPIC_PREFIX, device, capability)
}

/// Inbound command topic for a device capability.
pub fn command_topic(device: &str, capability: &str) -> String {
    format!("{}/{}/{}/state", TOPIC_PREFIX, device, capability)
}

/// Split an inbound command topic into `(device, capability)`.
///
/// Anything that does not match the four-segment command shape is
/// rejected; the caller logs and drops such messages.
pub fn parse_command_topic(topic: &str) -> Option<(&str, &str)> {
    let mut parts = topic.split('/');
    let prefix = parts.next()?;
    let device = parts.next()?;
    let capability = parts.next()?;
    let leaf = parts.next()?;

    if prefix != TOPIC_PREFIX
        || leaf != "state"
        || device.is_empty()
        || capability.is_empty()
        || parts.next().is_some()
    {
        return None;
    }

    Some((device, capability))
}
