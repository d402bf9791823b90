//! Nest-to-MQTT bridge library.
//!
//! Mirrors a Nest account onto an MQTT broker and forwards inbound broker
//! commands back as device writes.
//!
//! ## Architecture
//!
//! - **Directory builder**: one descriptor per thermostat/alarm plus the
//!   home structure, built once at startup.
//! - **Status translator**: per-device change detection; only fields that
//!   actually changed reach the broker.
//! - **Command translator**: static capability table mapping inbound
//!   capabilities to cloud API field writes; unknown names fail closed.
//! - **Bridge loop**: one `select!` over the fallback poll timer, inbound
//!   broker commands, and cloud push events.
//!
//! Topic layout (kept compatible with the deployment this replaces):
//! `smartthings/{device}/{capability}/set_state` outbound,
//! `smartthings/{device}/{capability}/state` inbound.

pub mod bridge;
pub mod command;
pub mod directory;
pub mod error;
pub mod handler;
pub mod mqtt;
pub mod nest;
pub mod status;
pub mod topics;

pub use bridge::{Bridge, BridgeState};
pub use command::{translate_command, CommandCapability, DeviceWrite, WriteValue};
pub use error::{BridgeError, BridgeResult};
pub use handler::DeviceHandler;
pub use mqtt::{CommandMessage, MqttTransport, StatePublisher};
pub use nest::NestClient;
pub use status::{StateNotification, StatusSnapshot, StatusTranslator};
