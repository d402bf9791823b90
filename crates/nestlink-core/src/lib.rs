//! Core types for the nestlink bridge.
//!
//! This crate holds what the bridge and the CLI share: the device model
//! built from the cloud directory listing, and the bridge configuration
//! with its loading rules.

pub mod config;
pub mod device;

pub use config::{BridgeConfig, ConfigError, MqttConfig, NestConfig};
pub use device::{DeviceDescriptor, DeviceKind};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
