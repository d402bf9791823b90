//! Bridge error taxonomy.
//!
//! Directory errors are fatal at startup. Command errors are logged with
//! their device/capability/value context and the bridge keeps running; no
//! error is retried.

use thiserror::Error;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The directory response carried no `devices` object (fatal)
    #[error("No devices returned by the cloud API: {0}")]
    EmptyDirectory(String),

    /// The directory response carried no structure (fatal)
    #[error("No structure in the cloud API response")]
    MissingStructure,

    /// Cloud API request failed
    #[error("Cloud API error: {0}")]
    Api(#[from] reqwest::Error),

    /// Cloud API answered with a non-success status
    #[error("Cloud API returned {status} for {url}")]
    ApiStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    /// MQTT client operation failed
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Inbound capability with no table entry (fails closed)
    #[error("Unknown command capability: {capability}")]
    UnknownCommand { capability: String },

    /// Command value failed coercion
    #[error("Invalid value {value:?} for {capability}")]
    InvalidCommandValue { capability: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_names_the_capability() {
        let error = BridgeError::UnknownCommand {
            capability: "fanTimer".to_string(),
        };
        assert!(error.to_string().contains("fanTimer"));
    }

    #[test]
    fn empty_directory_carries_the_raw_response() {
        let error = BridgeError::EmptyDirectory("{\"error\":\"unauthorized\"}".to_string());
        assert!(error.to_string().contains("unauthorized"));
    }
}
