//! Bridge configuration loading.
//!
//! Sources in priority order:
//! 1. `nestlink.toml` in the working directory (preferred for static config)
//! 2. Environment variables (fallback)
//!
//! The OAuth setup flow that originally produces the access token is a
//! separate tool; the bridge only consumes its output. A missing broker
//! host or access token is fatal at startup.

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Default configuration file path.
pub const CONFIG_PATH: &str = "nestlink.toml";

/// Default cloud API endpoint.
pub mod endpoints {
    pub const NEST_API: &str = "https://developer-api.nest.com";
}

/// Environment variable names.
pub mod env_vars {
    pub const NEST_ACCESS_TOKEN: &str = "NEST_ACCESS_TOKEN";
    pub const NEST_API_URL: &str = "NEST_API_URL";
    pub const MQTT_HOST: &str = "MQTT_HOST";
    pub const MQTT_PORT: &str = "MQTT_PORT";
    pub const MQTT_CLIENT_ID: &str = "MQTT_CLIENT_ID";
    pub const MQTT_USERNAME: &str = "MQTT_USERNAME";
    pub const MQTT_PASSWORD: &str = "MQTT_PASSWORD";
    pub const POLL_INTERVAL_SECS: &str = "NESTLINK_POLL_INTERVAL_SECS";
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No MQTT broker host anywhere
    #[error("No MQTT broker configured: set mqtt.host in nestlink.toml or MQTT_HOST")]
    MissingBrokerHost,

    /// No cloud access token anywhere
    #[error("No access token configured: set nest.access_token in nestlink.toml or NEST_ACCESS_TOKEN")]
    MissingAccessToken,

    /// Configuration file exists but cannot be parsed
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Environment variable holds an unusable value
    #[error("Invalid value for {var}: {value}")]
    InvalidEnvValue { var: &'static str, value: String },
}

/// Cloud API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NestConfig {
    /// OAuth bearer token for the device API
    #[serde(default)]
    pub access_token: String,
    /// API endpoint override
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// MQTT broker settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker host
    #[serde(default)]
    pub host: String,
    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Client ID (auto-generated if not provided)
    pub client_id: Option<String>,
    /// Username for authentication
    pub username: Option<String>,
    /// Password for authentication
    pub password: Option<String>,
    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub nest: NestConfig,
    pub mqtt: MqttConfig,
    /// Fallback poll cadence in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_api_url() -> String {
    endpoints::NEST_API.to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    60
}

/// Configuration sources in priority order.
enum ConfigSource {
    Toml(String),
    Env,
}

impl ConfigSource {
    /// Detect and load the best available configuration source.
    fn detect(path: &str) -> Self {
        if let Ok(content) = std::fs::read_to_string(path) {
            info!(category = "config", "Loading config from: {}", path);
            return ConfigSource::Toml(content);
        }

        info!(
            category = "config",
            "Loading config from environment variables"
        );
        ConfigSource::Env
    }
}

impl BridgeConfig {
    /// Load and validate configuration from `nestlink.toml` or the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_PATH)
    }

    /// Load and validate configuration, reading the TOML file at `path` if
    /// it exists.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config = match ConfigSource::detect(path) {
            ConfigSource::Toml(content) => {
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_string(),
                    source,
                })?
            }
            ConfigSource::Env => Self::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var(env_vars::MQTT_PORT) {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidEnvValue {
                    var: env_vars::MQTT_PORT,
                    value: raw.clone(),
                })?,
            Err(_) => default_mqtt_port(),
        };

        let poll_interval_secs = match std::env::var(env_vars::POLL_INTERVAL_SECS) {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidEnvValue {
                    var: env_vars::POLL_INTERVAL_SECS,
                    value: raw.clone(),
                })?,
            Err(_) => default_poll_interval(),
        };

        Ok(Self {
            nest: NestConfig {
                access_token: std::env::var(env_vars::NEST_ACCESS_TOKEN).unwrap_or_default(),
                api_url: std::env::var(env_vars::NEST_API_URL)
                    .unwrap_or_else(|_| default_api_url()),
            },
            mqtt: MqttConfig {
                host: std::env::var(env_vars::MQTT_HOST).unwrap_or_default(),
                port,
                client_id: std::env::var(env_vars::MQTT_CLIENT_ID).ok(),
                username: std::env::var(env_vars::MQTT_USERNAME).ok(),
                password: std::env::var(env_vars::MQTT_PASSWORD).ok(),
                keep_alive_secs: default_keep_alive(),
            },
            poll_interval_secs,
        })
    }

    /// Check the fatal startup requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::MissingBrokerHost);
        }
        if self.nest.access_token.is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }
        Ok(())
    }

    /// Broker address as `host:port`.
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.mqtt.host, self.mqtt.port)
    }
}
