//! Bridge assembly: lifecycle states and the steady-state event loop.
//!
//! The loop reacts to three sources: the fallback poll timer, inbound
//! broker commands, and cloud push events. Handlers run to completion
//! within one loop iteration; nothing here is shared across tasks. There
//! is no transition back from `Running` — restart is the recovery path
//! for transport loss.

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use nestlink_core::config::BridgeConfig;

use crate::directory;
use crate::error::BridgeResult;
use crate::handler::DeviceHandler;
use crate::mqtt::{CommandMessage, MqttTransport, StatePublisher};
use crate::nest::NestClient;

/// Bridge lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Required secrets are absent; only the external setup flow leaves
    /// this state
    Unconfigured,
    /// Credentials present, directory fetch in flight; terminal on failure
    AwaitingDirectory,
    /// Directory loaded, subscriptions active
    Running,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::AwaitingDirectory => write!(f, "awaiting directory"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// The assembled bridge.
pub struct Bridge {
    config: BridgeConfig,
    nest: NestClient,
    state: BridgeState,
    handlers: BTreeMap<String, DeviceHandler>,
}

impl Bridge {
    /// Create a bridge from validated configuration, in the pre-directory
    /// state.
    pub fn new(config: BridgeConfig) -> Self {
        let nest = NestClient::new(&config.nest);
        Self {
            config,
            nest,
            state: BridgeState::AwaitingDirectory,
            handlers: BTreeMap::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Fetch the directory and register one handler per device.
    ///
    /// Terminal on failure: a payload without devices propagates as a
    /// fatal error and there is no retry.
    pub async fn load_directory(&mut self) -> BridgeResult<()> {
        let payload = self.nest.fetch_all().await?;
        let directory = directory::build_directory(&payload)?;

        info!("Directory loaded: {} devices", directory.len());
        for descriptor in directory.values() {
            debug!("  {} ({})", descriptor.name, descriptor.kind);
            self.handlers.insert(
                descriptor.name.clone(),
                DeviceHandler::for_descriptor(descriptor),
            );
        }

        self.state = BridgeState::Running;
        Ok(())
    }

    /// Run the bridge until the broker connection is lost.
    pub async fn run(mut self) -> BridgeResult<()> {
        if self.state != BridgeState::Running {
            self.load_directory().await?;
        }

        let (transport, mut command_rx) = MqttTransport::connect(&self.config.mqtt).await?;

        // Push events land on the same path the poll results take.
        let (event_tx, mut event_rx) = mpsc::channel::<Value>(8);
        let stream_client = self.nest.clone();
        tokio::spawn(async move {
            if let Err(e) = stream_client.stream_events(event_tx).await {
                warn!("Cloud event stream failed: {}", e);
            }
        });

        let mut poll = interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Bridge running: {} devices, polling every {}s",
            self.handlers.len(),
            self.config.poll_interval_secs
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    match self.nest.fetch_all().await {
                        Ok(payload) => self.dispatch_status(&payload, &transport).await,
                        Err(e) => warn!("Fallback poll failed: {}", e),
                    }
                }
                Some(payload) = event_rx.recv() => {
                    self.dispatch_status(&payload, &transport).await;
                }
                message = command_rx.recv() => {
                    match message {
                        Some(message) => self.dispatch_command(message).await,
                        None => {
                            error!("MQTT event loop stopped; shutting down");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Feed one account payload to every registered handler.
    async fn dispatch_status(&mut self, payload: &Value, publisher: &dyn StatePublisher) {
        for handler in self.handlers.values_mut() {
            handler.on_status(payload, publisher).await;
        }
    }

    /// Route one inbound command to the named device.
    async fn dispatch_command(&mut self, message: CommandMessage) {
        match self.handlers.get_mut(&message.device) {
            Some(handler) if handler.accepts_commands() => {
                handler
                    .on_command(&message.capability, &message.payload, &self.nest)
                    .await;
            }
            Some(handler) => {
                warn!(
                    "Device {} ({}) does not accept commands",
                    message.device,
                    handler.descriptor().kind
                );
            }
            None => {
                warn!("Command for unknown device: {}", message.device);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestlink_core::config::{MqttConfig, NestConfig};

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            nest: NestConfig {
                access_token: "c.token".to_string(),
                api_url: "http://127.0.0.1:1".to_string(),
            },
            mqtt: MqttConfig {
                host: "127.0.0.1".to_string(),
                port: 1883,
                client_id: None,
                username: None,
                password: None,
                keep_alive_secs: 60,
            },
            poll_interval_secs: 60,
        }
    }

    #[test]
    fn new_bridge_awaits_the_directory() {
        let bridge = Bridge::new(test_config());
        assert_eq!(bridge.state(), BridgeState::AwaitingDirectory);
    }

    #[test]
    fn state_display_is_lowercase() {
        assert_eq!(BridgeState::Unconfigured.to_string(), "unconfigured");
        assert_eq!(BridgeState::Running.to_string(), "running");
    }

    #[tokio::test]
    async fn unreachable_api_is_terminal_for_directory_loading() {
        let mut bridge = Bridge::new(test_config());
        assert!(bridge.load_directory().await.is_err());
        assert_eq!(bridge.state(), BridgeState::AwaitingDirectory);
    }
}
