//! MQTT transport: outbound state publisher and inbound command feed.
//!
//! Handlers never hold the MQTT client directly; they receive the
//! [`StatePublisher`] capability explicitly, so tests can substitute a
//! recording publisher for the broker connection.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use nestlink_core::config::MqttConfig;

use crate::error::BridgeResult;
use crate::topics;

/// Outbound publish capability handed to device handlers.
#[async_trait]
pub trait StatePublisher: Send + Sync {
    /// Publish a stringified state value to `topic`.
    async fn publish(&self, topic: &str, payload: &str) -> BridgeResult<()>;
}

/// One inbound command, already split by topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    /// Device display name from the topic
    pub device: String,
    /// Capability segment from the topic
    pub capability: String,
    /// Raw string payload
    pub payload: String,
}

/// rumqttc-backed broker transport.
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Connect to the broker, subscribe to the command pattern, and spawn
    /// the event-loop task. Inbound commands arrive on the returned
    /// channel; the channel closing means the connection is gone.
    pub async fn connect(
        config: &MqttConfig,
    ) -> BridgeResult<(Self, mpsc::Receiver<CommandMessage>)> {
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("nestlink-{}", Uuid::new_v4()));

        let mut options = MqttOptions::new(&client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user, pass);
        }

        let (client, eventloop) = AsyncClient::new(options, 10);
        client
            .subscribe(topics::COMMAND_SUBSCRIPTION, QoS::AtLeastOnce)
            .await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(run_event_loop(eventloop, tx));

        info!(
            "MQTT client {} connecting to {}:{}",
            client_id, config.host, config.port
        );
        Ok((Self { client }, rx))
    }
}

#[async_trait]
impl StatePublisher for MqttTransport {
    async fn publish(&self, topic: &str, payload: &str) -> BridgeResult<()> {
        debug!(topic = %topic, payload = %payload, "publishing state");
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .await?;
        Ok(())
    }
}

/// Drive the rumqttc event loop, forwarding inbound publishes as commands.
async fn run_event_loop(mut eventloop: EventLoop, tx: mpsc::Sender<CommandMessage>) {
    let mut error_count = 0;
    let max_errors = 5;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                error_count = 0;
                info!("Connected to MQTT broker");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                error_count = 0;
                let payload = String::from_utf8_lossy(&publish.payload).to_string();

                match topics::parse_command_topic(&publish.topic) {
                    Some((device, capability)) => {
                        let message = CommandMessage {
                            device: device.to_string(),
                            capability: capability.to_string(),
                            payload,
                        };
                        if tx.send(message).await.is_err() {
                            // Bridge loop is gone; stop driving the connection.
                            break;
                        }
                    }
                    None => {
                        warn!("Ignoring message on unrecognized topic: {}", publish.topic);
                    }
                }
            }
            Ok(_) => {
                error_count = 0;
            }
            Err(e) => {
                error_count += 1;
                if error_count >= max_errors {
                    error!(
                        "MQTT error count reached {}, stopping event loop: {}",
                        max_errors, e
                    );
                    break;
                }
                warn!(
                    "MQTT connection error ({}/{}): {}",
                    error_count, max_errors, e
                );
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
