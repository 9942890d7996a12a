use domain::{CommandHandler, RemoteCommand};
use infrastructure::MqttClient;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Subscribes to the room command topic and hands commands to a handler
pub struct CommandListener {
    mqtt_client: MqttClient,
    topic: String,
    handler: Arc<dyn CommandHandler>,
}

impl CommandListener {
    pub fn new(mqtt_client: MqttClient, topic: String, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            mqtt_client,
            topic,
            handler,
        }
    }

    pub async fn start(&self, cancel: CancellationToken) {
        // Take the receiver before subscribing so nothing delivered in between is lost
        let mut rx = self.mqtt_client.subscribe_messages();

        if let Err(e) = self.mqtt_client.subscribe(&self.topic).await {
            error!(topic = %self.topic, error = %e, "Failed to subscribe to commands");
            return;
        }

        info!(topic = %self.topic, "📥 Listening for commands");

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => received,
            };

            match received {
                Ok(msg) => {
                    if msg.topic != self.topic {
                        continue;
                    }

                    dispatch_payload(self.handler.as_ref(), &msg.payload).await;

                    // Ack after dispatch, also for rejected payloads
                    if let Err(e) = self.mqtt_client.ack(&msg.topic, msg.pkid).await {
                        warn!(error = %e, "Failed to ack command");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Command listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("Command channel closed");
                    break;
                }
            }
        }

        info!("Command listener stopped");
    }
}

/// Parse one inbound payload and pass it to `handler`.
///
/// Returns whether the handler accepted the command.
pub async fn dispatch_payload(handler: &dyn CommandHandler, payload: &[u8]) -> bool {
    let command = match RemoteCommand::parse(payload) {
        Ok(command) => command,
        Err(e) => {
            warn!(
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "Received unparseable command"
            );
            return false;
        }
    };

    match handler.on_command(command).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Command rejected");
            false
        }
    }
}
