use crate::config::TelemetryConfig;
use crate::database::SQLiteBuffer;
use crate::messaging::envelope::{TelemetryEnvelope, Topics};
use crate::messaging::mqtt_client::MqttPublisherClient;
use async_trait::async_trait;
use domain::event::EventPublisher;
use domain::{DomainError, DomainEvent};
use rumqttc::QoS;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct FlushSettings {
    pub interval: Duration,
    pub batch: i64,
    pub max_backoff: Duration,
}

impl From<&TelemetryConfig> for FlushSettings {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.flush_interval_ms),
            batch: config.flush_batch.max(1),
            max_backoff: Duration::from_millis(config.max_backoff_ms.max(config.flush_interval_ms)),
        }
    }
}

/// Result of one flush pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Everything that was dequeued got published
    Flushed(usize),
    /// A publish failed; `published` rows went out before it
    Stalled { published: usize },
}

/// Telemetry publisher with SQLite store-and-forward.
///
/// Publishes straight to the broker while connected and buffers durable
/// events otherwise. A background flusher drains the buffer, backing off
/// exponentially while the broker keeps rejecting messages.
#[derive(Clone)]
pub struct BufferedTelemetryPublisher {
    client: Arc<dyn MqttPublisherClient>,
    buffer: SQLiteBuffer,
    unit_id: String,
    topics: Topics,
    settings: FlushSettings,
}

impl BufferedTelemetryPublisher {
    pub fn new(
        client: Arc<dyn MqttPublisherClient>,
        buffer: SQLiteBuffer,
        unit_id: String,
        topics: Topics,
        settings: FlushSettings,
    ) -> Self {
        Self {
            client,
            buffer,
            unit_id,
            topics,
            settings,
        }
    }

    pub fn start_flusher(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let publisher = self.clone();

        tokio::spawn(async move {
            info!("🔄 Starting buffer flusher...");
            let mut delay = publisher.settings.interval;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Buffer flusher stopped");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                // Only try if we believe we are online
                if !publisher.client.is_connected() {
                    continue;
                }

                match publisher.flush().await {
                    Ok(FlushOutcome::Flushed(_)) => delay = publisher.settings.interval,
                    Ok(FlushOutcome::Stalled { .. }) => {
                        delay = (delay * 2).min(publisher.settings.max_backoff);
                        debug!(backoff_ms = delay.as_millis() as u64, "Flusher backing off");
                    }
                    Err(e) => {
                        error!("Buffer flush failed: {}", e);
                        delay = (delay * 2).min(publisher.settings.max_backoff);
                    }
                }
            }
        })
    }

    /// Forward one batch of buffered messages, oldest first
    pub async fn flush(&self) -> anyhow::Result<FlushOutcome> {
        let rows = self.buffer.dequeue_batch(self.settings.batch).await?;
        if rows.is_empty() {
            return Ok(FlushOutcome::Flushed(0));
        }

        info!("📤 Flushing {} buffered events...", rows.len());
        let mut published = 0;
        for (id, topic, payload) in rows {
            match self
                .client
                .publish_bytes(&topic, &payload, QoS::AtLeastOnce, false)
                .await
            {
                Ok(_) => {
                    published += 1;
                    if let Err(e) = self.buffer.delete(id).await {
                        error!("Failed to delete forwarded event {}: {}", id, e);
                    }
                }
                Err(e) => {
                    warn!("Flusher paused: MQTT publish failed: {}", e);
                    return Ok(FlushOutcome::Stalled { published });
                }
            }
        }
        Ok(FlushOutcome::Flushed(published))
    }

    /// Number of messages waiting in the local buffer
    pub async fn buffered(&self) -> u64 {
        match self.buffer.count().await {
            Ok(count) => count.max(0) as u64,
            Err(e) => {
                warn!("Failed to check buffer count: {}", e);
                0
            }
        }
    }

    async fn store(&self, topic: &str, payload: &[u8]) -> Result<(), DomainError> {
        let trimmed = self
            .buffer
            .enqueue(topic, payload)
            .await
            .map_err(|e| DomainError::TelemetryFailure(format!("buffer write failed: {e}")))?;
        if trimmed > 0 {
            warn!(dropped = trimmed, "Telemetry buffer full, oldest events dropped");
        }
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for BufferedTelemetryPublisher {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let topic = self.topics.for_kind(event.kind());
        let envelope = TelemetryEnvelope::wrap(&self.unit_id, &event)?;
        let payload = envelope.to_bytes()?;

        // Heartbeats are best effort and never buffered
        if !event.is_durable() {
            if let Err(e) = self
                .client
                .publish_bytes(&topic, &payload, QoS::AtMostOnce, false)
                .await
            {
                debug!(error = %e, "Heartbeat not delivered");
            }
            return Ok(());
        }

        // 1. Client-side offline detection
        if !self.client.is_connected() {
            debug!(event_type = event.event_type(), "MQTT Client offline. Buffering event...");
            self.store(&topic, &payload).await?;
            return Ok(());
        }

        // 2. Try publish immediately, buffer on failure
        if let Err(e) = self
            .client
            .publish_bytes(&topic, &payload, QoS::AtLeastOnce, false)
            .await
        {
            warn!("MQTT publish failed ({}). Buffering event...", e);
            self.store(&topic, &payload).await?;
        }
        Ok(())
    }
}
