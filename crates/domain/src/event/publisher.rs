use crate::DomainEvent;
use async_trait::async_trait;

/// Outbound telemetry. Delivery is at-least-once and consumers drop
/// duplicates by `event_id`.
///
/// An `Ok` means the event was sent or queued locally for a later retry.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
