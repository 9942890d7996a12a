use std::time::{Duration, Instant};

use application::SnapshotReader;
use domain::{DomainEvent, EventPublisher};
use infrastructure::BufferedTelemetryPublisher;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Periodic liveness report: uptime, snapshot version, stale flag and backlog
pub struct Heartbeat {
    unit_id: String,
    interval: Duration,
    snapshot: SnapshotReader,
    publisher: BufferedTelemetryPublisher,
    started: Instant,
}

impl Heartbeat {
    pub fn new(
        unit_id: String,
        interval: Duration,
        snapshot: SnapshotReader,
        publisher: BufferedTelemetryPublisher,
    ) -> Self {
        Self {
            unit_id,
            interval,
            snapshot,
            publisher,
            started: Instant::now(),
        }
    }

    pub async fn beat(&self) {
        let state = self.snapshot.load();
        let buffered = self.publisher.buffered().await;
        let event = DomainEvent::heartbeat(
            self.unit_id.clone(),
            self.started.elapsed().as_secs(),
            state.version(),
            state.is_stale(),
            buffered,
        );

        if let Err(e) = self.publisher.publish(event).await {
            warn!(error = %e, "Failed to publish heartbeat");
        } else {
            info!(
                version = state.version(),
                stale = state.is_stale(),
                buffered,
                "💓 Heartbeat sent"
            );
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.beat().await,
            }
        }
    }
}
