use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use domain::{DomainEvent, EventPublisher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fire-and-forget front of the telemetry publisher.
///
/// Producers hand events over without awaiting the network; when the queue
/// is full the event is dropped and counted so the control loop never blocks.
#[derive(Clone)]
pub struct TelemetrySink {
    tx: mpsc::Sender<DomainEvent>,
    dropped: Arc<AtomicU64>,
}

/// Consumer side of a [`TelemetrySink`], owned by a single task
pub struct TelemetryForwarder {
    rx: mpsc::Receiver<DomainEvent>,
}

impl TelemetrySink {
    pub fn new(capacity: usize) -> (Self, TelemetryForwarder) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            TelemetryForwarder { rx },
        )
    }

    pub fn emit(&self, event: DomainEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    event_type = event.event_type(),
                    dropped, "Telemetry queue full, event dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(event_type = event.event_type(), "Telemetry forwarder gone, event dropped");
            }
        }
    }

    /// Events lost to a full queue since start
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TelemetryForwarder {
    /// Hand queued events to `publisher` until cancelled, then drain what is left
    pub async fn run(mut self, publisher: Arc<dyn EventPublisher>, cancel: CancellationToken) {
        info!("📡 Telemetry forwarder started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.rx.recv() => match event {
                    Some(event) => forward(publisher.as_ref(), event).await,
                    None => break,
                },
            }
        }

        self.rx.close();
        let mut drained = 0;
        while let Some(event) = self.rx.recv().await {
            forward(publisher.as_ref(), event).await;
            drained += 1;
        }
        info!(drained, "Telemetry forwarder stopped");
    }
}

async fn forward(publisher: &dyn EventPublisher, event: DomainEvent) {
    let event_type = event.event_type();
    if let Err(e) = publisher.publish(event).await {
        error!(event_type, error = %e, "❌ Failed to publish telemetry event");
    }
}
