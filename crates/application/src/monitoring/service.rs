use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::room::TransitionCause;
use domain::{
    DomainError, DomainEvent, Hardware, SensorBinding, SensorReading, StateTransition,
};
use infrastructure::config::MonitoringConfig;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::engine::RoomMonitor;
use super::report::DetectionAccumulator;
use crate::snapshot::SnapshotWriter;
use crate::telemetry::TelemetrySink;
use crate::token::TokenService;

/// Timer-driven polling loop around the [`RoomMonitor`].
///
/// Owns the snapshot writer: it is the only task that changes the room
/// state other components read.
pub struct MonitoringService {
    hardware: Arc<dyn Hardware>,
    sensors: Vec<SensorBinding>,
    monitor: RoomMonitor,
    snapshot: SnapshotWriter,
    telemetry: TelemetrySink,
    tokens: TokenService,
    accumulator: DetectionAccumulator,
    poll_interval: Duration,
    read_timeout: Duration,
    report_interval: Duration,
}

impl MonitoringService {
    pub fn new(
        hardware: Arc<dyn Hardware>,
        sensors: Vec<SensorBinding>,
        config: &MonitoringConfig,
        snapshot: SnapshotWriter,
        telemetry: TelemetrySink,
        tokens: TokenService,
    ) -> Self {
        Self {
            hardware,
            sensors,
            monitor: RoomMonitor::new(config),
            snapshot,
            telemetry,
            tokens,
            accumulator: DetectionAccumulator::default(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            read_timeout: Duration::from_millis(config.read_timeout_ms.max(1)),
            report_interval: Duration::from_secs(config.report_interval_secs.max(1)),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            sensors = self.sensors.len(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "🌡️ Room monitoring started"
        );

        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report =
            tokio::time::interval_at(Instant::now() + self.report_interval, self.report_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Room monitoring stopped");
                    break;
                }
                _ = poll.tick() => {
                    self.poll_once().await;
                }
                _ = report.tick() => self.report(),
            }
        }
    }

    /// Read every sensor once and feed the result to the engine
    pub async fn poll_once(&mut self) -> Option<StateTransition> {
        let mut readings = Vec::with_capacity(self.sensors.len());
        for (reading, rejection) in self.read_all().await {
            if let Some(e) = rejection {
                warn!(channel = %reading.channel(), measure = %reading.measure(), error = %e, "Reading rejected");
                self.telemetry.emit(DomainEvent::reading_rejected(
                    reading.channel().clone(),
                    reading.measure(),
                    e.to_string(),
                ));
            }
            self.accumulator.record(&reading);
            readings.push(reading);
        }

        let transition = self.monitor.poll(readings)?;
        if let Err(e) = self.snapshot.publish(transition.to.clone()) {
            error!(error = %e, "Failed to publish room snapshot");
            // Keep building on what readers actually see
            self.monitor.resync(self.snapshot.load().as_ref().clone());
            return None;
        }

        self.telemetry.emit(DomainEvent::state_changed(&transition));
        if transition.cause == TransitionCause::Stale {
            self.telemetry.emit(DomainEvent::stale_data(&transition.to));
        }
        Some(transition)
    }

    /// Close the report interval and publish its averages
    pub fn report(&mut self) {
        match self.accumulator.take() {
            Some(summary) => {
                debug!(samples = summary.samples, "Detection report");
                self.telemetry.emit(DomainEvent::detection_reported(
                    self.tokens.stay_id(),
                    self.report_interval.as_secs(),
                    summary.samples,
                    summary.averages,
                ));
            }
            None => debug!("No valid readings in report interval"),
        }
    }

    /// Concurrent reads, each bounded by the read timeout
    async fn read_all(&self) -> Vec<(SensorReading, Option<DomainError>)> {
        let mut reads = JoinSet::new();
        for binding in &self.sensors {
            let hardware = self.hardware.clone();
            let binding = binding.clone();
            let read_timeout = self.read_timeout;

            reads.spawn(async move {
                let raw = match tokio::time::timeout(read_timeout, hardware.read(&binding.channel))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(DomainError::HardwareError(format!(
                        "read timed out after {}ms",
                        read_timeout.as_millis()
                    ))),
                };
                binding.to_reading(raw, Utc::now())
            });
        }

        let mut results = Vec::with_capacity(self.sensors.len());
        while let Some(joined) = reads.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "Sensor read task failed"),
            }
        }
        results
    }
}
