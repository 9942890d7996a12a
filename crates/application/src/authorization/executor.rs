use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain::{
    AccessRequest, ActuatorBinding, AuthorizationDecision, ChannelId, DomainError, DomainEvent,
    Hardware, PolicySet, ReasonCode,
};
use infrastructure::config::AuthorizationConfig;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::evaluator::evaluate;
use super::ingress::{AccessIngress, Submission};
use crate::snapshot::SnapshotReader;
use crate::telemetry::TelemetrySink;

#[derive(Debug, Clone, Copy)]
pub struct ExecutorSettings {
    pub attempts: u32,
    pub backoff: Duration,
    pub drain_timeout: Duration,
}

impl From<&AuthorizationConfig> for ExecutorSettings {
    fn from(config: &AuthorizationConfig) -> Self {
        Self {
            attempts: config.actuation_attempts.max(1),
            backoff: Duration::from_millis(config.actuation_backoff_ms),
            drain_timeout: Duration::from_millis(config.drain_timeout_ms),
        }
    }
}

/// Single consumer of the access request queue.
///
/// Requests are decided one at a time against the latest room snapshot, so
/// policy evaluation never interleaves. Only granted decisions reach the
/// hardware. Every decision is published as telemetry.
pub struct AuthorizationExecutor {
    rx: mpsc::Receiver<Submission>,
    policy: Arc<PolicySet>,
    snapshot: SnapshotReader,
    hardware: Arc<dyn Hardware>,
    actuators: HashMap<ChannelId, ActuatorBinding>,
    telemetry: TelemetrySink,
    settings: ExecutorSettings,
}

impl AuthorizationExecutor {
    pub fn new(
        policy: Arc<PolicySet>,
        snapshot: SnapshotReader,
        hardware: Arc<dyn Hardware>,
        actuators: Vec<ActuatorBinding>,
        telemetry: TelemetrySink,
        config: &AuthorizationConfig,
    ) -> (Self, AccessIngress) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let actuators = actuators
            .into_iter()
            .map(|binding| (binding.channel.clone(), binding))
            .collect();

        let executor = Self {
            rx,
            policy,
            snapshot,
            hardware,
            actuators,
            telemetry: telemetry.clone(),
            settings: ExecutorSettings::from(config),
        };
        (executor, AccessIngress::new(tx, telemetry))
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            rules = self.policy.len(),
            actuators = self.actuators.len(),
            "🔐 Authorization executor started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                submission = self.rx.recv() => match submission {
                    Some(submission) => self.handle(submission).await,
                    None => {
                        info!("All request sources closed, executor stopping");
                        return;
                    }
                },
            }
        }

        self.drain().await;
    }

    /// Decide queued requests until the drain deadline, refuse the rest
    async fn drain(&mut self) {
        self.rx.close();
        let deadline = Instant::now() + self.settings.drain_timeout;
        let mut drained = 0;

        loop {
            if Instant::now() >= deadline {
                let mut refused = 0;
                while let Ok(submission) = self.rx.try_recv() {
                    submission.refuse(&self.telemetry);
                    refused += 1;
                }
                if refused > 0 {
                    warn!(refused, "Drain deadline reached, remaining requests denied");
                }
                break;
            }

            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(submission)) => {
                    self.handle(submission).await;
                    drained += 1;
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }

        info!(drained, "Authorization executor stopped");
    }

    /// Decide a request against the actuator registry, the policy and the current snapshot
    pub fn decide(&self, request: &AccessRequest) -> AuthorizationDecision {
        let supported = self
            .actuators
            .get(&request.actuator)
            .is_some_and(|binding| binding.kind.supports(request.action));
        if !supported {
            debug!(
                request_id = %request.id,
                actuator = %request.actuator,
                action = request.action.as_str(),
                "Action not supported by actuator"
            );
            return AuthorizationDecision::denied(request.id, ReasonCode::UnsupportedAction);
        }

        let state = self.snapshot.load();
        evaluate(request, self.policy.rules(), &state)
    }

    async fn handle(&self, submission: Submission) {
        let Submission { request, reply } = submission;
        let decision = self.decide(&request);

        info!(
            request_id = %request.id,
            subject = %request.subject,
            actuator = %request.actuator,
            action = request.action.as_str(),
            outcome = ?decision.outcome,
            reason = %decision.reason,
            "Access decision"
        );
        self.telemetry
            .emit(DomainEvent::access_decided(&request, &decision));

        if decision.permits_actuation() {
            if let Err(e) = self.actuate(&request).await {
                error!(request_id = %request.id, error = %e, "❌ Actuation failed");
                if let DomainError::ActuationFailure {
                    attempts, reason, ..
                } = e
                {
                    self.telemetry.emit(DomainEvent::actuation_failed(
                        request.id,
                        request.actuator.clone(),
                        attempts,
                        reason,
                    ));
                }
            }
        }

        if let Some(reply) = reply {
            if reply.send(decision).is_err() {
                debug!(request_id = %request.id, "Requester gone before the decision");
            }
        }
    }

    /// Drive the actuator, retrying with linear backoff
    async fn actuate(&self, request: &AccessRequest) -> Result<u32, DomainError> {
        let level = self
            .actuators
            .get(&request.actuator)
            .and_then(|binding| binding.level_for(request.action))
            .ok_or_else(|| DomainError::ActuationFailure {
                actuator: request.actuator.to_string(),
                attempts: 0,
                reason: format!("no output level for {}", request.action.as_str()),
            })?;

        let attempts = self.settings.attempts;
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.hardware.write(&request.actuator, level).await {
                Ok(()) => {
                    info!(
                        request_id = %request.id,
                        actuator = %request.actuator,
                        level,
                        attempt,
                        "✅ Actuator driven"
                    );
                    return Ok(attempt);
                }
                Err(e) => {
                    warn!(
                        request_id = %request.id,
                        actuator = %request.actuator,
                        attempt,
                        error = %e,
                        "Actuation attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.backoff * attempt).await;
                    }
                }
            }
        }

        Err(DomainError::ActuationFailure {
            actuator: request.actuator.to_string(),
            attempts,
            reason: last_error,
        })
    }
}
