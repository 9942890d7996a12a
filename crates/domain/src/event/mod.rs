use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod publisher;
pub use publisher::EventPublisher;

use crate::access::{AccessRequest, Action, AuthorizationDecision, Outcome, ReasonCode, RequestId};
use crate::channel::{ChannelId, MeasureType};
use crate::room::{RoomState, StateTransition, TransitionCause};

/// Telemetry stream an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    State,
    Decision,
    Health,
    Detection,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Decision => "decision",
            Self::Health => "health",
            Self::Detection => "detection",
        }
    }
}

/// Domain events reported to the remote endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// The monitored room state changed meaningfully
    StateChanged {
        state: RoomState,
        cause: TransitionCause,
        timestamp: DateTime<Utc>,
    },

    /// No valid reading within the stale timeout
    StaleData {
        last_valid: Option<DateTime<Utc>>,
        timestamp: DateTime<Utc>,
    },

    /// A reading was excluded from aggregation
    ReadingRejected {
        channel: ChannelId,
        measure: MeasureType,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An access request was decided
    AccessDecided {
        request_id: RequestId,
        subject: String,
        actuator: ChannelId,
        action: Action,
        outcome: Outcome,
        reason: ReasonCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A granted action could not be applied to the actuator
    ActuationFailed {
        request_id: RequestId,
        actuator: ChannelId,
        attempts: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Per-measure averages over a report interval
    DetectionReported {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stay_id: Option<String>,
        interval_secs: u64,
        samples: usize,
        averages: BTreeMap<MeasureType, f64>,
        timestamp: DateTime<Utc>,
    },

    /// Control unit heartbeat
    Heartbeat {
        unit_id: String,
        uptime_secs: u64,
        snapshot_version: u64,
        stale: bool,
        buffered: u64,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Create a StateChanged event from a transition
    pub fn state_changed(transition: &StateTransition) -> Self {
        Self::StateChanged {
            state: transition.to.clone(),
            cause: transition.cause,
            timestamp: Utc::now(),
        }
    }

    /// Create a StaleData event
    pub fn stale_data(state: &RoomState) -> Self {
        Self::StaleData {
            last_valid: state.last_updated(),
            timestamp: Utc::now(),
        }
    }

    /// Create a ReadingRejected event
    pub fn reading_rejected(
        channel: ChannelId,
        measure: MeasureType,
        reason: impl Into<String>,
    ) -> Self {
        Self::ReadingRejected {
            channel,
            measure,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an AccessDecided event
    pub fn access_decided(request: &AccessRequest, decision: &AuthorizationDecision) -> Self {
        Self::AccessDecided {
            request_id: decision.request_id,
            subject: request.subject.to_string(),
            actuator: request.actuator.clone(),
            action: request.action,
            outcome: decision.outcome,
            reason: decision.reason,
            rule: decision.rule.clone(),
            timestamp: decision.decided_at,
        }
    }

    /// Create an ActuationFailed event
    pub fn actuation_failed(
        request_id: RequestId,
        actuator: ChannelId,
        attempts: u32,
        error: impl Into<String>,
    ) -> Self {
        Self::ActuationFailed {
            request_id,
            actuator,
            attempts,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a DetectionReported event
    pub fn detection_reported(
        stay_id: Option<String>,
        interval_secs: u64,
        samples: usize,
        averages: BTreeMap<MeasureType, f64>,
    ) -> Self {
        Self::DetectionReported {
            stay_id,
            interval_secs,
            samples,
            averages,
            timestamp: Utc::now(),
        }
    }

    /// Create a Heartbeat event
    pub fn heartbeat(
        unit_id: impl Into<String>,
        uptime_secs: u64,
        snapshot_version: u64,
        stale: bool,
        buffered: u64,
    ) -> Self {
        Self::Heartbeat {
            unit_id: unit_id.into(),
            uptime_secs,
            snapshot_version,
            stale,
            buffered,
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StateChanged { timestamp, .. }
            | Self::StaleData { timestamp, .. }
            | Self::ReadingRejected { timestamp, .. }
            | Self::AccessDecided { timestamp, .. }
            | Self::ActuationFailed { timestamp, .. }
            | Self::DetectionReported { timestamp, .. }
            | Self::Heartbeat { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "StateChanged",
            Self::StaleData { .. } => "StaleData",
            Self::ReadingRejected { .. } => "ReadingRejected",
            Self::AccessDecided { .. } => "AccessDecided",
            Self::ActuationFailed { .. } => "ActuationFailed",
            Self::DetectionReported { .. } => "DetectionReported",
            Self::Heartbeat { .. } => "Heartbeat",
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::StateChanged { .. } => EventKind::State,
            Self::AccessDecided { .. } | Self::ActuationFailed { .. } => EventKind::Decision,
            Self::StaleData { .. } | Self::ReadingRejected { .. } | Self::Heartbeat { .. } => {
                EventKind::Health
            }
            Self::DetectionReported { .. } => EventKind::Detection,
        }
    }

    /// Heartbeats are only meaningful live and are never stored for later
    pub fn is_durable(&self) -> bool {
        !matches!(self, Self::Heartbeat { .. })
    }
}
