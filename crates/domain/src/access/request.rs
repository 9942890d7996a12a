use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Action, SubjectId};
use crate::channel::ChannelId;

/// Unique reference carried from a request to its decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an access request entered the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSource {
    /// Physical interface on the unit (keypad, card reader)
    Local,
    /// Remote command channel
    Remote,
}

/// Request to perform an action on an actuator.
///
/// Consumed exactly once by the authorization executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: RequestId,
    pub subject: SubjectId,
    pub actuator: ChannelId,
    pub action: Action,
    pub timestamp: DateTime<Utc>,
    pub source: RequestSource,
    /// Upstream sequence number, when the source attaches one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

impl AccessRequest {
    pub fn new(
        subject: SubjectId,
        actuator: ChannelId,
        action: Action,
        source: RequestSource,
    ) -> Self {
        Self {
            id: RequestId::new(),
            subject,
            actuator,
            action,
            timestamp: Utc::now(),
            source,
            sequence: None,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
