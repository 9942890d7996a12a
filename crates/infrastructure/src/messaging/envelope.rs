use domain::{DomainEvent, EventKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire format of every telemetry message.
///
/// `event_id` stays the same across redeliveries from the local buffer, so
/// consumers can drop duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEnvelope {
    pub event_id: Uuid,
    pub unit_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Epoch milliseconds
    pub ts: i64,
    pub payload: serde_json::Value,
}

impl TelemetryEnvelope {
    pub fn wrap(unit_id: &str, event: &DomainEvent) -> serde_json::Result<Self> {
        let mut payload = serde_json::to_value(event)?;
        // The type moves to the envelope
        if let Some(map) = payload.as_object_mut() {
            map.remove("type");
        }

        Ok(Self {
            event_id: Uuid::new_v4(),
            unit_id: unit_id.to_string(),
            event_type: event.event_type().to_string(),
            ts: event.timestamp().timestamp_millis(),
            payload,
        })
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Topic layout of one room: `ecotrip/<hotel>/<room>/...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn for_kind(&self, kind: EventKind) -> String {
        format!("{}/{}", self.base, kind.as_str())
    }

    /// Retained ONLINE/OFFLINE presence
    pub fn status(&self) -> String {
        format!("{}/status", self.base)
    }

    pub fn commands(&self) -> String {
        format!("{}/cmd", self.base)
    }
}
