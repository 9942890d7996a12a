use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, MeasureType};

/// One sample taken from a sensor channel during a poll cycle.
///
/// Immutable once produced. Invalid readings keep their slot in the poll
/// window so the engine can account for them, but never enter aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    channel: ChannelId,
    measure: MeasureType,
    value: f64,
    timestamp: DateTime<Utc>,
    valid: bool,
}

impl SensorReading {
    /// A reading that passed acquisition and range validation
    pub fn valid(
        channel: ChannelId,
        measure: MeasureType,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            channel,
            measure,
            value,
            timestamp,
            // NaN or infinite values are never trusted
            valid: value.is_finite(),
        }
    }

    /// A failed, timed-out or out-of-range reading
    pub fn invalid(
        channel: ChannelId,
        measure: MeasureType,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            channel,
            measure,
            value,
            timestamp,
            valid: false,
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn measure(&self) -> MeasureType {
        self.measure
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
