use serde::{Deserialize, Serialize};

use super::RoomState;
use crate::channel::SensorReading;

/// Why the published room state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// A debounced aggregate left the hysteresis band of the previous state
    Measurement,
    /// No valid reading arrived within the stale timeout
    Stale,
    /// Valid readings came back after a stale period
    Recovered,
}

/// A meaningful change of the room state, emitted by the monitoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: RoomState,
    pub to: RoomState,
    pub cause: TransitionCause,
    /// Readings of the poll cycle that confirmed the transition
    pub readings: Vec<SensorReading>,
}

impl StateTransition {
    pub fn new(
        from: RoomState,
        to: RoomState,
        cause: TransitionCause,
        readings: Vec<SensorReading>,
    ) -> Self {
        Self {
            from,
            to,
            cause,
            readings,
        }
    }
}
