use chrono::{DateTime, Utc};
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid channel ID: {0}")]
    InvalidChannelId(String),

    #[error("Invalid subject ID: {0}")]
    InvalidSubjectId(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid policy rule: {0}")]
    InvalidPolicy(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Recoverable: the reading is excluded from aggregation
    #[error("Invalid reading on channel {channel}: {reason}")]
    SensorInvalid { channel: String, reason: String },

    /// Recoverable: authorization defers while the state is stale
    #[error("Room state is stale since {since}")]
    StaleState { since: DateTime<Utc> },

    /// Fatal at startup
    #[error("Policy load failed: {0}")]
    PolicyLoad(String),

    #[error("Actuation of {actuator} failed after {attempts} attempt(s): {reason}")]
    ActuationFailure {
        actuator: String,
        attempts: u32,
        reason: String,
    },

    #[error("Telemetry failure: {0}")]
    TelemetryFailure(String),

    #[error("Hardware error: {0}")]
    HardwareError(String),

    #[error("Room state version {next} does not follow version {current}")]
    StateRegression { current: u64, next: u64 },

    #[error("Request queue closed")]
    QueueClosed,
}

impl DomainError {
    /// Whether the control loop may keep running after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::PolicyLoad(_) | Self::InvalidConfiguration(_) | Self::InvalidPolicy(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_taxonomy() {
        let sensor = DomainError::SensorInvalid {
            channel: "dht22".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(sensor.is_recoverable());
        assert!(DomainError::StaleState { since: Utc::now() }.is_recoverable());
        assert!(DomainError::TelemetryFailure("offline".to_string()).is_recoverable());
        assert!(!DomainError::PolicyLoad("empty".to_string()).is_recoverable());
    }

    #[test]
    fn test_actuation_failure_message() {
        let err = DomainError::ActuationFailure {
            actuator: "front-door".to_string(),
            attempts: 3,
            reason: "write rejected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Actuation of front-door failed after 3 attempt(s): write rejected"
        );
    }
}
