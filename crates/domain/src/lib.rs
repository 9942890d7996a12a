//! Domain layer - Pure control-unit model with no external dependencies
//!
//! This crate contains:
//! - Value Objects (ChannelId, SubjectId, Pattern, MeasureType)
//! - Sensor readings and the monitored RoomState
//! - Access requests, policy rules and authorization decisions
//! - Domain Events (telemetry)
//! - Collaborator interfaces (Hardware, EventPublisher, CommandHandler)
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Invariants enforced on construction
//! - Testable in isolation

pub mod access;
pub mod channel;
pub mod command;
pub mod conversion;
pub mod error;
pub mod event;
pub mod hardware;
pub mod policy;
pub mod room;
pub mod token;

// Re-export commonly used types
pub use access::{
    AccessRequest, Action, AuthorizationDecision, Outcome, ReasonCode, RequestId, RequestSource,
    SubjectId,
};
pub use channel::{ChannelId, MeasureType, SensorBinding, SensorReading};
pub use command::{CommandHandler, RemoteCommand};
pub use error::DomainError;
pub use event::{DomainEvent, EventKind, EventPublisher};
pub use hardware::{ActuatorBinding, ActuatorKind, Hardware};
pub use policy::{PolicyRule, PolicySet, StatePredicate};
pub use room::{RoomState, StateTransition};
pub use token::Token;
