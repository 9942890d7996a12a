mod actuator;
mod hardware_type;

pub use actuator::{ActuatorBinding, ActuatorKind};
pub use hardware_type::HardwareType;

use async_trait::async_trait;

use crate::channel::ChannelId;
use crate::error::DomainError;

/// Hardware abstraction over named physical channels.
///
/// Shared between the polling loop and the authorization executor, so
/// implementations synchronise internally. Failures surface as errors and
/// are never fatal to callers.
#[async_trait]
pub trait Hardware: Send + Sync {
    /// Read the raw value of a sensor channel
    async fn read(&self, channel: &ChannelId) -> Result<f64, DomainError>;

    /// Drive an output channel to a level
    async fn write(&self, channel: &ChannelId, value: f64) -> Result<(), DomainError>;
}
