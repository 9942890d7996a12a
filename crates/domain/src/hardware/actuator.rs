use serde::{Deserialize, Serialize};

use crate::access::Action;
use crate::channel::ChannelId;

/// Physical kind of an actuator, which fixes the actions it accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorKind {
    Lock,
    Relay,
}

impl ActuatorKind {
    pub fn supports(&self, action: Action) -> bool {
        match self {
            Self::Lock => matches!(action, Action::Unlock | Action::Lock),
            Self::Relay => matches!(action, Action::SwitchOn | Action::SwitchOff),
        }
    }
}

/// An output channel together with its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorBinding {
    pub channel: ChannelId,
    pub kind: ActuatorKind,
}

impl ActuatorBinding {
    pub fn new(channel: ChannelId, kind: ActuatorKind) -> Self {
        Self { channel, kind }
    }

    /// Level to write for `action`, if this actuator accepts it
    pub fn level_for(&self, action: Action) -> Option<f64> {
        self.kind
            .supports(action)
            .then(|| action.output_level())
    }
}
