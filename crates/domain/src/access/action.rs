use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Action requested on an actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Unlock,
    Lock,
    SwitchOn,
    SwitchOff,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unlock => "unlock",
            Self::Lock => "lock",
            Self::SwitchOn => "switch_on",
            Self::SwitchOff => "switch_off",
        }
    }

    /// Output level written to the actuator channel
    pub fn output_level(&self) -> f64 {
        match self {
            Self::Unlock | Self::SwitchOn => 1.0,
            Self::Lock | Self::SwitchOff => 0.0,
        }
    }
}

impl std::str::FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unlock" => Ok(Self::Unlock),
            "lock" => Ok(Self::Lock),
            "switch_on" | "on" => Ok(Self::SwitchOn),
            "switch_off" | "off" => Ok(Self::SwitchOff),
            other => Err(DomainError::InvalidPolicy(format!("unknown action '{other}'"))),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
