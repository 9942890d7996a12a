use serde::{Deserialize, Serialize};

/// Backend serving the hardware channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HardwareType {
    /// In-memory channels with scripted values
    #[default]
    Simulated,
    /// Linux sysfs GPIO and IIO nodes
    Sysfs,
}

impl HardwareType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Sysfs => "sysfs",
        }
    }
}
