use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Value object naming a physical I/O line (sensor or actuator)
///
/// Rules:
/// - Must be non-empty
/// - Must contain only alphanumeric, underscore, hyphen, dot and forward slash
/// - Max length 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    pub const MAX_LEN: usize = 64;

    /// Create a new ChannelId with validation
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(DomainError::InvalidChannelId(
                "Channel ID cannot be empty".to_string(),
            ));
        }

        if id.len() > Self::MAX_LEN {
            return Err(DomainError::InvalidChannelId(format!(
                "Channel ID too long: {} chars (max {})",
                id.len(),
                Self::MAX_LEN
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '.'))
        {
            return Err(DomainError::InvalidChannelId(format!(
                "Channel ID {id} must contain only alphanumeric, underscore, hyphen, dot and forward slash"
            )));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChannelId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
