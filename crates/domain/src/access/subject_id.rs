use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

const MAX_LEN: usize = 128;
const UNKNOWN: &str = "unknown";

/// Value object identifying who asks for access
///
/// Rules:
/// - Must be non-empty
/// - Max length 128 characters
/// - Alphanumeric, underscore, hyphen, dot, at-sign and colon only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(DomainError::InvalidSubjectId(
                "Subject ID cannot be empty".to_string(),
            ));
        }

        if id.len() > MAX_LEN {
            return Err(DomainError::InvalidSubjectId(format!(
                "Subject ID too long: {} chars (max {MAX_LEN})",
                id.len()
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@' | ':'))
        {
            return Err(DomainError::InvalidSubjectId(format!(
                "Subject ID {id} contains invalid characters"
            )));
        }

        Ok(Self(id))
    }

    /// Subject used for credentials that could not be resolved
    pub fn unknown() -> Self {
        Self(UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubjectId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
