use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// Identifier pattern where `*` matches any run of characters.
///
/// Compiled once at load time into an anchored regex; all other characters
/// match literally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();

        if source.is_empty() {
            return Err(DomainError::InvalidPattern(
                "Pattern cannot be empty".to_string(),
            ));
        }

        if source.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidPattern(format!(
                "Pattern '{source}' must not contain whitespace"
            )));
        }

        let body = source
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))
            .map_err(|e| DomainError::InvalidPattern(format!("'{source}': {e}")))?;

        Ok(Self { source, regex })
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    pub fn is_wildcard(&self) -> bool {
        self.source.chars().all(|c| c == '*')
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl TryFrom<String> for Pattern {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
