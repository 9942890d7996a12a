use serde::Serialize;

use super::PolicyRule;
use crate::error::{DomainError, Result};

/// Ordered, non-empty list of policy rules loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PolicySet(Vec<PolicyRule>);

impl PolicySet {
    pub fn new(rules: Vec<PolicyRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(DomainError::PolicyLoad(
                "policy set is empty, refusing to run without rules".to_string(),
            ));
        }
        Ok(Self(rules))
    }

    /// Parse and validate rules from JSON. Any invalid rule fails the whole set.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let rules: Vec<PolicyRule> =
            serde_json::from_value(value).map_err(|e| DomainError::PolicyLoad(e.to_string()))?;
        Self::new(rules)
    }

    /// Rules in declared order
    pub fn rules(&self) -> &[PolicyRule] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
