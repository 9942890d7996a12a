use serde::{Deserialize, Serialize};

use super::{Pattern, StatePredicate};
use crate::access::{AccessRequest, Action, SubjectId};
use crate::error::{DomainError, Result};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// One entry of the access policy.
///
/// A rule applies to a request when its subject and actuator patterns match
/// and the action is listed. Its `when` predicate then decides whether the
/// effect takes place. Rules with no actions are rejected on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicyRule")]
pub struct PolicyRule {
    name: String,
    subject: Pattern,
    actuator: Pattern,
    actions: Vec<Action>,
    effect: Effect,
    when: StatePredicate,
}

/// Unvalidated rule as it appears in the policy source
#[derive(Deserialize)]
struct RawPolicyRule {
    #[serde(default)]
    name: Option<String>,
    subject: Pattern,
    actuator: Pattern,
    actions: Vec<Action>,
    #[serde(default)]
    effect: Effect,
    #[serde(default)]
    when: StatePredicate,
}

impl TryFrom<RawPolicyRule> for PolicyRule {
    type Error = DomainError;

    fn try_from(raw: RawPolicyRule) -> Result<Self> {
        let name = raw
            .name
            .unwrap_or_else(|| format!("{}->{}", raw.subject, raw.actuator));
        Self::new(name, raw.subject, raw.actuator, raw.actions)?
            .with_effect(raw.effect)
            .when(raw.when)
    }
}

impl PolicyRule {
    pub fn new(
        name: impl Into<String>,
        subject: Pattern,
        actuator: Pattern,
        actions: Vec<Action>,
    ) -> Result<Self> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(DomainError::InvalidPolicy(
                "Rule name cannot be empty".to_string(),
            ));
        }

        if actions.is_empty() {
            return Err(DomainError::InvalidPolicy(format!(
                "Rule '{name}' must allow at least one action"
            )));
        }

        let mut actions = actions;
        actions.dedup();

        Ok(Self {
            name,
            subject,
            actuator,
            actions,
            effect: Effect::Allow,
            when: StatePredicate::Always,
        })
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Attach the room-state predicate, validating its thresholds
    pub fn when(mut self, predicate: StatePredicate) -> Result<Self> {
        predicate
            .validate()
            .map_err(|e| DomainError::InvalidPolicy(format!("Rule '{}': {e}", self.name)))?;
        self.when = predicate;
        Ok(self)
    }

    /// Subject, actuator and action all match the request.
    ///
    /// The unknown subject of an unresolved credential is only matched by a
    /// rule naming `unknown` literally, never by a wildcard.
    pub fn applies_to(&self, request: &AccessRequest) -> bool {
        self.actions.contains(&request.action)
            && self.applies_to_subject(&request.subject)
            && self.actuator.matches(request.actuator.as_str())
    }

    fn applies_to_subject(&self, subject: &SubjectId) -> bool {
        if subject.is_unknown() {
            return self.subject.as_str() == subject.as_str();
        }
        self.subject.matches(subject.as_str())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subject(&self) -> &Pattern {
        &self.subject
    }

    pub fn actuator(&self) -> &Pattern {
        &self.actuator
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn predicate(&self) -> &StatePredicate {
        &self.when
    }
}
