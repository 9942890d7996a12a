use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Granted,
    Denied,
    /// Could not be decided with confidence. Never actuated.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    /// An allow rule matched
    PolicyMatched,
    /// A deny rule matched
    PolicyDenied,
    NoMatchingPolicy,
    StateUnavailable,
    UnsupportedAction,
    ShuttingDown,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyMatched => "policy-matched",
            Self::PolicyDenied => "policy-denied",
            Self::NoMatchingPolicy => "no-matching-policy",
            Self::StateUnavailable => "state-unavailable",
            Self::UnsupportedAction => "unsupported-action",
            Self::ShuttingDown => "shutting-down",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable outcome of evaluating exactly one access request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub request_id: RequestId,
    pub outcome: Outcome,
    pub reason: ReasonCode,
    /// Name of the rule that decided, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl AuthorizationDecision {
    pub fn new(request_id: RequestId, outcome: Outcome, reason: ReasonCode) -> Self {
        Self {
            request_id,
            outcome,
            reason,
            rule: None,
            decided_at: Utc::now(),
        }
    }

    pub fn granted(request_id: RequestId, rule: impl Into<String>) -> Self {
        Self::new(request_id, Outcome::Granted, ReasonCode::PolicyMatched).by_rule(rule)
    }

    pub fn denied(request_id: RequestId, reason: ReasonCode) -> Self {
        Self::new(request_id, Outcome::Denied, reason)
    }

    pub fn deferred(request_id: RequestId) -> Self {
        Self::new(request_id, Outcome::Deferred, ReasonCode::StateUnavailable)
    }

    pub fn by_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Only granted decisions may drive an actuator
    pub fn permits_actuation(&self) -> bool {
        self.outcome == Outcome::Granted
    }

    /// Equal apart from the time of decision
    pub fn same_verdict(&self, other: &AuthorizationDecision) -> bool {
        self.request_id == other.request_id
            && self.outcome == other.outcome
            && self.reason == other.reason
            && self.rule == other.rule
    }
}
