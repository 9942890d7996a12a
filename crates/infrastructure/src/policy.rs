use domain::{DomainError, PolicySet};
use tracing::{error, info};

/// Validate the configured policy. Any failure is a `PolicyLoad` error and
/// the unit must not start.
pub fn load_policy(rules: &[serde_json::Value]) -> Result<PolicySet, DomainError> {
    let set = PolicySet::from_json(serde_json::Value::Array(rules.to_vec())).map_err(|e| {
        error!(error = %e, "Policy rejected");
        match e {
            DomainError::PolicyLoad(_) => e,
            other => DomainError::PolicyLoad(other.to_string()),
        }
    })?;

    for (index, rule) in set.rules().iter().enumerate() {
        info!(
            index,
            rule = rule.name(),
            subject = %rule.subject(),
            actuator = %rule.actuator(),
            effect = ?rule.effect(),
            "Policy rule loaded"
        );
    }
    info!(count = set.len(), "🔐 Policy loaded");

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_valid_policy() {
        let rules = vec![json!({
            "subject": "guard",
            "actuator": "frontDoor",
            "actions": ["unlock"],
            "when": {"type": "occupancy", "operator": "<", "value": 5}
        })];
        let set = load_policy(&rules).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_empty_policy_is_fatal() {
        let err = load_policy(&[]).unwrap_err();
        assert!(matches!(err, DomainError::PolicyLoad(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invalid_rule_is_fatal() {
        let rules = vec![json!({"subject": "guard", "actuator": "frontDoor", "actions": []})];
        assert!(matches!(
            load_policy(&rules),
            Err(DomainError::PolicyLoad(_))
        ));
    }
}
