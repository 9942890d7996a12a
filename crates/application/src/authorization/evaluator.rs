use domain::policy::Effect;
use domain::{AccessRequest, AuthorizationDecision, PolicyRule, ReasonCode, RoomState};
use tracing::debug;

/// Decide one access request against the ordered rules and a room snapshot.
///
/// Rules are tried in declared order and the first one whose subject,
/// actuator, action and room-state predicate all hold decides. Without a
/// match the request is denied. When an applicable rule cannot be judged,
/// because the state is stale or lacks the data its predicate reads, the
/// decision is deferred and must not lead to actuation.
///
/// Pure: no I/O, no clock other than the decision timestamp.
pub fn evaluate(
    request: &AccessRequest,
    rules: &[PolicyRule],
    state: &RoomState,
) -> AuthorizationDecision {
    for rule in rules.iter().filter(|rule| rule.applies_to(request)) {
        if state.is_stale() {
            debug!(request_id = %request.id, rule = rule.name(), "State stale, deferring");
            return AuthorizationDecision::deferred(request.id).by_rule(rule.name());
        }

        match rule.predicate().eval(state) {
            Some(true) => {
                debug!(request_id = %request.id, rule = rule.name(), "Rule matched");
                return match rule.effect() {
                    Effect::Allow => AuthorizationDecision::granted(request.id, rule.name()),
                    Effect::Deny => {
                        AuthorizationDecision::denied(request.id, ReasonCode::PolicyDenied)
                            .by_rule(rule.name())
                    }
                };
            }
            Some(false) => continue,
            None => {
                debug!(
                    request_id = %request.id,
                    rule = rule.name(),
                    "Predicate needs data the state does not hold, deferring"
                );
                return AuthorizationDecision::deferred(request.id).by_rule(rule.name());
            }
        }
    }

    AuthorizationDecision::denied(request.id, ReasonCode::NoMatchingPolicy)
}
